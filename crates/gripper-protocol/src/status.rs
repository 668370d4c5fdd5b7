//! 输入状态定义
//!
//! 设备每次状态读取返回 6 字节，本模块将其解码为不可变的 `InputStatus`。

use crate::ProtocolError;
use crate::constants::STATUS_MESSAGE_LEN;
use bilge::prelude::*;

// ============================================================================
// 夹爪状态位域
// ============================================================================

/// 夹爪状态位域（Byte 0: 8 位）
///
/// 协议定义：
/// - Bit 0: gACT，激活状态
/// - Bit 1-2: 保留
/// - Bit 3: gGTO，执行状态
/// - Bit 4-5: gSTA，夹爪状态
/// - Bit 6-7: gOBJ，物体检测状态
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default)]
pub struct GripperStatusByte {
    pub activation: u1,       // Bit 0
    pub reserved: u2,         // Bit 1-2: 保留
    pub go: u1,               // Bit 3
    pub gripper_status: u2,   // Bit 4-5
    pub object_detection: u2, // Bit 6-7
}

/// 夹爪状态（gSTA）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum GripperState {
    /// 复位（或自动释放）状态
    #[default]
    Reset = 0x00,
    /// 激活进行中
    Activating = 0x01,
    /// 未使用
    Unused = 0x02,
    /// 激活完成
    Active = 0x03,
}

/// 物体检测状态（gOBJ）
///
/// 仅在 gGTO = 1 时有意义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum ObjectDetection {
    /// 手指正在向目标位置移动，未检测到物体
    #[default]
    Moving = 0x00,
    /// 张开时检测到接触而停止
    ContactOpening = 0x01,
    /// 闭合时检测到接触而停止
    ContactClosing = 0x02,
    /// 到达目标位置，未检测到物体（或物体丢失）
    AtRequestedPosition = 0x03,
}

// ============================================================================
// 输入状态
// ============================================================================

/// 夹爪输入状态（每次读取新建，不可变）
///
/// | 字段 | 来源 |
/// |------|------|
/// | `activation_status` | Byte 0, Bit 0 |
/// | `go_status` | Byte 0, Bit 3 |
/// | `gripper_status` | Byte 0, Bit 4-5 |
/// | `object_detection` | Byte 0, Bit 6-7 |
/// | `fault_code` | Byte 2 |
/// | `requested_position` | Byte 3 |
/// | `actual_position` | Byte 4 |
/// | `current` | Byte 5 |
///
/// Byte 1 及 `current` 的设备含义未定义，按原样透传。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct InputStatus {
    pub activation_status: u8,
    pub go_status: u8,
    pub gripper_status: u8,
    pub object_detection: u8,
    pub fault_code: u8,
    pub requested_position: u8,
    pub actual_position: u8,
    pub current: u8,
}

impl InputStatus {
    /// 从状态字节解码
    ///
    /// 至少需要 6 字节，多余字节被忽略。
    ///
    /// # 错误
    /// - `ProtocolError::MalformedStatus`: 字节数不足（包括空输入）
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < STATUS_MESSAGE_LEN {
            return Err(ProtocolError::MalformedStatus {
                expected: STATUS_MESSAGE_LEN,
                actual: bytes.len(),
            });
        }

        // 使用 bilge 解析位域
        let status = GripperStatusByte::from(u8::new(bytes[0]));

        Ok(Self {
            activation_status: status.activation().value(),
            go_status: status.go().value(),
            gripper_status: status.gripper_status().value(),
            object_detection: status.object_detection().value(),
            fault_code: bytes[2],
            requested_position: bytes[3],
            actual_position: bytes[4],
            current: bytes[5],
        })
    }

    /// 夹爪状态（类型化视图）
    pub fn gripper_state(&self) -> GripperState {
        GripperState::from(self.gripper_status)
    }

    /// 物体检测状态（类型化视图）
    pub fn object(&self) -> ObjectDetection {
        ObjectDetection::from(self.object_detection)
    }

    /// 是否已激活（gACT = 1）
    pub fn is_activated(&self) -> bool {
        self.activation_status == 1
    }

    /// 是否就绪：已激活且激活流程完成
    pub fn is_ready(&self) -> bool {
        self.is_activated() && self.gripper_state() == GripperState::Active
    }

    /// 是否存在故障码
    pub fn has_fault(&self) -> bool {
        self.fault_code != 0
    }
}

impl TryFrom<&[u8]> for InputStatus {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::decode(bytes)
    }
}
