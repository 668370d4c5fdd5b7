//! 输出命令定义
//!
//! 包含夹爪输出命令（OutputCommand）、动作请求位域（Byte 0）
//! 以及发往设备的寄存器消息（RegisterMessage）。

use crate::constants::*;
use crate::{clamp, pack_registers};
use bilge::prelude::*;

// ============================================================================
// 动作请求位域
// ============================================================================

/// 动作请求位域（Byte 0: 8 位）
///
/// 协议定义：
/// - Bit 0: rACT，激活
/// - Bit 1-2: 保留
/// - Bit 3: rGTO，执行（go to requested position）
/// - Bit 4: rATR，自动释放
/// - Bit 5-7: 保留
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default)]
pub struct ActionRequest {
    pub activate: u1,      // Bit 0
    pub reserved_lo: u2,   // Bit 1-2: 保留
    pub go: u1,            // Bit 3
    pub auto_release: u1,  // Bit 4
    pub reserved_hi: u3,   // Bit 5-7: 保留
}

// ============================================================================
// 输出命令
// ============================================================================

/// 夹爪输出命令
///
/// 在编解码器中跨调用持有："增加速度"修改的是上一次的速度，而不是从 0 开始。
///
/// 所有字段均为私有，只能通过 setter 修改；每次修改后立即限幅，
/// 调用者不会观察到越界值：
/// - `activate` / `go` / `auto_release` ∈ {0, 1}
/// - `position` / `speed` / `force` ∈ [0, 255]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputCommand {
    activate: u8,
    go: u8,
    auto_release: u8,
    position: u8,
    speed: u8,
    force: u8,
}

impl OutputCommand {
    /// 全零命令（未激活、张开、速度/力为 0）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self) -> u8 {
        self.activate
    }

    pub fn go(&self) -> u8 {
        self.go
    }

    pub fn auto_release(&self) -> u8 {
        self.auto_release
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn force(&self) -> u8 {
        self.force
    }

    pub fn set_activate(&mut self, value: i64) {
        self.activate = clamp_flag(value);
    }

    pub fn set_go(&mut self, value: i64) {
        self.go = clamp_flag(value);
    }

    pub fn set_auto_release(&mut self, value: i64) {
        self.auto_release = clamp_flag(value);
    }

    pub fn set_position(&mut self, value: i64) {
        self.position = clamp_byte(value);
    }

    pub fn set_speed(&mut self, value: i64) {
        self.speed = clamp_byte(value);
    }

    pub fn set_force(&mut self, value: i64) {
        self.force = clamp_byte(value);
    }

    /// 按增量调整速度（结果限幅）
    pub fn adjust_speed(&mut self, delta: i64) {
        self.set_speed(self.speed as i64 + delta);
    }

    /// 按增量调整力（结果限幅）
    pub fn adjust_force(&mut self, delta: i64) {
        self.set_force(self.force as i64 + delta);
    }

    /// 对所有字段重新限幅
    ///
    /// setter 已保证字段合法，因此对任何可观察到的命令调用都是空操作。
    pub fn clamp_all(&mut self) {
        self.set_activate(self.activate as i64);
        self.set_go(self.go as i64);
        self.set_auto_release(self.auto_release as i64);
        self.set_position(self.position as i64);
        self.set_speed(self.speed as i64);
        self.set_force(self.force as i64);
    }

    /// 动作请求位域（Byte 0）
    pub fn action_request(&self) -> ActionRequest {
        let mut request = ActionRequest::from(u8::new(0));
        request.set_activate(u1::new(self.activate));
        request.set_go(u1::new(self.go));
        request.set_auto_release(u1::new(self.auto_release));
        request
    }

    /// 序列化为 6 字节
    ///
    /// `[action_request, 0, 0, position, speed, force]`
    pub fn to_bytes(&self) -> [u8; COMMAND_MESSAGE_LEN] {
        [
            u8::from(self.action_request()).value(),
            0,
            0,
            self.position,
            self.speed,
            self.force,
        ]
    }

    /// 转换为寄存器消息
    pub fn to_message(&self) -> RegisterMessage {
        RegisterMessage::new(self.to_bytes().to_vec())
    }
}

fn clamp_flag(value: i64) -> u8 {
    clamp(value, 0, FLAG_FIELD_MAX) as u8
}

fn clamp_byte(value: i64) -> u8 {
    clamp(value, 0, BYTE_FIELD_MAX) as u8
}

// ============================================================================
// 寄存器消息
// ============================================================================

/// 发往设备的寄存器消息
///
/// 有序字节序列；传输前两个字节一组按大端打包为 16 位寄存器，
/// 奇数长度在末尾补 0。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterMessage {
    bytes: Vec<u8>,
}

impl RegisterMessage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// 原始字节（未补齐）
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 打包为 16 位寄存器（大端，奇数长度补 0）
    pub fn to_registers(&self) -> Vec<u16> {
        pack_registers(&self.bytes)
    }
}

impl From<Vec<u8>> for RegisterMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl<const N: usize> From<[u8; N]> for RegisterMessage {
    fn from(bytes: [u8; N]) -> Self {
        Self::new(bytes.to_vec())
    }
}
