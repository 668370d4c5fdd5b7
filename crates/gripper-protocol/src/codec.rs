//! 命令编解码器
//!
//! `CommandCodec` 在符号命令/原始状态字节与设备寄存器表示之间转换。
//! 除了持有"上一次命令"外不含其他状态。

use crate::ProtocolError;
use crate::command::{OutputCommand, RegisterMessage};
use crate::constants::*;
use crate::status::InputStatus;
use crate::token::CommandToken;
use tracing::{debug, trace};

/// 命令编解码器接口
///
/// 不同夹爪型号实现此 trait，由配置在启动时选择具体实现。
pub trait CommandCodec: Send {
    /// 按符号命令修改持有的输出命令，并序列化为寄存器消息
    ///
    /// 永不失败：无法识别的命令不修改状态，仅重新输出当前命令。
    fn encode(&mut self, token: &CommandToken) -> RegisterMessage;

    /// 将状态字节解码为 `InputStatus`
    ///
    /// # 错误
    /// - `ProtocolError::MalformedStatus`: 字节数不足
    fn decode(&self, bytes: &[u8]) -> Result<InputStatus, ProtocolError>;

    /// 当前持有的输出命令
    fn command(&self) -> &OutputCommand;

    /// 一次状态读取所需的字节数
    fn status_len(&self) -> usize {
        STATUS_MESSAGE_LEN
    }

    /// 直接编码文本命令
    fn encode_text(&mut self, text: &str) -> RegisterMessage {
        self.encode(&CommandToken::parse(text))
    }
}

/// Robotiq 2F 系列编解码器
#[derive(Debug, Clone, Default)]
pub struct RobotiqCodec {
    command: OutputCommand,
}

impl RobotiqCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已有命令状态创建（用于恢复或测试）
    pub fn with_command(command: OutputCommand) -> Self {
        Self { command }
    }

    /// 按命令修改输出命令
    fn apply(&mut self, token: &CommandToken) {
        let cmd = &mut self.command;
        match token {
            CommandToken::Activate => {
                cmd.set_activate(1);
                cmd.set_go(1);
                cmd.set_auto_release(1);
                cmd.set_speed(ACTIVATION_SPEED as i64);
                cmd.set_force(ACTIVATION_FORCE as i64);
            },
            CommandToken::Reset => cmd.set_activate(0),
            CommandToken::Open => cmd.set_position(POSITION_OPEN as i64),
            CommandToken::Close => cmd.set_position(POSITION_CLOSED as i64),
            CommandToken::IncreaseSpeed => cmd.adjust_speed(ADJUST_STEP),
            CommandToken::DecreaseSpeed => cmd.adjust_speed(-ADJUST_STEP),
            CommandToken::IncreaseForce => cmd.adjust_force(ADJUST_STEP),
            CommandToken::DecreaseForce => cmd.adjust_force(-ADJUST_STEP),
            CommandToken::Position(value) => cmd.set_position(*value as i64),
            CommandToken::Unknown(text) => {
                debug!("Unrecognized command {:?}, re-emitting current output", text);
            },
        }
        cmd.clamp_all();
    }
}

impl CommandCodec for RobotiqCodec {
    fn encode(&mut self, token: &CommandToken) -> RegisterMessage {
        self.apply(token);
        let message = self.command.to_message();
        trace!("Encoded {} -> {:?}", token, message.as_bytes());
        message
    }

    fn decode(&self, bytes: &[u8]) -> Result<InputStatus, ProtocolError> {
        InputStatus::decode(bytes)
    }

    fn command(&self) -> &OutputCommand {
        &self.command
    }
}

/// 夹爪型号（配置驱动的编解码器选择）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GripperModel {
    /// Robotiq 2F-85 / 2F-140
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "robotiq_2f"))]
    Robotiq2F,
}

impl std::fmt::Display for GripperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Robotiq2F => f.write_str("robotiq_2f"),
        }
    }
}

impl GripperModel {
    /// 创建对应型号的编解码器
    pub fn codec(self) -> Box<dyn CommandCodec> {
        match self {
            Self::Robotiq2F => Box::new(RobotiqCodec::new()),
        }
    }
}
