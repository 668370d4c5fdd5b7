//! 协议常量定义
//!
//! Robotiq 2F 系列夹爪的 Modbus 寄存器映射与命令参数。

/// 输出命令寄存器起始地址（写）
pub const WRITE_REGISTER_ADDRESS: u16 = 0x03E8;

/// 输入状态寄存器起始地址（读）
pub const READ_REGISTER_ADDRESS: u16 = 0x07D0;

/// 默认设备标识（Modbus unit id）
pub const DEFAULT_UNIT_ID: u8 = 9;

/// 输出命令消息长度（字节）
pub const COMMAND_MESSAGE_LEN: usize = 6;

/// 输入状态消息长度（字节）
pub const STATUS_MESSAGE_LEN: usize = 6;

/// 单字节字段上限（位置/速度/力）
pub const BYTE_FIELD_MAX: i64 = 255;

/// 标志位字段上限（激活/执行/自动释放）
pub const FLAG_FIELD_MAX: i64 = 1;

/// `"f"`/`"l"`/`"i"`/`"d"` 每次调整的步长
pub const ADJUST_STEP: i64 = 25;

/// 激活时写入的速度
pub const ACTIVATION_SPEED: u8 = 255;

/// 激活时写入的力
pub const ACTIVATION_FORCE: u8 = 150;

/// 完全张开的位置
pub const POSITION_OPEN: u8 = 0;

/// 完全闭合的位置
pub const POSITION_CLOSED: u8 = 255;
