//! 传输参数
//!
//! 描述如何到达设备：串口（Modbus RTU）或 TCP（Modbus TCP）。
//! 参数由外部配置解析并校验，核心逻辑只消费已解析的结果。

use std::fmt;
use std::time::Duration;

/// 默认串口设备
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

/// 默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 默认请求超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// 默认 Modbus TCP 端口
pub const DEFAULT_MODBUS_TCP_PORT: u16 = 502;

/// 串口校验位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ParityKind {
    #[default]
    None,
    Odd,
    Even,
}

/// 串口参数（Modbus RTU）
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SerialSettings {
    /// 串口设备路径（如 `/dev/ttyUSB0`、`COM4`）
    pub port: String,
    /// 波特率
    pub baud_rate: u32,
    /// 数据位（5-8）
    pub byte_size: u8,
    /// 校验位
    pub parity: ParityKind,
    /// 停止位（1-2）
    pub stop_bits: u8,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            byte_size: 8,
            parity: ParityKind::None,
            stop_bits: 1,
        }
    }
}

/// 设备端点
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum ModbusTarget {
    /// Modbus RTU over serial
    Rtu(SerialSettings),
    /// Modbus TCP
    Tcp {
        host: String,
        #[cfg_attr(feature = "serde", serde(default = "default_modbus_tcp_port"))]
        port: u16,
    },
}

#[cfg(feature = "serde")]
fn default_modbus_tcp_port() -> u16 {
    DEFAULT_MODBUS_TCP_PORT
}

impl Default for ModbusTarget {
    fn default() -> Self {
        Self::Rtu(SerialSettings::default())
    }
}

impl fmt::Display for ModbusTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rtu(serial) => write!(
                f,
                "rtu://{}@{} ({}{}{})",
                serial.port,
                serial.baud_rate,
                serial.byte_size,
                match serial.parity {
                    ParityKind::None => 'N',
                    ParityKind::Odd => 'O',
                    ParityKind::Even => 'E',
                },
                serial.stop_bits
            ),
            Self::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
        }
    }
}

/// 完整传输参数：端点 + 固定请求超时
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub target: ModbusTarget,
    /// 每次请求的超时（连接、读、写均适用）
    pub timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            target: ModbusTarget::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}
