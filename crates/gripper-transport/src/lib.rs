//! # Gripper Register Transport
//!
//! 寄存器传输抽象层，提供统一的"连接/读寄存器/写寄存器"接口。
//!
//! - `modbus`（默认 feature）：Modbus RTU（串口）与 Modbus TCP 后端
//! - `mock`：无硬件依赖的模拟传输，用于测试
//!
//! 所有后端的每次请求都必须带有固定的超时，停滞的设备不能无限期阻塞调用方。

pub mod settings;

#[cfg(feature = "modbus")]
pub mod modbus;

#[cfg(feature = "mock")]
pub mod mock;

pub use settings::*;

#[cfg(feature = "modbus")]
pub use modbus::ModbusTransport;

#[cfg(feature = "mock")]
pub use mock::{MockHandle, MockTransport};

use thiserror::Error;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    /// 串口/套接字底层错误
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 设备返回 Modbus 异常码
    #[error("Device exception: {0}")]
    Exception(String),

    /// 请求超时（设备无响应）
    #[error("Request timeout")]
    Timeout,

    /// 传输未打开
    #[error("Transport not open")]
    NotOpen,

    /// 传输参数无效（地址无法解析等）
    #[error("Invalid transport configuration: {0}")]
    Config(String),

    /// 协议层错误（帧损坏、响应不匹配等）
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// 从 IO 错误分类：超时单独归类
    pub fn from_io(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Self::Timeout
        } else {
            Self::Io(err)
        }
    }
}

/// 寄存器传输接口
///
/// 由设备会话独占持有；会话负责连接状态管理，传输只负责单次请求。
pub trait RegisterTransport: Send {
    /// 打开底层连接
    fn connect(&mut self) -> Result<(), TransportError>;

    /// 关闭底层连接（未打开时为空操作）
    fn close(&mut self);

    /// 底层连接是否已打开
    fn is_open(&self) -> bool;

    /// 从 `address` 开始写多个保持寄存器
    fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
        unit_id: u8,
    ) -> Result<(), TransportError>;

    /// 从 `address` 开始读 `count` 个保持寄存器
    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError>;

    /// 人类可读的端点描述（用于日志）
    fn describe(&self) -> String {
        "register transport".to_string()
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for Box<T> {
    fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
        unit_id: u8,
    ) -> Result<(), TransportError> {
        (**self).write_registers(address, values, unit_id)
    }

    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        (**self).read_holding_registers(address, count, unit_id)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_timeout() {
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert!(matches!(TransportError::from_io(err), TransportError::Timeout));
    }

    #[test]
    fn test_from_io_other() {
        let err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(matches!(TransportError::from_io(err), TransportError::Io(_)));
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::Timeout.to_string(), "Request timeout");
        assert_eq!(TransportError::NotOpen.to_string(), "Transport not open");
        let msg = TransportError::Exception("IllegalDataAddress".into()).to_string();
        assert!(msg.contains("IllegalDataAddress"));
    }
}
