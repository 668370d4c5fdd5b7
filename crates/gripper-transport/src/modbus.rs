//! Modbus RTU / TCP 传输后端
//!
//! 基于 `tokio-modbus` 的同步客户端：内部持有一个私有运行时，
//! 对调用方呈现阻塞接口，每次请求都受固定超时约束。

use crate::{
    ModbusTarget, ParityKind, RegisterTransport, SerialSettings, TransportError,
    TransportSettings,
};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio_modbus::client::sync::{self, Reader, Writer};
use tokio_modbus::prelude::{Slave, SlaveContext};
use tracing::{debug, trace, warn};

/// Modbus 传输
///
/// 连接在 `connect()` 时建立，在 `close()` 或 drop 时释放。
pub struct ModbusTransport {
    target: ModbusTarget,
    timeout: Duration,
    ctx: Option<sync::Context>,
}

impl ModbusTransport {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            target: settings.target,
            timeout: settings.timeout,
            ctx: None,
        }
    }

    /// Modbus RTU（串口）
    pub fn rtu(serial: SerialSettings, timeout: Duration) -> Self {
        Self::new(TransportSettings {
            target: ModbusTarget::Rtu(serial),
            timeout,
        })
    }

    /// Modbus TCP
    pub fn tcp(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self::new(TransportSettings {
            target: ModbusTarget::Tcp {
                host: host.into(),
                port,
            },
            timeout,
        })
    }

    pub fn target(&self) -> &ModbusTarget {
        &self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn open_context(&self) -> Result<sync::Context, TransportError> {
        match &self.target {
            ModbusTarget::Rtu(serial) => {
                let builder = serial_builder(serial, self.timeout)?;
                sync::rtu::connect_slave_with_timeout(&builder, Slave(0), Some(self.timeout))
                    .map_err(TransportError::from_io)
            },
            ModbusTarget::Tcp { host, port } => {
                let addr = resolve(host, *port)?;
                sync::tcp::connect_slave_with_timeout(addr, Slave(0), Some(self.timeout))
                    .map_err(TransportError::from_io)
            },
        }
    }

    fn context(&mut self, unit_id: u8) -> Result<&mut sync::Context, TransportError> {
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotOpen)?;
        ctx.set_slave(Slave(unit_id));
        Ok(ctx)
    }
}

impl RegisterTransport for ModbusTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.ctx.is_some() {
            return Ok(());
        }
        debug!("Opening Modbus transport {}", self.target);
        let ctx = self.open_context()?;
        self.ctx = Some(ctx);
        Ok(())
    }

    fn close(&mut self) {
        if self.ctx.take().is_some() {
            debug!("Closed Modbus transport {}", self.target);
        }
    }

    fn is_open(&self) -> bool {
        self.ctx.is_some()
    }

    fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
        unit_id: u8,
    ) -> Result<(), TransportError> {
        trace!("write_multiple_registers @{:#06X} unit={} {:04X?}", address, unit_id, values);
        let ctx = self.context(unit_id)?;
        match ctx.write_multiple_registers(address, values) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(code)) => {
                warn!("Device exception on write @{:#06X}: {:?}", address, code);
                Err(TransportError::Exception(format!("{:?}", code)))
            },
            Err(e) => Err(map_modbus_error(e)),
        }
    }

    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        let ctx = self.context(unit_id)?;
        match ctx.read_holding_registers(address, count) {
            Ok(Ok(words)) => {
                trace!("read_holding_registers @{:#06X} -> {:04X?}", address, words);
                Ok(words)
            },
            Ok(Err(code)) => {
                warn!("Device exception on read @{:#06X}: {:?}", address, code);
                Err(TransportError::Exception(format!("{:?}", code)))
            },
            Err(e) => Err(map_modbus_error(e)),
        }
    }

    fn describe(&self) -> String {
        self.target.to_string()
    }
}

impl Drop for ModbusTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn map_modbus_error(err: tokio_modbus::Error) -> TransportError {
    match err {
        tokio_modbus::Error::Transport(io) => TransportError::from_io(io),
        other => TransportError::Protocol(other.to_string()),
    }
}

/// 解析 TCP 端点（取第一个地址）
fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| TransportError::Config(format!("cannot resolve {}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| TransportError::Config(format!("no address for {}:{}", host, port)))
}

/// 串口参数 → `tokio_serial::SerialPortBuilder`
fn serial_builder(
    serial: &SerialSettings,
    timeout: Duration,
) -> Result<tokio_serial::SerialPortBuilder, TransportError> {
    Ok(tokio_serial::new(serial.port.as_str(), serial.baud_rate)
        .data_bits(data_bits(serial.byte_size)?)
        .parity(parity(serial.parity))
        .stop_bits(stop_bits(serial.stop_bits)?)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(timeout))
}

fn data_bits(byte_size: u8) -> Result<tokio_serial::DataBits, TransportError> {
    match byte_size {
        5 => Ok(tokio_serial::DataBits::Five),
        6 => Ok(tokio_serial::DataBits::Six),
        7 => Ok(tokio_serial::DataBits::Seven),
        8 => Ok(tokio_serial::DataBits::Eight),
        other => Err(TransportError::Config(format!("unsupported byte size {}", other))),
    }
}

fn parity(kind: ParityKind) -> tokio_serial::Parity {
    match kind {
        ParityKind::None => tokio_serial::Parity::None,
        ParityKind::Odd => tokio_serial::Parity::Odd,
        ParityKind::Even => tokio_serial::Parity::Even,
    }
}

fn stop_bits(bits: u8) -> Result<tokio_serial::StopBits, TransportError> {
    match bits {
        1 => Ok(tokio_serial::StopBits::One),
        2 => Ok(tokio_serial::StopBits::Two),
        other => Err(TransportError::Config(format!("unsupported stop bits {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_bits_mapping() {
        assert_eq!(data_bits(8).unwrap(), tokio_serial::DataBits::Eight);
        assert_eq!(data_bits(7).unwrap(), tokio_serial::DataBits::Seven);
        assert!(matches!(data_bits(9), Err(TransportError::Config(_))));
    }

    #[test]
    fn test_stop_bits_mapping() {
        assert_eq!(stop_bits(1).unwrap(), tokio_serial::StopBits::One);
        assert_eq!(stop_bits(2).unwrap(), tokio_serial::StopBits::Two);
        assert!(stop_bits(3).is_err());
    }

    #[test]
    fn test_resolve_loopback() {
        let addr = resolve("127.0.0.1", 502).unwrap();
        assert_eq!(addr.port(), 502);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_requests_before_connect_fail() {
        let mut transport = ModbusTransport::tcp("127.0.0.1", 502, Duration::from_millis(100));
        assert!(!transport.is_open());
        assert!(matches!(
            transport.write_registers(0x03E8, &[0, 0, 0], 9),
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            transport.read_holding_registers(0x07D0, 3, 9),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    fn test_close_without_connect_is_noop() {
        let mut transport =
            ModbusTransport::rtu(SerialSettings::default(), Duration::from_millis(100));
        transport.close();
        assert!(!transport.is_open());
        assert_eq!(transport.describe(), "rtu:///dev/ttyUSB0@115200 (8N1)");
    }

    #[test]
    fn test_tcp_connect_refused() {
        // 绑定后立即释放，得到一个几乎必然无人监听的端口
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut transport = ModbusTransport::tcp("127.0.0.1", port, Duration::from_millis(200));
        assert!(transport.connect().is_err());
        assert!(!transport.is_open());
    }
}
