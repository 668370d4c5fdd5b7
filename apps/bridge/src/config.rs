//! 桥接进程配置
//!
//! TOML 文件 + 命令行覆盖。所有字段都有默认值，核心逻辑只消费校验后的结果。
//!
//! ```toml
//! [device]
//! model = "robotiq_2f"
//! unit_id = 9
//! timeout_ms = 500
//!
//! [device.transport]
//! type = "rtu"
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [interface]
//! type = "websocket"
//! listen = "127.0.0.1:8001"
//!
//! [control]
//! status_poll_interval_ms = 200
//! ```

use gripper_driver::{BridgeOptions, ControlLoopConfig, SessionConfig};
use gripper_interface::InterfaceKind;
use gripper_protocol::{
    DEFAULT_UNIT_ID, GripperModel, READ_REGISTER_ADDRESS, STATUS_MESSAGE_LEN,
    WRITE_REGISTER_ADDRESS,
};
use gripper_transport::{DEFAULT_TIMEOUT_MS, ModbusTarget, TransportSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 未指定 `--config` 时在当前目录查找的文件名
pub const DEFAULT_CONFIG_FILE: &str = "gripper-bridge.toml";

/// 默认监听地址
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8001";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Baud rate must be greater than zero")]
    ZeroBaudRate,
    #[error("Byte size must be between 5 and 8, got {0}")]
    ByteSize(u8),
    #[error("Stop bits must be 1 or 2, got {0}")]
    StopBits(u8),
    #[error("Serial port path is empty")]
    EmptySerialPort,
    #[error("Modbus TCP host is empty")]
    EmptyHost,
    #[error("Transport timeout must be greater than zero")]
    ZeroTimeout,
    #[error("Status read size must be greater than zero")]
    ZeroStatusBytes,
    #[error("Invalid listen address {0:?}")]
    ListenAddress(String),
    #[error("--serial-port cannot be used with a Modbus TCP transport")]
    SerialPortOnTcp,
}

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub device: DeviceConfig,
    pub interface: InterfaceConfig,
    pub control: ControlConfig,
}

/// `[device]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub model: GripperModel,
    pub unit_id: u8,
    pub timeout_ms: u64,
    pub write_address: u16,
    pub read_address: u16,
    pub status_bytes: usize,
    // 表格必须排在标量字段之后
    pub transport: ModbusTarget,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: GripperModel::default(),
            unit_id: DEFAULT_UNIT_ID,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            write_address: WRITE_REGISTER_ADDRESS,
            read_address: READ_REGISTER_ADDRESS,
            status_bytes: STATUS_MESSAGE_LEN,
            transport: ModbusTarget::default(),
        }
    }
}

/// `[interface]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterfaceConfig {
    #[serde(rename = "type")]
    pub kind: InterfaceKind,
    pub listen: String,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            kind: InterfaceKind::default(),
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

/// `[control]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    pub loop_interval_ms: u64,
    /// 0 关闭状态轮询
    pub status_poll_interval_ms: u64,
    /// 激活序列每步之后的等待
    pub settle_ms: u64,
    /// 关闭时等待接口线程退出的上限（控制循环总是等到会话断开）
    pub join_timeout_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: 10,
            status_poll_interval_ms: 200,
            settle_ms: 1000,
            join_timeout_ms: 2000,
        }
    }
}

impl BridgeConfig {
    /// 加载配置
    ///
    /// 显式给出的路径必须存在；否则尝试当前目录下的 [`DEFAULT_CONFIG_FILE`]，
    /// 仍不存在时使用默认配置。
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 应用命令行覆盖
    pub fn apply_overrides(
        &mut self,
        listen: Option<String>,
        serial_port: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(listen) = listen {
            self.interface.listen = listen;
        }
        if let Some(port) = serial_port {
            match &mut self.device.transport {
                ModbusTarget::Rtu(serial) => serial.port = port,
                ModbusTarget::Tcp { .. } => return Err(ConfigError::SerialPortOnTcp),
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.device.transport {
            ModbusTarget::Rtu(serial) => {
                if serial.port.trim().is_empty() {
                    return Err(ConfigError::EmptySerialPort);
                }
                if serial.baud_rate == 0 {
                    return Err(ConfigError::ZeroBaudRate);
                }
                if !(5..=8).contains(&serial.byte_size) {
                    return Err(ConfigError::ByteSize(serial.byte_size));
                }
                if !(1..=2).contains(&serial.stop_bits) {
                    return Err(ConfigError::StopBits(serial.stop_bits));
                }
            },
            ModbusTarget::Tcp { host, .. } => {
                if host.trim().is_empty() {
                    return Err(ConfigError::EmptyHost);
                }
            },
        }
        if self.device.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.device.status_bytes == 0 {
            return Err(ConfigError::ZeroStatusBytes);
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.interface
            .listen
            .parse()
            .map_err(|_| ConfigError::ListenAddress(self.interface.listen.clone()))
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            target: self.device.transport.clone(),
            timeout: Duration::from_millis(self.device.timeout_ms),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            write_address: self.device.write_address,
            read_address: self.device.read_address,
            unit_id: self.device.unit_id,
            settle_interval: Duration::from_millis(self.control.settle_ms),
        }
    }

    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            control: ControlLoopConfig {
                loop_interval: Duration::from_millis(self.control.loop_interval_ms),
                status_poll_interval: Duration::from_millis(self.control.status_poll_interval_ms),
                status_bytes: self.device.status_bytes,
                ..ControlLoopConfig::default()
            },
            join_timeout: Duration::from_millis(self.control.join_timeout_ms),
        }
    }

    /// 以 TOML 形式输出生效配置
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gripper_transport::{ParityKind, SerialSettings};
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_match_device_conventions() {
        let config = BridgeConfig::default();
        assert_eq!(config.device.unit_id, 9);
        assert_eq!(config.device.write_address, 0x03E8);
        assert_eq!(config.device.read_address, 0x07D0);
        assert_eq!(config.device.status_bytes, 6);
        assert_eq!(config.interface.kind, InterfaceKind::WebSocket);
        assert_eq!(config.interface.listen, "127.0.0.1:8001");
        assert!(config.validate().is_ok());

        let session = config.session_config();
        assert_eq!(session.settle_interval, Duration::from_secs(1));
        let options = config.bridge_options();
        assert_eq!(options.control.status_poll_interval, Duration::from_millis(200));
        assert_eq!(options.join_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [device]
            unit_id = 3

            [device.transport]
            type = "rtu"
            port = "COM4"
            parity = "even"

            [interface]
            type = "tcp_line"
            "#,
        );
        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.device.unit_id, 3);
        assert_eq!(config.device.timeout_ms, 500);
        assert_eq!(
            config.device.transport,
            ModbusTarget::Rtu(SerialSettings {
                port: "COM4".into(),
                parity: ParityKind::Even,
                ..SerialSettings::default()
            })
        );
        assert_eq!(config.interface.kind, InterfaceKind::TcpLine);
        assert_eq!(config.interface.listen, DEFAULT_LISTEN);
        assert_eq!(config.control, ControlConfig::default());
    }

    #[test]
    fn test_tcp_transport() {
        let file = write_config(
            r#"
            [device.transport]
            type = "tcp"
            host = "192.168.1.11"
            port = 502
            "#,
        );
        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.transport_settings().target,
            ModbusTarget::Tcp {
                host: "192.168.1.11".into(),
                port: 502
            }
        );
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            BridgeConfig::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_unknown_parity_is_parse_error() {
        let file = write_config(
            r#"
            [device.transport]
            type = "rtu"
            parity = "mark"
            "#,
        );
        assert!(matches!(
            BridgeConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let serial = |f: fn(&mut SerialSettings)| {
            let mut settings = SerialSettings::default();
            f(&mut settings);
            BridgeConfig {
                device: DeviceConfig {
                    transport: ModbusTarget::Rtu(settings),
                    ..DeviceConfig::default()
                },
                ..BridgeConfig::default()
            }
        };

        assert!(matches!(
            serial(|s| s.baud_rate = 0).validate(),
            Err(ConfigError::ZeroBaudRate)
        ));
        assert!(matches!(
            serial(|s| s.byte_size = 9).validate(),
            Err(ConfigError::ByteSize(9))
        ));
        assert!(matches!(
            serial(|s| s.stop_bits = 0).validate(),
            Err(ConfigError::StopBits(0))
        ));
        assert!(matches!(
            serial(|s| s.port.clear()).validate(),
            Err(ConfigError::EmptySerialPort)
        ));

        let mut config = BridgeConfig::default();
        config.device.timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));

        let mut config = BridgeConfig::default();
        config.device.status_bytes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroStatusBytes)));

        let mut config = BridgeConfig::default();
        config.interface.listen = "localhost".into();
        assert!(matches!(config.validate(), Err(ConfigError::ListenAddress(_))));
    }

    #[test]
    fn test_overrides() {
        let mut config = BridgeConfig::default();
        config
            .apply_overrides(Some("0.0.0.0:9000".into()), Some("/dev/ttyS3".into()))
            .unwrap();
        assert_eq!(config.listen_addr().unwrap(), "0.0.0.0:9000".parse().unwrap());
        match &config.device.transport {
            ModbusTarget::Rtu(serial) => assert_eq!(serial.port, "/dev/ttyS3"),
            other => panic!("Unexpected transport {:?}", other),
        }

        config.device.transport = ModbusTarget::Tcp {
            host: "gripper.local".into(),
            port: 502,
        };
        assert!(matches!(
            config.apply_overrides(None, Some("/dev/ttyS3".into())),
            Err(ConfigError::SerialPortOnTcp)
        ));
    }

    #[test]
    fn test_printed_config_parses_back() {
        let mut config = BridgeConfig::default();
        config.control.status_poll_interval_ms = 0;
        let text = config.to_toml().unwrap();
        assert!(text.contains("[device.transport]"));
        assert!(text.contains("type = \"websocket\""));
        let parsed: BridgeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
