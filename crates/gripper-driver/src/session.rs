//! 设备会话
//!
//! 独占一条寄存器传输，对外提供 connect / setup / send / read_status / disconnect。
//! 会话是连接状态的唯一写入者；任何传输错误都会关闭传输并回落到 `Disconnected`，
//! 然后以类型化错误返回给调用方。会话本身从不重试。

use crate::error::{ConnectError, ReadError, SendError, SessionError};
use crate::state::{AtomicConnectionState, ConnectionState};
use gripper_protocol::{
    CommandCodec, CommandToken, DEFAULT_UNIT_ID, READ_REGISTER_ADDRESS, RegisterMessage,
    WRITE_REGISTER_ADDRESS, registers_for_bytes, unpack_registers,
};
use gripper_transport::{RegisterTransport, TransportError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 激活序列中每一步之后的默认等待时间
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_secs(1);

/// 设备会话接口
///
/// 控制循环只通过此接口驱动设备，具体实现由启动时的配置决定。
pub trait DeviceSession: Send {
    /// 打开传输；已连接时为空操作
    fn connect(&mut self) -> Result<(), ConnectError>;

    /// 执行激活序列：连接 → reset → 等待 → activate → 等待
    ///
    /// 首个失败立即返回，不重试。reset/activate 消息经由 `codec` 编码，
    /// 因此编解码器持有的输出命令会反映激活后的状态。
    fn setup(&mut self, codec: &mut dyn CommandCodec) -> Result<(), SessionError>;

    /// 发送寄存器消息
    fn send(&mut self, message: &RegisterMessage) -> Result<(), SendError>;

    /// 读取 `2 * ceil(num_bytes / 2)` 个状态字节
    fn read_status(&mut self, num_bytes: usize) -> Result<Vec<u8>, ReadError>;

    /// 关闭传输；未连接时只记录警告
    fn disconnect(&mut self);

    /// 当前连接状态
    fn state(&self) -> ConnectionState;

    /// 共享的连接状态（只读观察）
    fn state_handle(&self) -> Arc<AtomicConnectionState>;

    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }
}

/// 会话参数（均来自外部配置）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// 命令寄存器起始地址
    pub write_address: u16,
    /// 状态寄存器起始地址
    pub read_address: u16,
    /// 设备标识（Modbus 从站地址）
    pub unit_id: u8,
    /// 激活序列每步之后的等待时间
    pub settle_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_address: WRITE_REGISTER_ADDRESS,
            read_address: READ_REGISTER_ADDRESS,
            unit_id: DEFAULT_UNIT_ID,
            settle_interval: DEFAULT_SETTLE_INTERVAL,
        }
    }
}

/// 基于寄存器传输的设备会话
pub struct RegisterSession<T: RegisterTransport> {
    transport: T,
    config: SessionConfig,
    state: Arc<AtomicConnectionState>,
}

impl<T: RegisterTransport> RegisterSession<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: Arc::new(AtomicConnectionState::default()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 传输失败：关闭传输并回落到 Disconnected
    fn fail(&mut self, op: &str, err: &TransportError) {
        self.transport.close();
        let previous = self.state.set(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            warn!(
                "{} failed on {} ({}), session now disconnected",
                op,
                self.transport.describe(),
                err
            );
        }
    }

    fn send_step(
        &mut self,
        codec: &mut dyn CommandCodec,
        token: CommandToken,
        step: &'static str,
    ) -> Result<(), SessionError> {
        let message = codec.encode(&token);
        self.send(&message).map_err(|source| {
            error!("Setup step {:?} failed: {}", step, source);
            SessionError::Send { step, source }
        })?;
        thread::sleep(self.config.settle_interval);
        Ok(())
    }
}

impl<T: RegisterTransport> DeviceSession for RegisterSession<T> {
    fn connect(&mut self) -> Result<(), ConnectError> {
        if self.state.get().is_connected() {
            return Ok(());
        }

        self.state.set(ConnectionState::Connecting);
        match self.transport.connect() {
            Ok(()) => {
                self.state.set(ConnectionState::Connected);
                info!("Connected to {}", self.transport.describe());
                Ok(())
            },
            Err(e) => {
                self.state.set(ConnectionState::Disconnected);
                warn!("Failed to connect to {}: {}", self.transport.describe(), e);
                Err(ConnectError(e))
            },
        }
    }

    fn setup(&mut self, codec: &mut dyn CommandCodec) -> Result<(), SessionError> {
        info!("Setup procedure starting");
        self.connect()?;
        self.send_step(codec, CommandToken::Reset, "r")?;
        self.send_step(codec, CommandToken::Activate, "a")?;
        info!("Setup procedure completed");
        Ok(())
    }

    fn send(&mut self, message: &RegisterMessage) -> Result<(), SendError> {
        if !self.state.get().is_connected() {
            return Err(SendError::NotConnected);
        }

        let registers = message.to_registers();
        match self.transport.write_registers(
            self.config.write_address,
            &registers,
            self.config.unit_id,
        ) {
            Ok(()) => {
                debug!("Sent {:?}", message.as_bytes());
                Ok(())
            },
            Err(e) => {
                self.fail("Send", &e);
                Err(SendError::Transport(e))
            },
        }
    }

    fn read_status(&mut self, num_bytes: usize) -> Result<Vec<u8>, ReadError> {
        let count = registers_for_bytes(num_bytes);
        if num_bytes == 0 || count > u16::MAX as usize {
            return Err(ReadError::InvalidLength(num_bytes));
        }
        if !self.state.get().is_connected() {
            return Err(ReadError::NotConnected);
        }

        let result = self.transport.read_holding_registers(
            self.config.read_address,
            count as u16,
            self.config.unit_id,
        );
        let result = result.and_then(|words| {
            if words.len() == count {
                Ok(words)
            } else {
                Err(TransportError::Protocol(format!(
                    "expected {} registers, got {}",
                    count,
                    words.len()
                )))
            }
        });

        match result {
            Ok(words) => Ok(unpack_registers(&words)),
            Err(e) => {
                self.fail("Status read", &e);
                Err(ReadError::Transport(e))
            },
        }
    }

    fn disconnect(&mut self) {
        if self.state.get() == ConnectionState::Disconnected {
            warn!("Cannot disconnect: session not connected");
            return;
        }
        self.transport.close();
        self.state.set(ConnectionState::Disconnected);
        info!("Disconnected from {}", self.transport.describe());
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn state_handle(&self) -> Arc<AtomicConnectionState> {
        self.state.clone()
    }
}

impl<S: DeviceSession + ?Sized> DeviceSession for Box<S> {
    fn connect(&mut self) -> Result<(), ConnectError> {
        (**self).connect()
    }

    fn setup(&mut self, codec: &mut dyn CommandCodec) -> Result<(), SessionError> {
        (**self).setup(codec)
    }

    fn send(&mut self, message: &RegisterMessage) -> Result<(), SendError> {
        (**self).send(message)
    }

    fn read_status(&mut self, num_bytes: usize) -> Result<Vec<u8>, ReadError> {
        (**self).read_status(num_bytes)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }

    fn state_handle(&self) -> Arc<AtomicConnectionState> {
        (**self).state_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gripper_protocol::RobotiqCodec;
    use gripper_transport::{MockHandle, MockTransport};

    fn session() -> (RegisterSession<MockTransport>, MockHandle) {
        let transport = MockTransport::new();
        let handle = transport.handle();
        let config = SessionConfig {
            settle_interval: Duration::ZERO,
            ..SessionConfig::default()
        };
        (RegisterSession::new(transport, config), handle)
    }

    #[test]
    fn test_send_while_disconnected() {
        let (mut session, handle) = session();
        let mut codec = RobotiqCodec::new();
        let before = *codec.command();

        let err = session.send(&RegisterMessage::from([0u8; 6])).unwrap_err();
        assert!(matches!(err, SendError::NotConnected));
        assert_eq!(*codec.command(), before);
        assert_eq!(handle.write_count(), 0);

        // 编解码器未被触碰
        codec.encode_text("o");
        assert_eq!(codec.command().position(), 0);
    }

    #[test]
    fn test_connect_is_idempotent() {
        let (mut session, handle) = session();
        session.connect().unwrap();
        session.connect().unwrap();
        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(handle.connect_count(), 1);
    }

    #[test]
    fn test_connect_failure_stays_disconnected() {
        let (mut session, handle) = session();
        handle.set_refuse_connect(true);
        assert!(session.connect().is_err());
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_send_writes_packed_registers() {
        let (mut session, handle) = session();
        session.connect().unwrap();
        session
            .send(&RegisterMessage::from([25u8, 0, 0, 0, 255, 150]))
            .unwrap();

        let write = handle.last_write().unwrap();
        assert_eq!(write.address, 0x03E8);
        assert_eq!(write.unit_id, 9);
        assert_eq!(write.values, vec![0x1900, 0x0000, 0xFF96]);
    }

    #[test]
    fn test_send_failure_disconnects() {
        let (mut session, handle) = session();
        session.connect().unwrap();
        handle.fail_next_writes(1);

        let err = session.send(&RegisterMessage::from([0u8; 6])).unwrap_err();
        assert!(matches!(err, SendError::Transport(TransportError::Timeout)));
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(!handle.is_open());

        // 不会静默重试
        assert!(matches!(
            session.send(&RegisterMessage::from([0u8; 6])),
            Err(SendError::NotConnected)
        ));
    }

    #[test]
    fn test_setup_sends_reset_then_activate() {
        let (mut session, handle) = session();
        let mut codec = RobotiqCodec::new();
        session.setup(&mut codec).unwrap();

        let writes = handle.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].values, vec![0x0000, 0x0000, 0x0000]);
        assert_eq!(writes[1].values, vec![0x1900, 0x0000, 0xFF96]);
        assert_eq!(codec.command().activate(), 1);
    }

    #[test]
    fn test_setup_fails_fast() {
        let (mut session, handle) = session();
        handle.fail_next_writes(1);
        let mut codec = RobotiqCodec::new();

        let err = session.setup(&mut codec).unwrap_err();
        assert!(matches!(err, SessionError::Send { step: "r", .. }));
        assert_eq!(handle.write_count(), 0);
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_setup_connect_refused() {
        let (mut session, handle) = session();
        handle.set_refuse_connect(true);
        let mut codec = RobotiqCodec::new();
        assert!(matches!(
            session.setup(&mut codec),
            Err(SessionError::Connect(_))
        ));
    }

    #[test]
    fn test_read_status_lengths() {
        let (mut session, handle) = session();
        assert!(matches!(
            session.read_status(0),
            Err(ReadError::InvalidLength(0))
        ));
        assert!(matches!(session.read_status(6), Err(ReadError::NotConnected)));

        session.connect().unwrap();
        handle.push_read(vec![0x4100, 0x0780, 0x4003]);
        assert_eq!(session.read_status(6).unwrap(), vec![0x41, 0x00, 0x07, 0x80, 0x40, 0x03]);

        // 奇数字节数向上取整到整寄存器
        handle.push_read(vec![0xABCD, 0xEF01]);
        assert_eq!(session.read_status(3).unwrap(), vec![0xAB, 0xCD, 0xEF, 0x01]);
    }

    #[test]
    fn test_read_failure_disconnects() {
        let (mut session, handle) = session();
        session.connect().unwrap();
        handle.fail_next_reads(1);
        assert!(matches!(
            session.read_status(6),
            Err(ReadError::Transport(TransportError::Timeout))
        ));
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect() {
        let (mut session, handle) = session();
        // 未连接时只记录警告
        session.disconnect();
        assert_eq!(handle.close_count(), 0);

        session.connect().unwrap();
        session.disconnect();
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(handle.close_count(), 1);
    }

    #[test]
    fn test_reconnect_reuses_session() {
        let (mut session, handle) = session();
        session.connect().unwrap();
        handle.fail_next_writes(1);
        let _ = session.send(&RegisterMessage::from([0u8; 6]));
        session.connect().unwrap();
        assert!(session.is_connected());
        assert_eq!(handle.connect_count(), 2);
    }
}
