//! 连接状态
//!
//! `ConnectionState` 只由设备会话写入；控制循环、桥接器与接口通过
//! `AtomicConnectionState` 无锁观察。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 会话连接状态
///
/// `Disconnected → Connecting → Connected`，任何传输错误都回落到 `Disconnected`。
/// `Connecting` 只在 `connect()` 调用期间可见。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    /// 从 u8 转换，无效值视为 Disconnected
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// 连接状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 获取当前状态
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 设置状态（仅会话调用）
    pub(crate) fn set(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.inner.swap(state.as_u8(), Ordering::AcqRel))
    }

    pub fn is_connected(&self) -> bool {
        self.get().is_connected()
    }
}
