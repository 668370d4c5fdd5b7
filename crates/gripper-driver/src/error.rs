//! 驱动层错误类型定义

use gripper_transport::TransportError;
use thiserror::Error;

/// 连接失败（传输不可达）
#[derive(Error, Debug)]
#[error("Connect failed: {0}")]
pub struct ConnectError(#[from] pub TransportError);

/// 发送错误
#[derive(Error, Debug)]
pub enum SendError {
    /// 会话未连接
    #[error("Cannot send: session not connected")]
    NotConnected,

    /// 传输失败（会话已转为 Disconnected）
    #[error("Send failed: {0}")]
    Transport(#[from] TransportError),
}

/// 状态读取错误
#[derive(Error, Debug)]
pub enum ReadError {
    /// 请求字节数无效（为 0 或超出寄存器数上限）
    #[error("Invalid status length: {0}")]
    InvalidLength(usize),

    /// 会话未连接
    #[error("Cannot read status: session not connected")]
    NotConnected,

    /// 传输失败（会话已转为 Disconnected）
    #[error("Status read failed: {0}")]
    Transport(#[from] TransportError),
}

/// 激活序列错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Setup step {step:?} failed: {source}")]
    Send {
        step: &'static str,
        #[source]
        source: SendError,
    },
}

/// 驱动层错误类型（线程管理）
#[derive(Error, Debug)]
pub enum DriverError {
    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// 线程在限定时间内未退出
    #[error("Thread {0} did not exit within the join timeout")]
    JoinTimeout(String),

    /// 线程 panic
    #[error("Thread {0} panicked")]
    ThreadPanicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SendError::NotConnected.to_string(),
            "Cannot send: session not connected"
        );
        assert_eq!(
            ReadError::InvalidLength(0).to_string(),
            "Invalid status length: 0"
        );

        let err = SessionError::Send {
            step: "r",
            source: SendError::Transport(TransportError::Timeout),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"r\"") && msg.contains("Request timeout"), "{}", msg);

        assert_eq!(
            DriverError::JoinTimeout("gripper-control".into()).to_string(),
            "Thread gripper-control did not exit within the join timeout"
        );
    }

    #[test]
    fn test_from_transport_error() {
        let err: SendError = TransportError::NotOpen.into();
        assert!(matches!(err, SendError::Transport(TransportError::NotOpen)));

        let err: ReadError = TransportError::Timeout.into();
        assert!(matches!(err, ReadError::Transport(TransportError::Timeout)));

        let err: SessionError = ConnectError(TransportError::Timeout).into();
        assert!(matches!(err, SessionError::Connect(_)));
    }
}
