//! 接口层错误类型定义

use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterfaceError {
    /// 监听地址绑定失败
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// 套接字 IO 错误
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket 协议错误
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// 状态序列化失败
    #[error("Failed to encode status: {0}")]
    Encode(#[from] serde_json::Error),

    /// 运行时创建失败
    #[error("Failed to build async runtime: {0}")]
    Runtime(std::io::Error),
}

impl InterfaceError {
    pub(crate) fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}
