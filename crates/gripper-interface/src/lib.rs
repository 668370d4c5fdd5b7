//! # Gripper Interface Adapters
//!
//! 外部命令源的具体实现。每种接口在自己的 OS 线程上运行单线程 `tokio` 运行时，
//! 一次服务一个客户端，连接结束后自动重新监听：
//!
//! - [`WebSocketInterface`]：每个文本帧一条命令，状态以 JSON 文本帧返回
//! - [`TcpLineInterface`]：每行一条命令，状态以 JSON 行返回

mod error;
mod relay;
mod server;
pub mod tcp_line;
pub mod websocket;

pub use error::InterfaceError;
pub use tcp_line::TcpLineInterface;
pub use websocket::WebSocketInterface;

use gripper_driver::InterfaceAdapter;
use std::net::SocketAddr;

/// 接口类型（配置驱动的接口选择）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum InterfaceKind {
    #[default]
    #[serde(rename = "websocket")]
    WebSocket,
    #[serde(rename = "tcp_line")]
    TcpLine,
}

impl InterfaceKind {
    /// 绑定监听地址并创建对应接口
    pub fn bind(self, addr: SocketAddr) -> Result<Box<dyn InterfaceAdapter>, InterfaceError> {
        Ok(match self {
            Self::WebSocket => Box::new(WebSocketInterface::bind(addr)?),
            Self::TcpLine => Box::new(TcpLineInterface::bind(addr)?),
        })
    }
}

impl std::fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebSocket => f.write_str("websocket"),
            Self::TcpLine => f.write_str("tcp_line"),
        }
    }
}
