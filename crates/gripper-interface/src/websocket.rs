//! WebSocket 接口
//!
//! 每个文本帧是一条命令；状态以 JSON 文本帧推送给客户端。

use crate::error::InterfaceError;
use crate::server::{self, ConnectionContext, Framing, SHUTDOWN_POLL};
use futures_util::{SinkExt, StreamExt};
use gripper_driver::{InterfaceAdapter, InterfaceHooks, InterfaceLink};
use gripper_protocol::InputStatus;
use std::net::{SocketAddr, TcpListener};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// WebSocket 接口（一次一个客户端）
#[derive(Debug)]
pub struct WebSocketInterface {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl WebSocketInterface {
    /// 绑定监听地址（端口 0 表示由系统分配）
    pub fn bind(addr: SocketAddr) -> Result<Self, InterfaceError> {
        let listener = server::bind(addr)?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl InterfaceAdapter for WebSocketInterface {
    fn name(&self) -> &str {
        "websocket"
    }

    fn run(self: Box<Self>, link: InterfaceLink, hooks: InterfaceHooks) {
        server::run_blocking("websocket", self.listener, Framing::WebSocket, link, hooks);
    }
}

fn status_frame(status: &InputStatus) -> Result<Message, InterfaceError> {
    Ok(Message::Text(serde_json::to_string(status)?))
}

/// 服务一个客户端；返回 true 表示正常关闭
pub(crate) async fn serve_client(stream: TcpStream, ctx: &mut ConnectionContext) -> bool {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed: {}", e);
            return false;
        },
    };
    let (mut sink, mut frames) = ws.split();

    // 新客户端先拿到当前状态
    if let Some(status) = ctx.take_status() {
        if let Err(e) = send_status(&mut sink, &status).await {
            warn!("Failed to send status: {}", e);
            return false;
        }
    }

    let mut shutdown_tick = tokio::time::interval(SHUTDOWN_POLL);
    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => ctx.push(&text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => ctx.push(&text),
                    Err(_) => {
                        warn!("Rejecting non UTF-8 binary frame");
                        return false;
                    },
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("Client sent close: {:?}", frame);
                    return true;
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {}", e);
                    return false;
                },
                None => return true,
            },
            changed = ctx.statuses.changed() => {
                if changed.is_err() {
                    // 中继已停止，进程正在关闭
                    let _ = sink.send(Message::Close(None)).await;
                    return true;
                }
                if let Some(status) = ctx.take_status() {
                    if let Err(e) = send_status(&mut sink, &status).await {
                        warn!("Failed to send status: {}", e);
                        return false;
                    }
                }
            },
            _ = shutdown_tick.tick() => {
                if !(ctx.run)() {
                    let _ = sink.send(Message::Close(None)).await;
                    return true;
                }
            },
        }
    }
}

async fn send_status<S>(sink: &mut S, status: &InputStatus) -> Result<(), InterfaceError>
where
    S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    sink.send(status_frame(status)?).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_frame_is_json() {
        let status = InputStatus {
            activation_status: 1,
            actual_position: 200,
            ..InputStatus::default()
        };
        let Message::Text(text) = status_frame(&status).unwrap() else {
            panic!("Expected text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["activation_status"], 1);
        assert_eq!(value["actual_position"], 200);
        assert_eq!(value["fault_code"], 0);
    }

    #[test]
    fn test_bind_ephemeral_port() {
        let iface = WebSocketInterface::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(iface.local_addr().port(), 0);
        assert_eq!(iface.name(), "websocket");
    }

    #[test]
    fn test_bind_conflict_reports_address() {
        let first = WebSocketInterface::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let err = WebSocketInterface::bind(first.local_addr()).unwrap_err();
        assert!(matches!(err, InterfaceError::Bind { .. }));
        assert!(err.to_string().contains(&first.local_addr().to_string()));
    }
}
