//! TCP 行协议接口
//!
//! 每行一条 UTF-8 命令；状态以 JSON 行写回客户端。

use crate::error::InterfaceError;
use crate::server::{self, ConnectionContext, Framing, SHUTDOWN_POLL};
use gripper_driver::{InterfaceAdapter, InterfaceHooks, InterfaceLink};
use gripper_protocol::InputStatus;
use std::net::{SocketAddr, TcpListener};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::warn;

/// TCP 行协议接口（一次一个客户端）
#[derive(Debug)]
pub struct TcpLineInterface {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpLineInterface {
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

impl InterfaceAdapter for TcpLineInterface {
    fn name(&self) -> &str {
        "tcp-line"
    }

    fn run(self: Box<Self>, link: InterfaceLink, hooks: InterfaceHooks) {
        server::run_blocking("tcp-line", self.listener, Framing::Lines, link, hooks);
    }
}

fn status_line(status: &InputStatus) -> Result<String, InterfaceError> {
    let mut line = serde_json::to_string(status)?;
    line.push('\n');
    Ok(line)
}

async fn write_status<W>(writer: &mut W, status: &InputStatus) -> Result<(), InterfaceError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(status_line(status)?.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// 服务一个客户端；返回 true 表示正常关闭
pub(crate) async fn serve_client(stream: TcpStream, ctx: &mut ConnectionContext) -> bool {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    if let Some(status) = ctx.take_status() {
        if let Err(e) = write_status(&mut writer, &status).await {
            warn!("Failed to send status: {}", e);
            return false;
        }
    }

    let mut shutdown_tick = tokio::time::interval(SHUTDOWN_POLL);
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => ctx.push(&line),
                Ok(None) => return true,
                Err(e) => {
                    // 非 UTF-8 输入也落在这里
                    warn!("Line receive error: {}", e);
                    return false;
                },
            },
            changed = ctx.statuses.changed() => {
                if changed.is_err() {
                    let _ = writer.shutdown().await;
                    return true;
                }
                if let Some(status) = ctx.take_status() {
                    if let Err(e) = write_status(&mut writer, &status).await {
                        warn!("Failed to send status: {}", e);
                        return false;
                    }
                }
            },
            _ = shutdown_tick.tick() => {
                if !(ctx.run)() {
                    let _ = writer.shutdown().await;
                    return true;
                }
            },
        }
    }
}
