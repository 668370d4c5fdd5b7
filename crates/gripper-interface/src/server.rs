//! 单客户端监听循环
//!
//! 两种接口共享同一个循环：一次服务一个客户端；连接结束后推送终止通知并重新接受；
//! `run` 返回 false 后停止接受并返回。

use crate::error::InterfaceError;
use crate::relay::StatusRelay;
use crate::{tcp_line, websocket};
use gripper_driver::{InterfaceHooks, InterfaceLink, RunAccessor};
use gripper_protocol::InputStatus;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// 检查关闭请求的周期
pub(crate) const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// 连接的分帧方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    WebSocket,
    Lines,
}

/// 连接处理器共享的上下文
pub(crate) struct ConnectionContext {
    pub link: InterfaceLink,
    pub statuses: watch::Receiver<Option<InputStatus>>,
    pub run: RunAccessor,
}

impl ConnectionContext {
    /// 推送一条文本命令（去除首尾空白，空消息忽略）
    pub fn push(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.link.push_command(text) {
            warn!("Control loop has exited, command {:?} discarded", text);
        }
    }

    /// 取出当前最新状态并标记为已读
    pub fn take_status(&mut self) -> Option<InputStatus> {
        *self.statuses.borrow_and_update()
    }
}

/// 同步绑定监听地址（失败可在启动阶段立即报告）
pub(crate) fn bind(addr: SocketAddr) -> Result<StdTcpListener, InterfaceError> {
    let listener = StdTcpListener::bind(addr).map_err(|e| InterfaceError::bind(addr, e))?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// 在当前线程上运行单线程运行时，直到 `run` 返回 false
pub(crate) fn run_blocking(
    name: &str,
    listener: StdTcpListener,
    framing: Framing,
    link: InterfaceLink,
    hooks: InterfaceHooks,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("{} interface stopped: {}", name, InterfaceError::Runtime(e));
            return;
        },
    };

    let (relay, statuses) = match StatusRelay::spawn(link.clone(), hooks.run.clone()) {
        Ok(relay) => relay,
        Err(e) => {
            error!("{} interface stopped: cannot start status relay: {}", name, e);
            return;
        },
    };

    let mut ctx = ConnectionContext {
        link,
        statuses,
        run: hooks.run.clone(),
    };
    let result = runtime.block_on(accept_loop(name, listener, framing, &mut ctx, &hooks));
    if let Err(e) = result {
        error!("{} interface stopped: {}", name, e);
    }
    relay.join();
    (hooks.set_connected)(false);
    info!("{} interface stopped", name);
}

async fn accept_loop(
    name: &str,
    listener: StdTcpListener,
    framing: Framing,
    ctx: &mut ConnectionContext,
    hooks: &InterfaceHooks,
) -> Result<(), InterfaceError> {
    let listener = TcpListener::from_std(listener)?;
    info!("{} interface listening on {}", name, listener.local_addr()?);

    while (hooks.run)() {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = tokio::time::sleep(SHUTDOWN_POLL) => continue,
        };

        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                // 如 EMFILE：稍后重试
                warn!("{} accept failed: {}", name, e);
                tokio::time::sleep(SHUTDOWN_POLL).await;
                continue;
            },
        };

        info!("{} client connected: {}", name, peer);
        (hooks.set_connected)(true);
        let clean = serve(framing, stream, ctx).await;
        (hooks.set_connected)(false);

        if clean {
            info!("{} client disconnected: {}", name, peer);
        } else {
            warn!("{} client connection terminated abnormally: {}", name, peer);
        }
        ctx.link.push_termination(clean);
    }

    Ok(())
}

async fn serve(framing: Framing, stream: TcpStream, ctx: &mut ConnectionContext) -> bool {
    let _ = stream.set_nodelay(true);
    match framing {
        Framing::WebSocket => websocket::serve_client(stream, ctx).await,
        Framing::Lines => tcp_line::serve_client(stream, ctx).await,
    }
}
