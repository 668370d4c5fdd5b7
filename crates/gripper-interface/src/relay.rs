//! 状态中继
//!
//! 把 outbound（crossbeam）上的状态搬到 `tokio::sync::watch`，
//! 异步连接处理器因此可以在 `select!` 中等待状态。watch 只保留最新值，
//! 没有客户端时积压的旧状态自然被覆盖。

use crossbeam_channel::RecvTimeoutError;
use gripper_driver::{InterfaceLink, RunAccessor};
use gripper_protocol::InputStatus;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

const RELAY_POLL: Duration = Duration::from_millis(20);

pub(crate) struct StatusRelay {
    handle: Option<JoinHandle<()>>,
}

impl StatusRelay {
    /// 启动中继线程，返回最新状态的接收端
    pub(crate) fn spawn(
        link: InterfaceLink,
        run: RunAccessor,
    ) -> std::io::Result<(Self, watch::Receiver<Option<InputStatus>>)> {
        let (tx, rx) = watch::channel(link.drain_latest());
        let handle = std::thread::Builder::new()
            .name("gripper-status-relay".into())
            .spawn(move || {
                while run() {
                    match link.recv_status_timeout(RELAY_POLL) {
                        Ok(status) => {
                            tx.send_replace(Some(status));
                        },
                        Err(RecvTimeoutError::Timeout) => {},
                        Err(RecvTimeoutError::Disconnected) => {
                            warn!("Control loop has exited, no more statuses");
                            break;
                        },
                    }
                }
                debug!("Status relay stopped");
            })?;
        let relay = Self {
            handle: Some(handle),
        };
        Ok((relay, rx))
    }

    /// 等待中继线程退出（调用前 `run` 必须已返回 false）
    pub(crate) fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
