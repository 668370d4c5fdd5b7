//! 命令总线
//!
//! 两条单向、无界、线程安全的 FIFO 通道：
//! - inbound：接口 → 控制循环（`InboundMessage`）
//! - outbound：控制循环 → 接口（`InputStatus`）
//!
//! 发送永不阻塞，接收阻塞直到有消息（控制循环使用带超时的接收以便响应关闭请求）。

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use gripper_protocol::InputStatus;
use std::time::Duration;

/// 接口推送给控制循环的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// 一条文本命令
    Command(String),
    /// 外部连接结束：`true` 为正常关闭，`false` 为异常
    Termination(bool),
}

/// 命令总线（持有两条通道的全部端点）
#[derive(Debug, Clone)]
pub struct CommandBus {
    inbound_tx: Sender<InboundMessage>,
    inbound_rx: Receiver<InboundMessage>,
    outbound_tx: Sender<InputStatus>,
    outbound_rx: Receiver<InputStatus>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        let (outbound_tx, outbound_rx) = unbounded();
        Self {
            inbound_tx,
            inbound_rx,
            outbound_tx,
            outbound_rx,
        }
    }

    /// 接口侧端点
    pub fn interface_link(&self) -> InterfaceLink {
        InterfaceLink {
            inbound: self.inbound_tx.clone(),
            outbound: self.outbound_rx.clone(),
        }
    }

    /// 控制循环侧端点
    pub fn loop_link(&self) -> LoopLink {
        LoopLink {
            inbound: self.inbound_rx.clone(),
            outbound: self.outbound_tx.clone(),
        }
    }

    /// 拆分为两侧端点，释放总线自身持有的端点
    ///
    /// 拆分后，任一侧全部端点被丢弃时另一侧会观察到通道关闭。
    pub fn split(self) -> (InterfaceLink, LoopLink) {
        (
            InterfaceLink {
                inbound: self.inbound_tx,
                outbound: self.outbound_rx,
            },
            LoopLink {
                inbound: self.inbound_rx,
                outbound: self.outbound_tx,
            },
        )
    }
}

/// 接口侧端点：推送命令/终止通知，读取状态
#[derive(Debug, Clone)]
pub struct InterfaceLink {
    inbound: Sender<InboundMessage>,
    outbound: Receiver<InputStatus>,
}

impl InterfaceLink {
    /// 推送一条命令；控制循环已退出时返回 false
    pub fn push_command(&self, text: impl Into<String>) -> bool {
        self.inbound
            .send(InboundMessage::Command(text.into()))
            .is_ok()
    }

    /// 推送终止通知
    pub fn push_termination(&self, clean: bool) -> bool {
        self.inbound.send(InboundMessage::Termination(clean)).is_ok()
    }

    /// 非阻塞读取一条状态
    pub fn try_recv_status(&self) -> Option<InputStatus> {
        self.outbound.try_recv().ok()
    }

    /// 带超时读取一条状态
    pub fn recv_status_timeout(&self, timeout: Duration) -> Result<InputStatus, RecvTimeoutError> {
        self.outbound.recv_timeout(timeout)
    }

    /// 取出队列中全部状态，只返回最新一条
    pub fn drain_latest(&self) -> Option<InputStatus> {
        let mut latest = None;
        loop {
            match self.outbound.try_recv() {
                Ok(status) => latest = Some(status),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    pub fn pending_statuses(&self) -> usize {
        self.outbound.len()
    }
}

/// 控制循环侧端点
#[derive(Debug, Clone)]
pub struct LoopLink {
    inbound: Receiver<InboundMessage>,
    outbound: Sender<InputStatus>,
}

impl LoopLink {
    /// 带超时接收一条 inbound 消息
    pub fn recv_timeout(&self, timeout: Duration) -> Result<InboundMessage, RecvTimeoutError> {
        self.inbound.recv_timeout(timeout)
    }

    /// 推送状态；接口侧已全部关闭时返回 false
    pub fn push_status(&self, status: InputStatus) -> bool {
        self.outbound.send(status).is_ok()
    }
}
