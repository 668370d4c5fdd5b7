//! 控制循环
//!
//! inbound 的唯一消费者、设备命令路径的唯一驱动者。每次迭代：
//!
//! 1. 从 inbound 取一条消息（带超时，以便响应关闭请求与状态轮询）
//! 2. `Termination`：记录日志，不做任何恢复（接口自行重新监听）
//! 3. `Command`：会话未连接时先执行激活序列，失败则丢弃该命令；
//!    否则编码并发送，发送失败只记录日志
//! 4. 固定间隔休眠，限制设备流量
//!
//! 设备故障永远不会终止循环；只有外部关闭信号能让它退出。

use crate::bus::{InboundMessage, LoopLink};
use crate::metrics::LoopMetrics;
use crate::session::DeviceSession;
use arc_swap::ArcSwapOption;
use crossbeam_channel::RecvTimeoutError;
use gripper_protocol::{CommandCodec, InputStatus};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 控制循环参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlLoopConfig {
    /// 每处理一条消息后的休眠时间
    pub loop_interval: Duration,
    /// 状态轮询周期（`Duration::ZERO` 关闭轮询）
    pub status_poll_interval: Duration,
    /// 每次状态读取的字节数
    pub status_bytes: usize,
    /// inbound 空闲时检查关闭请求的周期
    pub idle_timeout: Duration,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            loop_interval: Duration::from_millis(10),
            status_poll_interval: Duration::from_millis(200),
            status_bytes: gripper_protocol::STATUS_MESSAGE_LEN,
            idle_timeout: Duration::from_millis(50),
        }
    }
}

/// 控制循环
pub struct ControlLoop<S: DeviceSession> {
    codec: Box<dyn CommandCodec>,
    session: S,
    link: LoopLink,
    config: ControlLoopConfig,
    metrics: Arc<LoopMetrics>,
    latest_status: Arc<ArcSwapOption<InputStatus>>,
    last_pushed: Option<InputStatus>,
    next_poll: Instant,
}

impl<S: DeviceSession> ControlLoop<S> {
    pub fn new(
        codec: Box<dyn CommandCodec>,
        session: S,
        link: LoopLink,
        config: ControlLoopConfig,
    ) -> Self {
        Self {
            codec,
            session,
            link,
            config,
            metrics: Arc::new(LoopMetrics::new()),
            latest_status: Arc::new(ArcSwapOption::empty()),
            last_pushed: None,
            next_poll: Instant::now(),
        }
    }

    pub fn metrics(&self) -> Arc<LoopMetrics> {
        self.metrics.clone()
    }

    /// 最近一次成功读取的状态（无锁读取）
    pub fn latest_status(&self) -> Arc<ArcSwapOption<InputStatus>> {
        self.latest_status.clone()
    }

    pub fn codec(&self) -> &dyn CommandCodec {
        self.codec.as_ref()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// 运行直到 `should_continue` 返回 false 或 inbound 关闭
    ///
    /// 退出前断开会话。
    pub fn run<F>(&mut self, should_continue: F)
    where
        F: Fn() -> bool,
    {
        info!("Control loop started");
        while should_continue() {
            match self.link.recv_timeout(self.wait_budget()) {
                Ok(message) => {
                    // 关闭请求到达后不再开始新的发送
                    if !should_continue() {
                        debug!("Shutdown requested, discarding {:?}", message);
                        break;
                    }
                    self.handle_message(message);
                    thread::sleep(self.config.loop_interval);
                },
                Err(RecvTimeoutError::Timeout) => {},
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Inbound channel closed, control loop exiting");
                    break;
                },
            }

            if self.poll_due() {
                self.poll_status();
            }
        }

        if self.session.is_connected() {
            self.session.disconnect();
        }
        info!("Control loop stopped");
    }

    /// 处理一条 inbound 消息
    pub fn handle_message(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::Termination(clean) => {
                LoopMetrics::incr(&self.metrics.terminations);
                if clean {
                    info!("Interface connection closed");
                } else {
                    warn!("Interface connection terminated abnormally");
                }
            },
            InboundMessage::Command(text) => self.handle_command(&text),
        }
    }

    fn handle_command(&mut self, text: &str) {
        LoopMetrics::incr(&self.metrics.commands_received);

        if !self.session.is_connected() {
            LoopMetrics::incr(&self.metrics.setup_attempts);
            if let Err(e) = self.session.setup(self.codec.as_mut()) {
                LoopMetrics::incr(&self.metrics.setup_failures);
                LoopMetrics::incr(&self.metrics.commands_dropped);
                warn!("Dropping command {:?}: device setup failed: {}", text, e);
                return;
            }
        }

        let message = self.codec.encode_text(text);
        LoopMetrics::incr(&self.metrics.send_attempts);
        match self.session.send(&message) {
            Ok(()) => trace!("Command {:?} sent", text),
            Err(e) => {
                LoopMetrics::incr(&self.metrics.send_failures);
                warn!("Failed to send command {:?}: {}", text, e);
            },
        }
    }

    /// 读取一次状态；只在状态变化时推送到 outbound
    ///
    /// 从不触发重连：未连接时直接返回。
    pub fn poll_status(&mut self) {
        self.next_poll = Instant::now() + self.config.status_poll_interval;
        if !self.session.is_connected() {
            return;
        }

        LoopMetrics::incr(&self.metrics.status_reads);
        let status = match self.session.read_status(self.config.status_bytes) {
            Ok(bytes) => match self.codec.decode(&bytes) {
                Ok(status) => status,
                Err(e) => {
                    LoopMetrics::incr(&self.metrics.read_failures);
                    warn!("Discarding undecodable status {:?}: {}", bytes, e);
                    return;
                },
            },
            Err(e) => {
                LoopMetrics::incr(&self.metrics.read_failures);
                warn!("Status read failed: {}", e);
                return;
            },
        };

        self.latest_status.store(Some(Arc::new(status)));
        if self.last_pushed == Some(status) {
            return;
        }
        if self.link.push_status(status) {
            LoopMetrics::incr(&self.metrics.status_pushed);
        } else {
            debug!("No status consumer attached");
        }
        self.last_pushed = Some(status);
    }

    fn polling_enabled(&self) -> bool {
        !self.config.status_poll_interval.is_zero()
    }

    fn poll_due(&self) -> bool {
        self.polling_enabled() && Instant::now() >= self.next_poll
    }

    /// 下一次 inbound 等待的上限：空闲超时与下一次轮询时刻取较小者
    fn wait_budget(&self) -> Duration {
        if !self.polling_enabled() || !self.session.is_connected() {
            return self.config.idle_timeout;
        }
        self.next_poll
            .saturating_duration_since(Instant::now())
            .min(self.config.idle_timeout)
    }
}
