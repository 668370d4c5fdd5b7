//! 控制循环指标
//!
//! 原子计数器，可在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制循环实时指标
///
/// # 使用示例
///
/// ```rust
/// use gripper_driver::LoopMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(LoopMetrics::default());
/// metrics.commands_received.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.commands_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct LoopMetrics {
    /// 收到的命令数
    pub commands_received: AtomicU64,

    /// 因激活序列失败而丢弃的命令数
    pub commands_dropped: AtomicU64,

    /// 命令发送次数（不含激活序列内部的发送）
    pub send_attempts: AtomicU64,

    /// 命令发送失败次数
    pub send_failures: AtomicU64,

    /// 激活序列尝试次数
    pub setup_attempts: AtomicU64,

    /// 激活序列失败次数
    pub setup_failures: AtomicU64,

    /// 状态读取次数
    pub status_reads: AtomicU64,

    /// 推送到 outbound 的状态数（仅状态变化时推送）
    pub status_pushed: AtomicU64,

    /// 状态读取或解码失败次数
    pub read_failures: AtomicU64,

    /// 收到的终止通知数
    pub terminations: AtomicU64,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_received: self.commands_received.load(Ordering::Relaxed),
            commands_dropped: self.commands_dropped.load(Ordering::Relaxed),
            send_attempts: self.send_attempts.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            setup_attempts: self.setup_attempts.load(Ordering::Relaxed),
            setup_failures: self.setup_failures.load(Ordering::Relaxed),
            status_reads: self.status_reads.load(Ordering::Relaxed),
            status_pushed: self.status_pushed.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            terminations: self.terminations.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub commands_received: u64,
    pub commands_dropped: u64,
    pub send_attempts: u64,
    pub send_failures: u64,
    pub setup_attempts: u64,
    pub setup_failures: u64,
    pub status_reads: u64,
    pub status_pushed: u64,
    pub read_failures: u64,
    pub terminations: u64,
}

impl MetricsSnapshot {
    /// 命令发送成功率（百分比），无发送时为 100.0
    pub fn send_success_rate(&self) -> f64 {
        if self.send_attempts == 0 {
            return 100.0;
        }
        let ok = self.send_attempts.saturating_sub(self.send_failures);
        (ok as f64 / self.send_attempts as f64) * 100.0
    }
}
