//! 外部接口适配器
//!
//! 接口在自己的执行上下文中接受外部文本命令，推入 inbound，
//! 并可从 outbound 读取状态用于显示。与控制循环之间只通过命令总线
//! 与共享标志的访问闭包交互。

use crate::bus::InterfaceLink;
use crate::flags::{ConnectedSetter, RunAccessor};

/// 接口运行时拿到的共享标志访问器
#[derive(Clone)]
pub struct InterfaceHooks {
    /// 进程是否继续运行；返回 false 后接口应尽快停止接受连接并返回
    pub run: RunAccessor,
    /// 更新外部客户端连接状态
    pub set_connected: ConnectedSetter,
}

impl std::fmt::Debug for InterfaceHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceHooks")
            .field("run", &(self.run)())
            .finish_non_exhaustive()
    }
}

/// 外部接口适配器
///
/// 约定：
/// - 每条收到的消息推送一次 `Command(text)`
/// - 连接正常关闭推送 `Termination(true)`，异常推送 `Termination(false)`
/// - 终止后重新监听新连接，无需重启进程
/// - 单个连接的错误只结束该连接
pub trait InterfaceAdapter: Send + 'static {
    /// 名称（用于线程名与日志）
    fn name(&self) -> &str;

    /// 阻塞运行，直到 `hooks.run` 返回 false
    fn run(self: Box<Self>, link: InterfaceLink, hooks: InterfaceHooks);
}
