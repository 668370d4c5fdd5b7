//! 驱动层模块
//!
//! 本模块把异步的外部命令源与同步的设备会话桥接起来，包括：
//! - 设备会话（连接状态机、激活序列、寄存器读写）
//! - 命令总线（inbound 命令 / outbound 状态两条无界通道）
//! - 控制循环（按需重连、命令编码发送、状态轮询）
//! - 桥接器（线程管理、有界等待的关闭流程）
//!
//! # 使用场景
//!
//! 应用层通过 [`Bridge::start`] 组合一个编解码器、一个会话和一个外部接口；
//! 测试中可以直接驱动 [`ControlLoop`] 与 [`RegisterSession`]。

mod bridge;
pub mod bus;
pub mod control_loop;
mod error;
pub mod flags;
pub mod interface;
pub mod metrics;
pub mod session;
pub mod state;

pub use bridge::{Bridge, BridgeOptions};
pub use bus::{CommandBus, InboundMessage, InterfaceLink, LoopLink};
pub use control_loop::{ControlLoop, ControlLoopConfig};
pub use error::{ConnectError, DriverError, ReadError, SendError, SessionError};
pub use flags::{ConnectedSetter, RunAccessor, SharedFlags};
pub use interface::{InterfaceAdapter, InterfaceHooks};
pub use metrics::{LoopMetrics, MetricsSnapshot};
pub use session::{DEFAULT_SETTLE_INTERVAL, DeviceSession, RegisterSession, SessionConfig};
pub use state::{AtomicConnectionState, ConnectionState};
