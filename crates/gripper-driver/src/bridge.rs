//! 桥接器
//!
//! 在各自的命名线程中启动控制循环与外部接口；关闭时控制循环一直等到会话断开，接口线程有界等待。

use crate::bus::CommandBus;
use crate::control_loop::{ControlLoop, ControlLoopConfig};
use crate::error::DriverError;
use crate::flags::SharedFlags;
use crate::interface::{InterfaceAdapter, InterfaceHooks};
use crate::metrics::LoopMetrics;
use crate::session::DeviceSession;
use crate::state::AtomicConnectionState;
use arc_swap::ArcSwapOption;
use crossbeam_channel::{RecvTimeoutError, bounded};
use gripper_protocol::{CommandCodec, InputStatus};
use std::sync::Arc;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{error, info, warn};

const CONTROL_THREAD_NAME: &str = "gripper-control";

/// 带超时的线程 join
///
/// 看门狗线程负责真正的 join，调用方只在通道上等待有限时间；
/// 超时后看门狗继续等待，进程退出时由操作系统回收。
trait JoinTimeout {
    fn join_timeout(self, name: &str, timeout: Duration) -> Result<(), DriverError>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, name: &str, timeout: Duration) -> Result<(), DriverError> {
        let (tx, rx) = bounded(1);
        spawn(move || {
            let _ = tx.send(self.join().is_ok());
        });

        match rx.recv_timeout(timeout) {
            Ok(true) => Ok(()),
            Ok(false) | Err(RecvTimeoutError::Disconnected) => {
                Err(DriverError::ThreadPanicked(name.to_string()))
            },
            Err(RecvTimeoutError::Timeout) => Err(DriverError::JoinTimeout(name.to_string())),
        }
    }
}

/// 等待控制循环退出
///
/// 不设超时：控制循环的最长停顿由激活序列的等待与传输超时决定，
/// 它必须完成当前发送并断开会话后才能返回。
fn join_control(handle: JoinHandle<()>) -> Result<(), DriverError> {
    handle
        .join()
        .map_err(|_| DriverError::ThreadPanicked(CONTROL_THREAD_NAME.to_string()))
}

/// 桥接器参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    pub control: ControlLoopConfig,
    /// 关闭时等待接口线程退出的上限
    pub join_timeout: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            control: ControlLoopConfig::default(),
            join_timeout: Duration::from_secs(2),
        }
    }
}

/// 运行中的桥接器
pub struct Bridge {
    flags: SharedFlags,
    metrics: Arc<LoopMetrics>,
    device_state: Arc<AtomicConnectionState>,
    latest_status: Arc<ArcSwapOption<InputStatus>>,
    control_thread: Option<JoinHandle<()>>,
    interface_thread: Option<JoinHandle<()>>,
    interface_name: String,
    join_timeout: Duration,
}

impl Bridge {
    /// 启动控制循环线程与接口线程
    ///
    /// `flags` 由调用方创建，信号处理器可以持有它的克隆来请求关闭。
    pub fn start<S>(
        codec: Box<dyn CommandCodec>,
        session: S,
        interface: Box<dyn InterfaceAdapter>,
        flags: SharedFlags,
        options: BridgeOptions,
    ) -> Result<Self, DriverError>
    where
        S: DeviceSession + 'static,
    {
        let (interface_link, loop_link) = CommandBus::new().split();
        let device_state = session.state_handle();

        let mut control_loop = ControlLoop::new(codec, session, loop_link, options.control);
        let metrics = control_loop.metrics();
        let latest_status = control_loop.latest_status();

        let run = flags.run_accessor();
        let control_thread = std::thread::Builder::new()
            .name(CONTROL_THREAD_NAME.into())
            .spawn(move || control_loop.run(|| run()))?;

        let interface_name = interface.name().to_string();
        let hooks = InterfaceHooks {
            run: flags.run_accessor(),
            set_connected: flags.connected_setter(),
        };
        let interface_thread = match std::thread::Builder::new()
            .name(format!("gripper-{}", interface_name))
            .spawn(move || interface.run(interface_link, hooks))
        {
            Ok(handle) => handle,
            Err(e) => {
                // 接口线程起不来时，控制循环也必须退出
                flags.request_shutdown();
                let _ = join_control(control_thread);
                return Err(DriverError::Spawn(e));
            },
        };

        info!("Bridge started (interface: {})", interface_name);
        Ok(Self {
            flags,
            metrics,
            device_state,
            latest_status,
            control_thread: Some(control_thread),
            interface_thread: Some(interface_thread),
            interface_name,
            join_timeout: options.join_timeout,
        })
    }

    pub fn flags(&self) -> &SharedFlags {
        &self.flags
    }

    pub fn metrics(&self) -> Arc<LoopMetrics> {
        self.metrics.clone()
    }

    /// 设备连接状态（只读）
    pub fn device_state(&self) -> Arc<AtomicConnectionState> {
        self.device_state.clone()
    }

    /// 最近一次成功读取的设备状态
    pub fn latest_status(&self) -> Option<InputStatus> {
        self.latest_status.load().as_deref().copied()
    }

    pub fn is_running(&self) -> bool {
        self.flags.is_running()
    }

    /// 阻塞直到有人请求关闭
    pub fn wait(&self) {
        while self.flags.is_running() {
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    /// 请求关闭并等待两个线程退出
    ///
    /// 控制循环完成正在进行的发送（或激活序列）后断开会话，返回前会话一定已断开；
    /// 接口线程最多等待 `join_timeout`。
    pub fn shutdown(mut self) -> Result<(), DriverError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.flags.request_shutdown();
        info!("Bridge shutting down");

        let mut first_error = None;
        if let Some(handle) = self.control_thread.take()
            && let Err(e) = join_control(handle)
        {
            error!("Control loop did not stop cleanly: {}", e);
            first_error.get_or_insert(e);
        }
        if let Some(handle) = self.interface_thread.take() {
            let name = format!("gripper-{}", self.interface_name);
            if let Err(e) = handle.join_timeout(&name, self.join_timeout) {
                warn!("Interface did not stop cleanly: {}", e);
                first_error.get_or_insert(e);
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            "Bridge stopped: {} commands received, {} dropped, {} sent ({} failed)",
            snapshot.commands_received,
            snapshot.commands_dropped,
            snapshot.send_attempts,
            snapshot.send_failures
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.control_thread.is_some() || self.interface_thread.is_some() {
            let _ = self.stop();
        }
    }
}
