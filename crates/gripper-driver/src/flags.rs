//! 共享标志
//!
//! `run`（进程是否继续运行）与 `connected`（外部接口是否有客户端）由同一把锁保护。
//! 接口只拿到访问闭包，拿不到锁本身；持锁区间内不做任何阻塞 IO。

use parking_lot::Mutex;
use std::sync::Arc;

/// 读取 `run` 的闭包
pub type RunAccessor = Arc<dyn Fn() -> bool + Send + Sync>;

/// 写入 `connected` 的闭包
pub type ConnectedSetter = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug)]
struct Flags {
    run: bool,
    connected: bool,
}

#[derive(Debug, Clone)]
pub struct SharedFlags {
    inner: Arc<Mutex<Flags>>,
}

impl Default for SharedFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedFlags {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Flags {
                run: true,
                connected: false,
            })),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().run
    }

    /// 请求关闭（只能置位一次，不可恢复）
    pub fn request_shutdown(&self) {
        self.inner.lock().run = false;
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().connected = connected;
    }

    pub fn run_accessor(&self) -> RunAccessor {
        let flags = self.clone();
        Arc::new(move || flags.is_running())
    }

    pub fn connected_setter(&self) -> ConnectedSetter {
        let flags = self.clone();
        Arc::new(move |value| flags.set_connected(value))
    }
}
