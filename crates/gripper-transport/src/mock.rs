//! Mock 传输（用于测试，无需硬件）
//!
//! `MockTransport` 与若干 `MockHandle` 共享同一份内部状态：
//! 传输被移交给会话/控制循环后，测试仍可通过句柄注入故障、排队读响应并检查写入记录。

use crate::{RegisterTransport, TransportError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// 一次被记录的寄存器写入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub address: u16,
    pub values: Vec<u16>,
    pub unit_id: u8,
}

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    refuse_connect: bool,
    fail_writes: usize,
    fail_reads: usize,
    /// 每次写入的模拟耗时（模拟慢设备或即将超时的链路）
    write_delay: Duration,
    writes: Vec<RecordedWrite>,
    read_queue: VecDeque<Vec<u16>>,
    /// 读队列为空时返回的固定响应（None 表示返回全零）
    fixed_read: Option<Vec<u16>>,
    read_requests: usize,
    connects: usize,
    closes: usize,
}

/// Mock 传输
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// 共享的 Mock 控制句柄
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取共享控制句柄
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: self.state.clone(),
        }
    }
}

impl MockHandle {
    /// 拒绝（或恢复）后续连接
    pub fn set_refuse_connect(&self, refuse: bool) {
        self.state.lock().refuse_connect = refuse;
    }

    /// 接下来 `n` 次写入失败
    pub fn fail_next_writes(&self, n: usize) {
        self.state.lock().fail_writes = n;
    }

    /// 接下来 `n` 次读取失败
    pub fn fail_next_reads(&self, n: usize) {
        self.state.lock().fail_reads = n;
    }

    /// 每次写入前阻塞 `delay`
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = delay;
    }

    /// 排队一次读响应
    pub fn push_read(&self, registers: Vec<u16>) {
        self.state.lock().read_queue.push_back(registers);
    }

    /// 设置读队列为空时的固定响应
    pub fn set_fixed_read(&self, registers: Vec<u16>) {
        self.state.lock().fixed_read = Some(registers);
    }

    /// 模拟对端断开
    pub fn drop_connection(&self) {
        self.state.lock().open = false;
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    pub fn last_write(&self) -> Option<RecordedWrite> {
        self.state.lock().writes.last().cloned()
    }

    pub fn read_requests(&self) -> usize {
        self.state.lock().read_requests
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }
}

impl RegisterTransport for MockTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.connects += 1;
        if state.refuse_connect {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock: connection refused",
            )));
        }
        state.open = true;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.open {
            state.open = false;
            state.closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
        unit_id: u8,
    ) -> Result<(), TransportError> {
        let delay = self.state.lock().write_delay;
        if !delay.is_zero() {
            // 不持锁等待，测试线程仍可访问句柄
            std::thread::sleep(delay);
        }
        let mut state = self.state.lock();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(TransportError::Timeout);
        }
        state.writes.push(RecordedWrite {
            address,
            values: values.to_vec(),
            unit_id,
        });
        Ok(())
    }

    fn read_holding_registers(
        &mut self,
        _address: u16,
        count: u16,
        _unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        state.read_requests += 1;
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            return Err(TransportError::Timeout);
        }
        let mut registers = match state.read_queue.pop_front() {
            Some(regs) => regs,
            None => state.fixed_read.clone().unwrap_or_default(),
        };
        registers.resize(count as usize, 0);
        Ok(registers)
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
