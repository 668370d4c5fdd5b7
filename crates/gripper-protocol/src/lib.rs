//! # Gripper Protocol
//!
//! 夹爪寄存器协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 寄存器地址、设备标识等协议常量
//! - `token`: 符号命令（`"a"`、`"c"`、`"120"` 等）解析
//! - `command`: 输出命令（OutputCommand）与寄存器消息构建
//! - `status`: 输入状态（InputStatus）解析
//! - `codec`: `CommandCodec` trait 及 Robotiq 实现
//!
//! ## 字节序
//!
//! 寄存器为 16 位，两个字节一组按大端（高字节在前）打包。
//! 本模块提供了打包/解包工具函数。

pub mod codec;
pub mod command;
pub mod constants;
pub mod status;
pub mod token;

// 重新导出常用类型
pub use codec::*;
pub use command::*;
pub use constants::*;
pub use status::*;
pub use token::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 状态字节数不足，无法解码
    ///
    /// 空输入同样返回此错误，不会静默返回全零状态
    /// （全零状态会被误读为"设备已复位"）。
    #[error("Malformed status: expected at least {expected} bytes, got {actual}")]
    MalformedStatus { expected: usize, actual: usize },
}

/// 将整数限制在 `[lo, hi]` 区间
///
/// 幂等：`clamp(clamp(x, lo, hi), lo, hi) == clamp(x, lo, hi)`。
pub fn clamp(value: i64, lo: i64, hi: i64) -> i64 {
    value.max(lo).min(hi)
}

/// 字节序列打包为 16 位寄存器（大端）
///
/// 奇数长度时在末尾补一个 0 字节（落在最后一个寄存器的低字节）。
pub fn pack_registers(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| {
            let high = pair[0];
            let low = pair.get(1).copied().unwrap_or(0);
            u16::from_be_bytes([high, low])
        })
        .collect()
}

/// 16 位寄存器解包为字节序列
///
/// 每个寄存器按 (高字节, 低字节) 顺序展开，输出长度为 `2 * registers.len()`。
pub fn unpack_registers(registers: &[u16]) -> Vec<u8> {
    registers.iter().flat_map(|reg| reg.to_be_bytes()).collect()
}

/// 读取 `num_bytes` 字节所需的寄存器数量（向上取整）
pub fn registers_for_bytes(num_bytes: usize) -> usize {
    num_bytes.div_ceil(2)
}
