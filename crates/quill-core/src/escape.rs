//! 独立字面量转义例程。
//!
//! 未绑定连接时，引用器只能依据 [`EscapeConfig`] 声明的默认规则转义：单引号加倍；
//! 当 `standard_conforming_strings` 关闭时反斜杠同样加倍。例程不感知客户端编码，
//! 多字节字符按原样复制。

use crate::config::EscapeConfig;

/// 将 `src` 转义写入 `dst`，返回写入的字节数（不含末尾 NUL）。
///
/// # 契约说明（What）
/// - **前置条件**：`dst.len() >= 2 * src.len() + 1`，即最坏情况下每个字节都需要加倍，再加一个终止符；
/// - **后置条件**：成功时 `dst[..n]` 为转义结果，`dst[n] == 0`；容量不足时返回 `None` 且不保证 `dst` 内容；
/// - 嵌入的 NUL 字节按普通字节复制，不截断输入，保证转义结果可以逐字节还原。
pub fn escape_string(dst: &mut [u8], src: &[u8], rules: &EscapeConfig) -> Option<usize> {
    if dst.len() < src.len().checked_mul(2)?.checked_add(1)? {
        return None;
    }
    let mut written = 0;
    for &byte in src {
        if byte == b'\'' || (byte == b'\\' && !rules.standard_conforming_strings) {
            dst[written] = byte;
            written += 1;
        }
        dst[written] = byte;
        written += 1;
    }
    dst[written] = 0;
    Some(written)
}
