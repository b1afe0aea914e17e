//! # quote 模块说明
//!
//! ## 角色定位（Why）
//! - 把已编码的文本载荷包装成可直接嵌入查询文本的 SQL 字面量，无需与服务端往返；
//! - 有活动连接时委托连接的转义例程（感知客户端编码与 `standard_conforming_strings`），
//!   否则使用 [`escape_string`] 的保守规则。
//!
//! ## 缓冲策略（How）
//! - 一次性分配 `2 × len + 3` 字节：最坏情况下每个字节都需要两字节转义，再加两个引号与一个终止符；
//! - 转义结果写入缓冲内部，首尾补上单引号，最后截断到 `转义长度 + 2`，整个过程只分配一次。

use bytes::{Bytes, BytesMut};
use tracing::warn;

use crate::config::EscapeConfig;
use crate::connection::ConnectionRef;
use crate::context::AdaptContext;
use crate::error::{AdaptError, Result};
use crate::escape::escape_string;

const QUOTE: u8 = b'\'';

/// 将 `payload` 引用为 SQL 字面量。
///
/// # 契约说明（What）
/// - `connection` 为 `None` 时按 `escape` 规则独立转义；
/// - 连接已释放或传输句柄失效时返回 [`AdaptError::ConnectionClosed`]，此时尚未分配也未写入任何缓冲；
/// - 连接转义例程失败时返回 [`AdaptError::EscapeFailed`]，携带连接的错误文本；
/// - 成功时结果首尾均为单引号，内部为转义后的载荷。
pub fn quote_with(
    connection: Option<&ConnectionRef>,
    escape: &EscapeConfig,
    payload: &[u8],
) -> Result<Bytes> {
    let connection = match connection {
        None => None,
        Some(weak) => match weak.upgrade() {
            Some(conn) if conn.transport_open() => Some(conn),
            _ => {
                warn!(payload_len = payload.len(), "quote on a closed connection");
                return Err(AdaptError::ConnectionClosed);
            }
        },
    };

    let worst = payload
        .len()
        .checked_mul(2)
        .ok_or_else(|| AdaptError::data("literal too large to quote"))?;
    let mut buf = BytesMut::zeroed(worst + 3);

    let written = match &connection {
        Some(conn) => conn
            .escape_string_conn(&mut buf[1..], payload)
            .map_err(|_| {
                let message = conn.error_message();
                warn!(error = %message, "connection escape routine failed");
                AdaptError::EscapeFailed { message }
            })?,
        None => escape_string(&mut buf[1..], payload, escape)
            .ok_or_else(|| AdaptError::data("escape buffer too small"))?,
    };
    if written > worst {
        return Err(AdaptError::data(format!(
            "escape routine wrote {written} bytes for a {} byte payload",
            payload.len()
        )));
    }

    buf[0] = QUOTE;
    buf[written + 1] = QUOTE;
    buf.truncate(written + 2);
    Ok(buf.freeze())
}

/// 以上下文的连接与转义规则引用载荷。
pub fn quote_literal(ctx: &AdaptContext, payload: &[u8]) -> Result<Bytes> {
    quote_with(ctx.connection_ref(), &ctx.config().escape, payload)
}
