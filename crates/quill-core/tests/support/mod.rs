//! 集成测试共享的伪连接与辅助函数。
//!
//! `FakeConnection` 模拟一个开启了 `standard_conforming_strings` 的连接：转义时只加倍单引号，
//! 并允许测试切换传输状态、注入转义失败、统计转义调用次数。
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use quill_core::{Connection, EscapeFailure};

pub struct FakeConnection {
    open: AtomicBool,
    version: i32,
    fail_escape: AtomicBool,
    escape_calls: AtomicUsize,
}

impl FakeConnection {
    pub fn new(version: i32) -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(true),
            version,
            fail_escape: AtomicBool::new(false),
            escape_calls: AtomicUsize::new(0),
        })
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn fail_next_escape(&self) {
        self.fail_escape.store(true, Ordering::SeqCst);
    }

    pub fn escape_calls(&self) -> usize {
        self.escape_calls.load(Ordering::SeqCst)
    }
}

pub const ESCAPE_ERROR: &str = "invalid byte sequence for encoding \"UTF8\": 0xff";

impl Connection for FakeConnection {
    fn transport_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn server_version(&self) -> i32 {
        self.version
    }

    fn escape_string_conn(&self, dst: &mut [u8], src: &[u8]) -> Result<usize, EscapeFailure> {
        self.escape_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_escape.swap(false, Ordering::SeqCst) {
            return Err(EscapeFailure);
        }
        assert!(dst.len() >= src.len() * 2 + 1, "调用方必须按最坏情况分配缓冲");
        let mut written = 0;
        for &byte in src {
            if byte == b'\'' {
                dst[written] = byte;
                written += 1;
            }
            dst[written] = byte;
            written += 1;
        }
        dst[written] = 0;
        Ok(written)
    }

    fn error_message(&self) -> String {
        ESCAPE_ERROR.to_owned()
    }
}

/// 将具体伪连接转为 trait 对象句柄。
pub fn as_dyn(conn: &Arc<FakeConnection>) -> Arc<dyn Connection> {
    conn.clone()
}

/// 还原字面量内部的转义；格式不合法时返回 `None`。
pub fn unescape_body(body: &[u8], backslash_doubled: bool) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut iter = body.iter().copied();
    while let Some(byte) = iter.next() {
        let doubled = byte == b'\'' || (backslash_doubled && byte == b'\\');
        if doubled && iter.next() != Some(byte) {
            return None;
        }
        out.push(byte);
    }
    Some(out)
}
