//! 字面量引用的安全性质。
//!
//! - **核心目标 (Why)**：任意字节串（包括空串、全是单引号、嵌入 NUL）经引用后，首尾均为单引号，
//!   内部按同一规则反转义后与 `dump` 的结果逐字节一致；
//! - **覆盖面 (What)**：独立转义（两种反斜杠规则）与连接转义两条路径，以及连接关闭、连接释放、转义失败三种失败路径。

mod support;

use std::any::Any;
use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;
use quill_core::{
    AdaptConfig, AdaptContext, AdaptError, BuildDumper, Dumper, DumperBase, EscapeConfig, Format,
    Oid, SourceType, downcast_source,
};
use support::{ESCAPE_ERROR, FakeConnection, as_dyn, unescape_body};
use tracing_test::traced_test;

/// 原样输出字节串的 Dumper，用于隔离引用逻辑。
struct Passthrough {
    base: DumperBase,
}

impl Dumper for Passthrough {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> quill_core::Result<Bytes> {
        let bytes = downcast_source::<Vec<u8>>(self.name(), value)?;
        Ok(Bytes::copy_from_slice(bytes))
    }
}

impl BuildDumper for Passthrough {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, Oid::TEXT, ctx),
        }
    }
}

fn dumper(ctx: &AdaptContext) -> Passthrough {
    Passthrough::build(SourceType::of::<Vec<u8>>(), ctx)
}

fn standalone(standard_conforming_strings: bool) -> AdaptContext {
    let mut config = AdaptConfig::default();
    config.escape = EscapeConfig {
        standard_conforming_strings,
    };
    AdaptContext::new().with_config(config)
}

fn assert_reconstructs(quoted: &[u8], original: &[u8], backslash_doubled: bool) {
    assert!(quoted.len() >= 2, "字面量至少包含两个引号");
    assert_eq!(quoted[0], b'\'');
    assert_eq!(quoted[quoted.len() - 1], b'\'');
    let body = &quoted[1..quoted.len() - 1];
    let restored = unescape_body(body, backslash_doubled).expect("内部转义必须合法");
    assert_eq!(restored, original);
}

fn tricky_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![Just(b'\''), Just(b'\\'), Just(0u8), any::<u8>()],
        0..64,
    )
}

proptest! {
    #[test]
    fn standalone_quote_reconstructs_payload(payload in tricky_bytes(), standard in any::<bool>()) {
        let ctx = standalone(standard);
        let quoted = dumper(&ctx).quote(&payload).expect("独立转义不会失败");
        assert_reconstructs(&quoted, &payload, !standard);
    }

    #[test]
    fn connection_quote_reconstructs_payload(payload in tricky_bytes()) {
        let conn = FakeConnection::new(160_000);
        let ctx = AdaptContext::new().with_connection(&as_dyn(&conn));
        let quoted = dumper(&ctx).quote(&payload).expect("连接转义应成功");
        // Why: 伪连接开启了标准字符串，反斜杠不会加倍。
        assert_reconstructs(&quoted, &payload, false);
        prop_assert_eq!(conn.escape_calls(), 1);
    }
}

#[test]
fn edge_payloads_quote_exactly() {
    let ctx = AdaptContext::new();
    let quote = |payload: &[u8]| -> Vec<u8> {
        dumper(&ctx)
            .quote(&payload.to_vec())
            .expect("独立转义不会失败")
            .to_vec()
    };

    assert_eq!(quote(b""), b"''");
    assert_eq!(quote(b"'''"), b"''''''''");
    assert_eq!(quote(b"a\0b"), b"'a\0b'");
    assert_eq!(quote(br"C:\tmp"), br"'C:\\tmp'");
}

#[traced_test]
#[test]
fn closed_transport_fails_without_escaping() {
    let conn = FakeConnection::new(160_000);
    let ctx = AdaptContext::new().with_connection(&as_dyn(&conn));
    let dumper = dumper(&ctx);
    conn.close();

    let err = dumper.quote(&b"x".to_vec()).expect_err("传输关闭后引用必须失败");
    assert_eq!(err, AdaptError::ConnectionClosed);
    assert_eq!(err.to_string(), "the connection is closed");
    assert_eq!(conn.escape_calls(), 0, "失败前不得触碰转义例程");
    assert!(logs_contain("quote on a closed connection"));
}

#[test]
fn dropped_connection_is_detected() {
    let conn = FakeConnection::new(160_000);
    let handle = as_dyn(&conn);
    let ctx = AdaptContext::new().with_connection(&handle);
    let dumper = dumper(&ctx);
    drop(handle);
    drop(conn);

    let err = dumper.quote(&b"x".to_vec()).expect_err("连接释放后引用必须失败");
    assert!(err.is_operational());
    assert_eq!(err, AdaptError::ConnectionClosed);
}

#[test]
fn escape_failure_carries_connection_message() {
    let conn = FakeConnection::new(160_000);
    let ctx = AdaptContext::new().with_connection(&as_dyn(&conn));
    conn.fail_next_escape();

    let err = dumper(&ctx).quote(&vec![0xffu8]).expect_err("注入的转义失败必须上抛");
    assert_eq!(
        err,
        AdaptError::EscapeFailed {
            message: ESCAPE_ERROR.to_owned(),
        }
    );
    assert!(err.is_operational());

    // Why: 失败只注入一次，后续引用恢复正常。
    let quoted = dumper(&ctx).quote(&b"ok".to_vec()).expect("恢复后应成功");
    assert_eq!(&quoted[..], b"'ok'");
    assert_eq!(Arc::strong_count(&conn), 1);
}
