//! Dumper 与 Loader 的构造期行为：旧版本 OID 规则、连接弱引用、基础方法的“未实现”语义。

mod support;

use std::any::Any;
use std::sync::Arc;

use bytes::Bytes;
use quill_core::{
    AdaptConfig, AdaptContext, AdaptError, AdaptersMap, BuildDumper, BuildLoader, Dumper,
    DumperBase, DumperFactory, Format, Loader, LoaderBase, LoaderFactory, Oid, SourceType,
};
use support::{FakeConnection, as_dyn};

struct Unset(DumperBase);

impl Dumper for Unset {
    fn base(&self) -> &DumperBase {
        &self.0
    }
}

impl BuildDumper for Unset {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self(DumperBase::new(source, Format::Text, Oid::UNSPECIFIED, ctx))
    }
}

struct Fixed(DumperBase);

impl Dumper for Fixed {
    fn base(&self) -> &DumperBase {
        &self.0
    }
}

impl BuildDumper for Fixed {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self(DumperBase::new(source, Format::Binary, Oid::INT8, ctx))
    }
}

struct Opaque(LoaderBase);

impl Loader for Opaque {
    fn base(&self) -> &LoaderBase {
        &self.0
    }
}

impl BuildLoader for Opaque {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self(LoaderBase::new(oid, Format::Text, ctx))
    }
}

fn unset_for(version: i32) -> Oid {
    let conn = FakeConnection::new(version);
    let ctx = AdaptContext::new().with_connection(&as_dyn(&conn));
    Unset::build(SourceType::of::<String>(), &ctx).oid()
}

#[test]
fn legacy_server_forces_text_oid() {
    assert_eq!(unset_for(99_999), Oid::TEXT);
    assert_eq!(unset_for(90_600), Oid::TEXT);
}

#[test]
fn modern_server_keeps_unspecified_oid() {
    assert_eq!(unset_for(100_000), Oid::UNSPECIFIED);
    assert_eq!(unset_for(160_002), Oid::UNSPECIFIED);
}

#[test]
fn explicit_oid_is_never_rewritten() {
    let conn = FakeConnection::new(90_000);
    let ctx = AdaptContext::new().with_connection(&as_dyn(&conn));
    let dumper = Fixed::build(SourceType::of::<i64>(), &ctx);
    assert_eq!(dumper.oid(), Oid::INT8);
    assert_eq!(dumper.format(), Format::Binary);
}

#[test]
fn cutoff_is_configurable() {
    let config = AdaptConfig::from_toml_str("[legacy]\nunknown_oid_cutoff = 120000\n")
        .expect("合法配置应解析成功");
    let conn = FakeConnection::new(110_000);
    let ctx = AdaptContext::new()
        .with_connection(&as_dyn(&conn))
        .with_config(config);
    let dumper = Unset::build(SourceType::of::<String>(), &ctx);
    assert_eq!(dumper.oid(), Oid::TEXT);
}

#[test]
fn dropped_connection_skips_legacy_rule() {
    let conn = FakeConnection::new(90_000);
    let handle = as_dyn(&conn);
    let ctx = AdaptContext::new().with_connection(&handle);
    drop(handle);
    drop(conn);
    let dumper = Unset::build(SourceType::of::<String>(), &ctx);
    assert!(dumper.oid().is_unspecified());
}

#[test]
fn codecs_hold_only_weak_connection_references() {
    let conn = FakeConnection::new(160_000);
    let ctx = AdaptContext::new().with_connection(&as_dyn(&conn));
    let dumper = Unset::build(SourceType::of::<String>(), &ctx);
    let loader = Opaque::build(Oid::TEXT, &ctx);
    assert_eq!(Arc::strong_count(&conn), 1);
    assert!(dumper.base().connection().is_some());
    assert!(loader.base().connection().is_some());
}

#[test]
fn base_operations_report_not_implemented() {
    let map = Arc::new(AdaptersMap::new());
    let ctx = AdaptContext::new().with_registry(Arc::clone(&map));
    DumperFactory::of::<Unset>().register(SourceType::of::<String>(), Some(&ctx), Format::Text);
    LoaderFactory::of::<Opaque>().register(Oid::TEXT, Some(&ctx), Format::Text);

    let dumper = map
        .lookup_dumper(SourceType::of::<String>(), Format::Text)
        .expect("已注册")
        .build(SourceType::of::<String>(), &ctx);
    let value: &dyn Any = &String::from("x");
    match dumper.dump(value) {
        Err(AdaptError::NotImplemented { codec, operation }) => {
            assert!(codec.ends_with("Unset"));
            assert_eq!(operation, "dump");
        }
        other => panic!("预期未实现错误，实际为 {other:?}"),
    }

    let loader = map
        .lookup_loader(Oid::TEXT, Format::Text)
        .expect("已注册")
        .build(Oid::TEXT, &ctx);
    let err = loader
        .load(&Bytes::from_static(b"x"))
        .expect_err("基础 Loader 必须拒绝解码");
    assert_eq!(err.code(), quill_core::codes::NOT_IMPLEMENTED);
}
