//! 注册中心契约：覆盖式注册、上下文隔离、注册入口的目标选择。
//!
//! 进程级注册中心在同一测试二进制内共享，因此每个用例都使用自己独有的源类型或 OID 作为键，
//! 互不干扰。

use std::sync::Arc;

use quill_core::{
    AdaptContext, AdaptersMap, Dumper, DumperBase, DumperFactory, Format, Loader, LoaderBase,
    LoaderFactory, Oid, SourceType, Transformer,
};
use tracing_test::traced_test;

struct Marker(DumperBase);

impl Dumper for Marker {
    fn base(&self) -> &DumperBase {
        &self.0
    }
}

struct Reader(LoaderBase);

impl Loader for Reader {
    fn base(&self) -> &LoaderBase {
        &self.0
    }
}

fn named_dumper(name: &'static str) -> DumperFactory {
    DumperFactory::new(name, |source, ctx| {
        Box::new(Marker(DumperBase::new(source, Format::Text, Oid::TEXT, ctx)))
    })
}

fn named_loader(name: &'static str) -> LoaderFactory {
    LoaderFactory::new(name, |oid, ctx| {
        Box::new(Reader(LoaderBase::new(oid, Format::Text, ctx)))
    })
}

#[traced_test]
#[test]
fn optimized_registration_shadows_reference() {
    struct Shadowed;
    let source = SourceType::of::<Shadowed>();

    let reference = named_dumper("reference");
    let optimized = named_dumper("optimized");
    reference.register(source, None, Format::Text);
    optimized.register(source, None, Format::Text);

    let found = AdaptersMap::global()
        .lookup_dumper(source, Format::Text)
        .expect("全局注册中心应命中");
    assert!(found.ptr_eq(&optimized), "后注册的构造器必须生效");
    assert!(!found.ptr_eq(&reference));
    assert!(logs_contain("shadowed=true"));
}

#[test]
fn loader_shadowing_follows_the_same_rule() {
    let oid = Oid::new(900_001);
    let map = AdaptersMap::new();
    named_loader("reference").register_into(&map, oid, Format::Binary);
    named_loader("optimized").register_into(&map, oid, Format::Binary);

    let found = map.lookup_loader(oid, Format::Binary).expect("应命中");
    assert_eq!(found.name(), "optimized");
    assert_eq!(map.loader_count(), 1);
}

#[test]
fn context_registration_never_touches_global() {
    struct LocalOnly;
    let source = SourceType::of::<LocalOnly>();
    let oid = Oid::new(900_002);

    let ctx = AdaptContext::new().with_registry(Arc::new(AdaptersMap::new()));
    named_dumper("local").register(source, Some(&ctx), Format::Text);
    named_loader("local").register(oid, Some(&ctx), Format::Text);

    assert!(ctx.adapters().lookup_dumper(source, Format::Text).is_some());
    assert!(ctx.adapters().has_loader(oid, Format::Text));
    assert!(AdaptersMap::global().lookup_dumper(source, Format::Text).is_none());
    assert!(!AdaptersMap::global().has_loader(oid, Format::Text));
}

#[test]
fn context_without_local_registry_targets_global() {
    struct ViaContext;
    let source = SourceType::of::<ViaContext>();

    let ctx = AdaptContext::new();
    named_dumper("global").register(source, Some(&ctx), Format::Binary);
    assert!(AdaptersMap::global().lookup_dumper(source, Format::Binary).is_some());
}

#[test]
fn local_registry_does_not_fall_back_to_global() {
    struct GlobalOnly;
    let source = SourceType::of::<GlobalOnly>();
    named_dumper("global").register(source, None, Format::Text);

    let ctx = AdaptContext::new().with_registry(Arc::new(AdaptersMap::new()));
    let mut tx = Transformer::new(ctx);
    // Why: 私有注册中心未命中时必须报错，而不是悄悄查询全局实例。
    let err = tx
        .dumper_for_type(source, Format::Text)
        .err()
        .expect("私有注册中心中不存在该键");
    assert_eq!(err.code(), quill_core::codes::DUMPER_MISSING);
}

#[test]
fn seeded_context_inherits_then_diverges() {
    struct Seeded;
    struct LaterGlobal;
    let seeded = SourceType::of::<Seeded>();
    let later = SourceType::of::<LaterGlobal>();
    named_dumper("seeded").register(seeded, None, Format::Text);

    let ctx = AdaptContext::seeded_from_global();
    assert!(ctx.has_local_registry());
    assert!(ctx.adapters().lookup_dumper(seeded, Format::Text).is_some());

    named_dumper("later").register(later, None, Format::Text);
    assert!(ctx.adapters().lookup_dumper(later, Format::Text).is_none());
}
