//! 引导注册的顺序契约：参考目录在前、优化目录在后时，优化实现生效。
//!
//! 反向顺序的结果由目录负责，这里不作断言。

use std::sync::Arc;

use bytes::Bytes;
use quill_codecs::{
    PgArray, register_builtin_optimized_adapters, register_builtin_optimized_adapters_into,
    register_builtin_reference_adapters, register_builtin_reference_adapters_into,
};
use quill_core::{AdaptContext, AdaptersMap, Format, Oid, SourceType, Transformer};
use tracing_test::traced_test;

fn dumper_name(map: &AdaptersMap, source: SourceType, format: Format) -> String {
    map.lookup_dumper(source, format)
        .expect("内置 Dumper 应已注册")
        .name()
        .to_owned()
}

fn loader_name(map: &AdaptersMap, oid: Oid, format: Format) -> String {
    map.lookup_loader(oid, format)
        .expect("内置 Loader 应已注册")
        .name()
        .to_owned()
}

#[test]
fn reference_then_optimized_activates_optimized_codecs() {
    let map = AdaptersMap::new();
    register_builtin_reference_adapters_into(&map);
    assert!(dumper_name(&map, SourceType::of::<i32>(), Format::Text).contains("reference"));

    register_builtin_optimized_adapters_into(&map);
    for format in Format::ALL {
        for source in [
            SourceType::of::<i16>(),
            SourceType::of::<i32>(),
            SourceType::of::<i64>(),
            SourceType::of::<f64>(),
            SourceType::of::<bool>(),
            SourceType::of::<String>(),
            SourceType::of::<Vec<u8>>(),
        ] {
            let name = dumper_name(&map, source, format);
            assert!(name.contains("optimized"), "{source:?}/{format}: {name}");
        }
        for oid in [Oid::INT2, Oid::INT4, Oid::INT8, Oid::OID, Oid::FLOAT8, Oid::BOOL, Oid::TEXT, Oid::BYTEA] {
            let name = loader_name(&map, oid, format);
            assert!(name.contains("optimized"), "{oid}/{format}: {name}");
        }
    }
}

#[test]
fn optimized_set_covers_every_reference_key() {
    let reference = AdaptersMap::new();
    register_builtin_reference_adapters_into(&reference);
    let combined = reference.snapshot();
    register_builtin_optimized_adapters_into(&combined);

    // Why: 覆盖式注册不应新增键，否则说明两套目录的覆盖范围不一致。
    assert_eq!(combined.dumper_count(), reference.dumper_count());
    assert_eq!(combined.loader_count(), reference.loader_count());
}

#[test]
fn reinvocation_is_harmless() {
    let map = AdaptersMap::new();
    register_builtin_reference_adapters_into(&map);
    register_builtin_optimized_adapters_into(&map);
    let (dumpers, loaders) = (map.dumper_count(), map.loader_count());

    register_builtin_optimized_adapters_into(&map);
    assert_eq!(map.dumper_count(), dumpers);
    assert_eq!(map.loader_count(), loaders);

    let mut tx = Transformer::new(AdaptContext::new().with_registry(Arc::new(map)));
    assert_eq!(tx.dump(&42i32, Format::Text).expect("编码应成功"), Bytes::from_static(b"42"));
}

#[test]
fn array_codecs_are_installed_with_the_base_groups() {
    let map = AdaptersMap::new();
    register_builtin_reference_adapters_into(&map);
    register_builtin_optimized_adapters_into(&map);

    assert!(map.lookup_dumper(SourceType::of::<PgArray>(), Format::Text).is_some());
    assert!(map.lookup_dumper(SourceType::of::<PgArray>(), Format::Binary).is_some());
    assert_eq!(loader_name(&map, Oid::INT4_ARRAY, Format::Text), "Int4ArrayLoader");
    assert_eq!(loader_name(&map, Oid::TEXT_ARRAY, Format::Binary), "TextArrayBinaryLoader");
}

#[traced_test]
#[test]
fn global_bootstrap_logs_each_group() {
    register_builtin_reference_adapters();
    register_builtin_optimized_adapters();

    let name = dumper_name(AdaptersMap::global(), SourceType::of::<i64>(), Format::Binary);
    assert!(name.contains("optimized"), "{name}");
    assert!(logs_contain("adapter group installed"));
    assert!(logs_contain("optimized"));
    assert!(logs_contain("group=singletons"));
}
