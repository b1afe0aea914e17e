//! 单次操作范围内的编解码实例缓存。
//!
//! [`Transformer`] 以一个 [`AdaptContext`] 为起点，按值的运行时类型解析 Dumper、按 OID 解析 Loader，
//! 并在自身生命周期内缓存构造出的实例。注册中心未命中时直接返回
//! [`AdaptError::DumperNotFound`] / [`AdaptError::LoaderNotFound`]，不做任何字符串化兜底。

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::context::AdaptContext;
use crate::dumper::{Dumper, SourceType};
use crate::error::{AdaptError, Result};
use crate::format::Format;
use crate::loader::{LoadedValue, Loader, downcast_loaded};
use crate::oid::Oid;

/// 编解码实例缓存。
///
/// # 教案式说明
/// - **意图 (Why)**：同一次查询中同类型的值会反复出现，缓存实例可避免重复查表与重复构造；
/// - **契约 (What)**：
///   - 缓存键与注册中心一致，分别为 `(源类型, 格式)` 与 `(OID, 格式)`；
///   - 缓存只反映首次解析时的注册状态，之后的注册不会影响已缓存实例；
/// - **风险 (Trade-offs)**：实例以 `Arc` 共享，便于数组编解码器在元素间复用同一实例。
pub struct Transformer {
    ctx: AdaptContext,
    dumpers: HashMap<(SourceType, Format), Arc<dyn Dumper>>,
    loaders: HashMap<(Oid, Format), Arc<dyn Loader>>,
}

impl Transformer {
    /// 以给定上下文创建空缓存。
    pub fn new(ctx: AdaptContext) -> Self {
        Self {
            ctx,
            dumpers: HashMap::new(),
            loaders: HashMap::new(),
        }
    }

    /// 绑定的上下文。
    pub fn context(&self) -> &AdaptContext {
        &self.ctx
    }

    /// 按静态源类型解析 Dumper。
    pub fn dumper_for_type(&mut self, source: SourceType, format: Format) -> Result<Arc<dyn Dumper>> {
        if let Some(dumper) = self.dumpers.get(&(source, format)) {
            return Ok(Arc::clone(dumper));
        }
        let (registered, factory) = self
            .ctx
            .adapters()
            .lookup_dumper_entry(source, format)
            .ok_or(AdaptError::DumperNotFound {
                type_name: source.name(),
                format,
            })?;
        let dumper: Arc<dyn Dumper> = Arc::from(factory.build(registered, &self.ctx));
        self.dumpers.insert((registered, format), Arc::clone(&dumper));
        Ok(dumper)
    }

    /// 按值的运行时类型解析 Dumper。
    pub fn get_dumper(&mut self, value: &dyn Any, format: Format) -> Result<Arc<dyn Dumper>> {
        self.dumper_for_type(SourceType::of_value(value), format)
    }

    /// 按 OID 解析 Loader。
    pub fn get_loader(&mut self, oid: Oid, format: Format) -> Result<Arc<dyn Loader>> {
        if let Some(loader) = self.loaders.get(&(oid, format)) {
            return Ok(Arc::clone(loader));
        }
        let factory = self
            .ctx
            .adapters()
            .lookup_loader(oid, format)
            .ok_or(AdaptError::LoaderNotFound { oid, format })?;
        let loader: Arc<dyn Loader> = Arc::from(factory.build(oid, &self.ctx));
        self.loaders.insert((oid, format), Arc::clone(&loader));
        Ok(loader)
    }

    /// 编码一个静态类型已知的值。
    pub fn dump<T: Any>(&mut self, value: &T, format: Format) -> Result<Bytes> {
        self.dumper_for_type(SourceType::of::<T>(), format)?.dump(value)
    }

    /// 解码为类型擦除值。
    pub fn load(&mut self, oid: Oid, format: Format, data: &Bytes) -> Result<LoadedValue> {
        self.get_loader(oid, format)?.load(data)
    }

    /// 解码并还原为 `T`。
    pub fn load_as<T: Any>(&mut self, oid: Oid, format: Format, data: &[u8]) -> Result<T> {
        let loader = self.get_loader(oid, format)?;
        let value = loader.cload(data)?;
        downcast_loaded(loader.name(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dumper::{BuildDumper, DumperBase, DumperFactory, downcast_source};
    use crate::registry::AdaptersMap;

    struct Decimal(DumperBase);

    impl Dumper for Decimal {
        fn base(&self) -> &DumperBase {
            &self.0
        }

        fn dump(&self, value: &dyn Any) -> Result<Bytes> {
            let value = downcast_source::<u16>(self.name(), value)?;
            Ok(Bytes::from(value.to_string()))
        }
    }

    impl BuildDumper for Decimal {
        fn build(source: SourceType, ctx: &AdaptContext) -> Self {
            Self(DumperBase::new(source, Format::Text, Oid::INT4, ctx))
        }
    }

    fn local_context() -> AdaptContext {
        let map = Arc::new(AdaptersMap::new());
        DumperFactory::of::<Decimal>().register_into(&map, SourceType::of::<u16>(), Format::Text);
        AdaptContext::new().with_registry(map)
    }

    #[test]
    fn dumper_instances_are_cached() {
        let mut tx = Transformer::new(local_context());
        let first = tx.get_dumper(&1u16, Format::Text).expect("u16 已注册");
        let second = tx.dumper_for_type(SourceType::of::<u16>(), Format::Text).expect("u16 已注册");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(tx.dump(&42u16, Format::Text).expect("编码应成功"), Bytes::from_static(b"42"));
    }

    #[test]
    fn lookup_miss_fails_loudly() {
        let mut tx = Transformer::new(local_context());
        let err = tx.dump(&1u16, Format::Binary).err().expect("二进制格式未注册");
        assert_eq!(err.code(), crate::error::codes::DUMPER_MISSING);

        let err = tx.get_loader(Oid::INT4, Format::Text).err().expect("未注册任何 Loader");
        assert_eq!(
            err,
            AdaptError::LoaderNotFound {
                oid: Oid::INT4,
                format: Format::Text,
            }
        );
    }
}
