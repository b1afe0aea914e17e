//! # registry 模块说明
//!
//! ## 角色定位（Why）
//! - 注册中心维护两张互相独立的映射：`(源类型, 格式) → Dumper 构造器` 与 `(OID, 格式) → Loader 构造器`；
//! - 进程级实例在首次使用时创建、从不销毁；上下文可以持有私有实例，查找时只查询自己的实例。
//!
//! ## 契约说明（What）
//! - 注册是覆盖式的：同一键与格式的后一次注册替换前一次（优化目录覆盖参考目录依赖此语义）；
//! - 查找只做精确匹配，不沿类型层级搜索，未命中返回 `None`，由调用方决定是否视为错误；
//! - 并发查找是安全的；并发注册之间没有先后保证，调用方应在启动阶段串行完成注册。

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;
use tracing::debug;

use crate::context::AdaptContext;
use crate::dumper::{DumperFactory, SourceType};
use crate::format::Format;
use crate::loader::LoaderFactory;
use crate::oid::Oid;

static GLOBAL: OnceLock<AdaptersMap> = OnceLock::new();

/// 编解码构造器注册中心。
///
/// # 教案式说明
/// - **意图 (Why)**：把“哪个类型用哪个编解码器”的决策集中到一张可查询、可覆盖的表中，
///   使参考目录与优化目录可以按顺序叠加；
/// - **逻辑 (How)**：两张 `HashMap` 分别置于 `parking_lot::RwLock` 之后，查找取读锁并克隆构造器句柄（仅增加引用计数）；
/// - **契约 (What)**：
///   - [`AdaptersMap::global`] 返回进程级实例；
///   - [`AdaptersMap::snapshot`] 复制当前全部条目，得到互不影响的新实例；
/// - **风险 (Trade-offs)**：锁只保证内存安全，不提供注册顺序语义；竞争注册同一键时最终结果不确定。
pub struct AdaptersMap {
    dumpers: RwLock<HashMap<(SourceType, Format), DumperFactory>>,
    loaders: RwLock<HashMap<(Oid, Format), LoaderFactory>>,
}

impl AdaptersMap {
    /// 创建空的注册中心。
    pub fn new() -> Self {
        Self {
            dumpers: RwLock::new(HashMap::new()),
            loaders: RwLock::new(HashMap::new()),
        }
    }

    /// 进程级注册中心，首次访问时创建。
    pub fn global() -> &'static AdaptersMap {
        GLOBAL.get_or_init(AdaptersMap::new)
    }

    /// 选择注册目标：有上下文时取上下文的注册中心，否则取进程级实例。
    pub fn target(ctx: Option<&AdaptContext>) -> &AdaptersMap {
        match ctx {
            Some(ctx) => ctx.adapters(),
            None => AdaptersMap::global(),
        }
    }

    /// 注册 Dumper 构造器，覆盖同键旧条目。
    pub fn register_dumper(&self, source: SourceType, factory: DumperFactory, format: Format) {
        let name = factory.name().to_owned();
        let previous = self.dumpers.write().insert((source, format), factory);
        debug!(
            source = source.name(),
            %format,
            factory = %name,
            shadowed = previous.is_some(),
            "dumper registered"
        );
    }

    /// 注册 Loader 构造器，覆盖同键旧条目。
    pub fn register_loader(&self, oid: Oid, factory: LoaderFactory, format: Format) {
        let name = factory.name().to_owned();
        let previous = self.loaders.write().insert((oid, format), factory);
        debug!(
            oid = oid.get(),
            %format,
            factory = %name,
            shadowed = previous.is_some(),
            "loader registered"
        );
    }

    /// 精确查找 Dumper 构造器。
    pub fn lookup_dumper(&self, source: SourceType, format: Format) -> Option<DumperFactory> {
        self.dumpers.read().get(&(source, format)).cloned()
    }

    /// 精确查找 Dumper 构造器，同时返回注册时记录的源类型描述符。
    ///
    /// 以 [`SourceType::of_value`] 查找时，可借此取回带名称的描述符。
    pub fn lookup_dumper_entry(
        &self,
        source: SourceType,
        format: Format,
    ) -> Option<(SourceType, DumperFactory)> {
        self.dumpers
            .read()
            .get_key_value(&(source, format))
            .map(|((registered, _), factory)| (*registered, factory.clone()))
    }

    /// 精确查找 Loader 构造器。
    pub fn lookup_loader(&self, oid: Oid, format: Format) -> Option<LoaderFactory> {
        self.loaders.read().get(&(oid, format)).cloned()
    }

    /// 是否存在对应的 Loader。
    pub fn has_loader(&self, oid: Oid, format: Format) -> bool {
        self.loaders.read().contains_key(&(oid, format))
    }

    /// 已注册的 Dumper 条目数。
    pub fn dumper_count(&self) -> usize {
        self.dumpers.read().len()
    }

    /// 已注册的 Loader 条目数。
    pub fn loader_count(&self) -> usize {
        self.loaders.read().len()
    }

    /// 复制当前全部条目，得到独立的新实例。
    pub fn snapshot(&self) -> AdaptersMap {
        Self {
            dumpers: RwLock::new(self.dumpers.read().clone()),
            loaders: RwLock::new(self.loaders.read().clone()),
        }
    }
}

impl Default for AdaptersMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for AdaptersMap {
    fn clone(&self) -> Self {
        self.snapshot()
    }
}

impl fmt::Debug for AdaptersMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptersMap")
            .field("dumpers", &self.dumper_count())
            .field("loaders", &self.loader_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dumper::{Dumper, DumperBase};
    use crate::loader::{Loader, LoaderBase};

    struct Probe(DumperBase);

    impl Dumper for Probe {
        fn base(&self) -> &DumperBase {
            &self.0
        }
    }

    struct Sink(LoaderBase);

    impl Loader for Sink {
        fn base(&self) -> &LoaderBase {
            &self.0
        }
    }

    fn dumper_factory(name: &'static str) -> DumperFactory {
        DumperFactory::new(name, |source, ctx| {
            Box::new(Probe(DumperBase::new(source, Format::Text, Oid::INT4, ctx)))
        })
    }

    fn loader_factory(name: &'static str) -> LoaderFactory {
        LoaderFactory::new(name, |oid, ctx| {
            Box::new(Sink(LoaderBase::new(oid, Format::Text, ctx)))
        })
    }

    #[test]
    fn later_registration_wins() {
        let map = AdaptersMap::new();
        let source = SourceType::of::<i32>();
        map.register_dumper(source, dumper_factory("first"), Format::Text);
        map.register_dumper(source, dumper_factory("second"), Format::Text);

        let found = map.lookup_dumper(source, Format::Text).expect("应命中第二次注册");
        assert_eq!(found.name(), "second");
        assert_eq!(map.dumper_count(), 1);
    }

    #[test]
    fn formats_are_independent_keys() {
        let map = AdaptersMap::new();
        map.register_loader(Oid::INT4, loader_factory("text"), Format::Text);
        assert!(map.has_loader(Oid::INT4, Format::Text));
        assert!(!map.has_loader(Oid::INT4, Format::Binary));
        assert!(map.lookup_loader(Oid::INT8, Format::Text).is_none());
    }

    #[test]
    fn entry_lookup_recovers_registered_name() {
        let map = AdaptersMap::new();
        map.register_dumper(SourceType::of::<i64>(), dumper_factory("i64"), Format::Binary);
        let value = 1i64;
        let (source, _) = map
            .lookup_dumper_entry(SourceType::of_value(&value), Format::Binary)
            .expect("按运行时类型应能命中");
        assert_eq!(source.name(), "i64");
    }

    #[test]
    fn snapshot_is_detached() {
        let map = AdaptersMap::new();
        map.register_loader(Oid::TEXT, loader_factory("text"), Format::Text);
        let copy = map.snapshot();
        copy.register_loader(Oid::BYTEA, loader_factory("bytea"), Format::Text);

        assert_eq!(map.loader_count(), 1);
        assert_eq!(copy.loader_count(), 2);
    }
}
