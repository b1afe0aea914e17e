//! # bootstrap 模块说明
//!
//! ## 角色定位（Why）
//! - 具体编解码目录（参考实现、优化实现）由外部 crate 提供，核心只规定它们的批量安装入口与安装顺序；
//! - 优化目录必须在参考目录之后安装，才能依靠覆盖式注册遮蔽对应条目。
//!
//! ## 契约说明（What）
//! - [`install_catalogue`] 按 数值 → 单例 → 文本 的固定顺序调用三个分组；
//! - 核心不强制只调用一次：重复安装会再次覆盖同一批键，结果不变；
//! - 先安装优化目录、再安装参考目录的结果由目录自身负责，核心不作保证。

use core::fmt;

use tracing::info;

use crate::registry::AdaptersMap;

/// 编解码目录的分组。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogueGroup {
    /// 整数、浮点等数值类型。
    Numeric,
    /// 布尔、空值等单例类型。
    Singletons,
    /// 字符串与字节串。
    Text,
}

impl CatalogueGroup {
    /// 日志中使用的分组名。
    pub const fn as_str(self) -> &'static str {
        match self {
            CatalogueGroup::Numeric => "numeric",
            CatalogueGroup::Singletons => "singletons",
            CatalogueGroup::Text => "text",
        }
    }
}

impl fmt::Display for CatalogueGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分组的安装顺序。
pub const GROUP_ORDER: [CatalogueGroup; 3] = [
    CatalogueGroup::Numeric,
    CatalogueGroup::Singletons,
    CatalogueGroup::Text,
];

/// 可批量安装到注册中心的编解码目录。
///
/// # 教案式说明
/// - **意图 (Why)**：参考目录与优化目录覆盖同一批键，以统一的三段式入口描述它们，安装顺序便可由核心集中控制；
/// - **契约 (What)**：每个方法只向给定的 `map` 注册，不读取进程级注册中心，便于在测试中使用隔离实例；
/// - **风险 (Trade-offs)**：分组粒度固定为三段，新增分组需要同步调整 [`GROUP_ORDER`]。
pub trait AdapterCatalogue {
    /// 目录名称。
    fn name(&self) -> &'static str;

    /// 安装数值类型编解码器。
    fn register_numeric_adapters(&self, map: &AdaptersMap);

    /// 安装单例类型编解码器。
    fn register_singletons_adapters(&self, map: &AdaptersMap);

    /// 安装文本类型编解码器。
    fn register_text_adapters(&self, map: &AdaptersMap);
}

/// 按固定顺序安装目录的三个分组。
pub fn install_catalogue(catalogue: &dyn AdapterCatalogue, map: &AdaptersMap) {
    for group in GROUP_ORDER {
        match group {
            CatalogueGroup::Numeric => catalogue.register_numeric_adapters(map),
            CatalogueGroup::Singletons => catalogue.register_singletons_adapters(map),
            CatalogueGroup::Text => catalogue.register_text_adapters(map),
        }
        info!(
            catalogue = catalogue.name(),
            %group,
            dumpers = map.dumper_count(),
            loaders = map.loader_count(),
            "adapter group installed"
        );
    }
}
