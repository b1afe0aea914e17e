//! 优化目录
//!
//! # 设计背景（Why）
//! - 参考目录以可读性为先，热路径上存在多余的分配与 UTF-8 校验；
//! - 优化目录为同一批键提供等价实现，在参考目录之后安装即可整体遮蔽。
//!
//! # 契约说明（What）
//! - 覆盖的键与参考目录完全一致，编码结果在协议层面等价（浮点文本允许指数形式）；
//! - 只能在参考目录之后安装，反向顺序的结果不作保证。

use quill_core::{AdapterCatalogue, AdaptersMap};

pub mod numeric;
pub mod singletons;
pub mod text;

/// 优化目录。
#[derive(Clone, Copy, Debug, Default)]
pub struct OptimizedCatalogue;

impl AdapterCatalogue for OptimizedCatalogue {
    fn name(&self) -> &'static str {
        "optimized"
    }

    fn register_numeric_adapters(&self, map: &AdaptersMap) {
        numeric::register(map);
    }

    fn register_singletons_adapters(&self, map: &AdaptersMap) {
        singletons::register(map);
    }

    fn register_text_adapters(&self, map: &AdaptersMap) {
        text::register(map);
    }
}
