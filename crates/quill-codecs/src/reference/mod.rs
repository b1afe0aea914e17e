//! 参考目录：以标准库格式化与解析实现全部内置类型，作为行为基线。

use quill_core::{AdapterCatalogue, AdaptersMap};

pub mod numeric;
pub mod singletons;
pub mod text;

/// 参考目录。
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceCatalogue;

impl AdapterCatalogue for ReferenceCatalogue {
    fn name(&self) -> &'static str {
        "reference"
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
