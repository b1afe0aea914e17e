//! # quill-codecs
//!
//! ## 设计背景（Why）
//! - `quill-core` 只定义编解码协议与注册中心，具体类型的编解码器在此提供；
//! - 同一批键有两套实现：[`reference`] 以标准库格式化为基线，[`optimized`] 使用零分配格式化与字节级解析，
//!   在参考目录之后安装即可遮蔽前者。
//!
//! ## 模块地图（How）
//! - [`scalar`]：数值类型与线上类型的对应关系；
//! - [`reference`]、[`optimized`]：两套目录，各含数值、单例、文本三个分组；
//! - [`array`]：多维数组的文本与二进制编解码；
//! - [`bootstrap`]：进程启动时的注册入口；
//! - [`value`]：目录引入的应用侧值类型。
#![warn(missing_docs)]

pub mod array;
pub mod bootstrap;
pub mod optimized;
pub mod reference;
pub mod scalar;
pub mod value;

pub use array::{
    ArrayBinaryLoader, ArrayElement, ArrayTextLoader, ListBinaryDumper, ListTextDumper, PgArray,
    register_all_arrays, register_array, register_array_into, register_list_dumpers,
};
pub use bootstrap::{
    register_builtin_optimized_adapters, register_builtin_optimized_adapters_into,
    register_builtin_reference_adapters, register_builtin_reference_adapters_into,
};
pub use optimized::OptimizedCatalogue;
pub use reference::ReferenceCatalogue;
pub use scalar::{PgFloat, PgInteger};
pub use value::Null;
