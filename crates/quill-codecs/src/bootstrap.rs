//! 引导注册入口。
//!
//! # 教案式说明
//! - **意图 (Why)**：进程启动时需要一个确定的入口把内置编解码器装入注册中心，随后所有查找都依赖这里的结果；
//! - **契约 (What)**：
//!   1. [`register_builtin_reference_adapters`] 安装参考目录、数组 Dumper 与数组 Loader；
//!   2. [`register_builtin_optimized_adapters`] 必须在第 1 步之后调用，覆盖参考目录的同名键，并按新的基础
//!      Loader 重新注册数组 Loader；
//!   3. 两个入口都只应调用一次；重复调用只会再次覆盖相同的键，结果不变。
//! - **风险 (Trade-offs)**：注册中心不为并发注册提供顺序保证，调用方应在单线程启动阶段完成注册，再开始查找。

use quill_core::{AdaptersMap, install_catalogue};

use crate::array::{register_all_arrays, register_list_dumpers};
use crate::optimized::OptimizedCatalogue;
use crate::reference::ReferenceCatalogue;

/// 向进程级注册中心安装参考目录。
pub fn register_builtin_reference_adapters() {
    register_builtin_reference_adapters_into(AdaptersMap::global());
}

/// 向指定注册中心安装参考目录。
pub fn register_builtin_reference_adapters_into(map: &AdaptersMap) {
    install_catalogue(&ReferenceCatalogue, map);
    register_list_dumpers(map);
    register_all_arrays(map);
}

/// 向进程级注册中心安装优化目录。
///
/// 只应调用一次，并且必须在 [`register_builtin_reference_adapters`] 之后调用。
pub fn register_builtin_optimized_adapters() {
    register_builtin_optimized_adapters_into(AdaptersMap::global());
}

/// 向指定注册中心安装优化目录，顺序要求同 [`register_builtin_optimized_adapters`]。
pub fn register_builtin_optimized_adapters_into(map: &AdaptersMap) {
    install_catalogue(&OptimizedCatalogue, map);
    register_all_arrays(map);
}
