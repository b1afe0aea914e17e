//! # quill-core
//!
//! ## 设计背景（Why）
//! - 数据库客户端需要在应用值与协议字节之间双向转换：出站方向由 Dumper 完成，入站方向由 Loader 完成；
//! - 同一类型可能有文本与二进制两种表示，也可能同时存在参考实现与优化实现，
//!   因此需要一个按 `(键, 格式)` 索引、支持覆盖的注册中心；
//! - 直接把值嵌入查询文本时，必须依据连接设置生成安全的 SQL 字面量，且不能与服务端往返。
//!
//! ## 模块地图（How）
//! - [`format`]、[`oid`]：与协议共享的格式码与类型标识；
//! - [`dumper`]、[`loader`]：编解码 trait、共享状态与构造器；
//! - [`registry`]：进程级与上下文级注册中心；
//! - [`context`]、[`connection`]：能力包与连接协作者接口；
//! - [`quote`]、[`escape`]：字面量引用与独立转义；
//! - [`transform`]：单次操作内的实例缓存；
//! - [`bootstrap`]：目录的批量安装入口；
//! - [`config`]、[`error`]：配置与错误域。
//!
//! ## 契约说明（What）
//! - 核心本身不包含任何具体类型的编解码实现，目录由 `quill-codecs` 等外部 crate 提供；
//! - 所有操作同步完成，错误直接返回给调用方，不重试。
#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod context;
pub mod dumper;
pub mod error;
pub mod escape;
pub mod format;
pub mod loader;
pub mod oid;
pub mod quote;
pub mod registry;
pub mod transform;

pub use bootstrap::{AdapterCatalogue, CatalogueGroup, GROUP_ORDER, install_catalogue};
pub use config::{AdaptConfig, ConfigError, EscapeConfig, LegacyConfig};
pub use connection::{Connection, ConnectionRef, EscapeFailure};
pub use context::{AdaptContext, RegistryHandle};
pub use dumper::{BuildDumper, Dumper, DumperBase, DumperFactory, SourceType, downcast_source};
pub use error::{AdaptError, Result, codes};
pub use format::Format;
pub use loader::{BuildLoader, LoadedValue, Loader, LoaderBase, LoaderFactory, downcast_loaded};
pub use oid::{Oid, TypeInfo, builtins};
pub use quote::{quote_literal, quote_with};
pub use registry::AdaptersMap;
pub use transform::Transformer;
