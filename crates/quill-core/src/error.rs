//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 适配层的所有失败都以同步方式返回给直接调用方，既不重试也不做部分恢复；
//! - 统一在此声明错误枚举与稳定错误码，便于驱动层把适配错误映射到自身的异常体系。
//!
//! ## 设计要求（What）
//! - [`AdaptError`] 派生 `thiserror::Error`，兼容 `std::error::Error`；
//! - 每个变体都对应 [`codes`] 中的一个 `<域>.<语义>` 错误码；
//! - 连接已关闭与转义失败两类错误同属“操作错误”，通过 [`AdaptError::is_operational`] 识别。

use thiserror::Error;

use crate::format::Format;
use crate::oid::Oid;

/// 适配层统一的 `Result` 别名。
pub type Result<T, E = AdaptError> = core::result::Result<T, E>;

/// 稳定错误码集合，命名遵循 `<域>.<语义>`。
pub mod codes {
    /// 基础编解码方法未被具体实现覆盖。
    pub const NOT_IMPLEMENTED: &str = "adapt.not_implemented";
    /// 绑定的连接已经关闭。
    pub const CONNECTION_CLOSED: &str = "adapt.operational.connection_closed";
    /// 连接提供的转义例程报告失败。
    pub const ESCAPE_FAILED: &str = "adapt.operational.escape_failed";
    /// 传入值的类型与编解码器期望不符。
    pub const TYPE_MISMATCH: &str = "adapt.type_mismatch";
    /// 值或线上数据不合法。
    pub const DATA: &str = "adapt.data";
    /// 注册中心中缺少对应类型的 Dumper。
    pub const DUMPER_MISSING: &str = "adapt.lookup.dumper_missing";
    /// 注册中心中缺少对应 OID 的 Loader。
    pub const LOADER_MISSING: &str = "adapt.lookup.loader_missing";
}

/// 类型适配错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把编程错误（未实现）、连接状态错误（已关闭、转义失败）、数据错误与查找缺失
///   区分开，调用方据此决定是修复代码、重建连接还是拒绝输入；
/// - **契约 (What)**：
///   - 所有变体均为 `Send + Sync + 'static`，可跨线程传播；
///   - `codec` 字段为具体编解码器的类型名，`operation` 为被调用的方法名；
///   - 查找缺失只由 `Transformer` 等便捷层产生，注册中心本身的查询返回 `Option`；
/// - **风险 (Trade-offs)**：消息使用 `String` 承载服务端返回的错误文本，牺牲少量分配换取完整诊断信息。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdaptError {
    /// 基础抽象的方法被直接调用，说明具体编解码器缺少实现。
    #[error("`{codec}` does not implement `{operation}`")]
    NotImplemented {
        /// 编解码器类型名。
        codec: &'static str,
        /// 被调用的方法名。
        operation: &'static str,
    },

    /// 绑定的连接已关闭或已被释放。
    #[error("the connection is closed")]
    ConnectionClosed,

    /// 连接的转义例程报告失败，附带服务端错误文本。
    #[error("escape_string failed: {message}")]
    EscapeFailed {
        /// 连接返回的错误信息。
        message: String,
    },

    /// 传入值的运行时类型不是编解码器能处理的类型。
    #[error("`{codec}` cannot adapt a value that is not `{expected}`")]
    TypeMismatch {
        /// 编解码器类型名。
        codec: &'static str,
        /// 期望的值类型名。
        expected: &'static str,
    },

    /// 值或线上数据不合法。
    #[error("{message}")]
    Data {
        /// 诊断信息。
        message: String,
    },

    /// 没有为该类型与格式注册 Dumper。
    #[error("cannot adapt type `{type_name}` to format {format}: no dumper registered")]
    DumperNotFound {
        /// 值类型名。
        type_name: &'static str,
        /// 请求的格式。
        format: Format,
    },

    /// 没有为该 OID 与格式注册 Loader。
    #[error("cannot load oid {oid} in format {format}: no loader registered")]
    LoaderNotFound {
        /// 线上类型标识。
        oid: Oid,
        /// 请求的格式。
        format: Format,
    },
}

impl AdaptError {
    /// 构造数据错误。
    pub fn data(message: impl Into<String>) -> Self {
        AdaptError::Data {
            message: message.into(),
        }
    }

    /// 构造“未实现”错误。
    pub fn not_implemented(codec: &'static str, operation: &'static str) -> Self {
        AdaptError::NotImplemented { codec, operation }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            AdaptError::NotImplemented { .. } => codes::NOT_IMPLEMENTED,
            AdaptError::ConnectionClosed => codes::CONNECTION_CLOSED,
            AdaptError::EscapeFailed { .. } => codes::ESCAPE_FAILED,
            AdaptError::TypeMismatch { .. } => codes::TYPE_MISMATCH,
            AdaptError::Data { .. } => codes::DATA,
            AdaptError::DumperNotFound { .. } => codes::DUMPER_MISSING,
            AdaptError::LoaderNotFound { .. } => codes::LOADER_MISSING,
        }
    }

    /// 是否属于“操作错误”（连接已关闭或转义失败）。
    ///
    /// 驱动层通常把这一类映射为 `OperationalError`，其余映射为编程错误或数据错误。
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            AdaptError::ConnectionClosed | AdaptError::EscapeFailed { .. }
        )
    }
}
