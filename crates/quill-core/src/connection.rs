//! # connection 模块说明
//!
//! ## 角色定位（Why）
//! - 连接由上层驱动拥有，适配层只需要其中四项能力：判活、查询服务端版本、按连接设置转义、读取错误文本；
//! - 以 trait 描述这些能力，使核心不依赖具体的 libpq 绑定或纯 Rust 协议实现。
//!
//! ## 生命周期约束（What）
//! - 调用方以 `Arc<dyn Connection>` 持有连接；适配层的上下文、Dumper、Loader 只保存 `Weak`；
//! - 连接被释放后，`Weak::upgrade` 失败即视为已关闭，依赖连接的路径返回
//!   [`AdaptError::ConnectionClosed`](crate::AdaptError::ConnectionClosed) 而不会访问失效状态。

use std::sync::Weak;

/// 连接转义例程失败的标记；具体原因通过 [`Connection::error_message`] 读取。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EscapeFailure;

/// 适配层所需的连接能力集合。
///
/// # 教案式说明
/// - **意图 (Why)**：字面量转义需要考虑客户端编码与 `standard_conforming_strings` 等连接级设置，
///   这些信息只有连接本身知道；
/// - **契约 (What)**：
///   - [`transport_open`](Connection::transport_open) 对应底层传输句柄是否非空；
///   - [`server_version`](Connection::server_version) 使用 `MMmmpp` 整数形式，例如 `100005` 表示 10.5；
///   - [`escape_string_conn`](Connection::escape_string_conn) 要求 `dst.len() >= 2 * src.len() + 1`，
///     写入转义结果并在末尾追加一个 NUL 终止符，返回不含终止符的写入字节数；
/// - **风险 (Trade-offs)**：转义例程只是本地字符串变换，可能因连接内部锁而短暂阻塞，但不会产生网络往返。
pub trait Connection: Send + Sync {
    /// 底层传输句柄是否仍然有效。
    fn transport_open(&self) -> bool;

    /// 服务端版本号。
    fn server_version(&self) -> i32;

    /// 按连接设置转义 `src`，结果写入 `dst`。
    fn escape_string_conn(&self, dst: &mut [u8], src: &[u8]) -> Result<usize, EscapeFailure>;

    /// 最近一次失败的错误文本。
    fn error_message(&self) -> String;
}

/// 非拥有型连接引用。
pub type ConnectionRef = Weak<dyn Connection>;
