//! # dumper 模块说明
//!
//! ## 角色定位（Why）
//! - Dumper 把一个已知类型的内存值转换为线上字节，是“值 → 协议”方向的编解码器；
//! - 注册中心保存的是 [`DumperFactory`]（构造器）而非实例：实例与上下文绑定，在查找时按需构造。
//!
//! ## 结构（How）
//! - [`DumperBase`] 承载所有具体 Dumper 共享的状态，并在构造时执行旧版本服务端的 OID 兼容规则；
//! - [`Dumper`] 是对象安全的 trait，`dump` 默认返回“未实现”，`quote` 默认走通用引用器；
//! - [`BuildDumper`] 让具体类型以静态方式声明构造逻辑，[`DumperFactory::of`] 将其擦除为注册中心可存放的构造器。

use std::any::{Any, TypeId, type_name};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::config::EscapeConfig;
use crate::connection::{Connection, ConnectionRef};
use crate::context::AdaptContext;
use crate::error::{AdaptError, Result};
use crate::format::Format;
use crate::oid::Oid;
use crate::quote;
use crate::registry::AdaptersMap;

/// 应用侧的源类型描述符。
///
/// 身份仅由 `TypeId` 决定，名称只用于诊断。
#[derive(Clone, Copy)]
pub struct SourceType {
    id: TypeId,
    name: &'static str,
}

impl SourceType {
    /// 描述静态类型 `T`。
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// 描述动态值的运行时类型；名称不可得，仅可用于查找。
    pub fn of_value(value: &dyn Any) -> Self {
        Self {
            id: value.type_id(),
            name: "<dyn Any>",
        }
    }

    /// 类型标识。
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 类型名称。
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for SourceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SourceType {}

impl Hash for SourceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 具体 Dumper 共享的状态。
///
/// # 教案式说明
/// - **意图 (Why)**：源类型、格式、OID、连接弱引用与转义规则是每个 Dumper 都需要的字段，集中存放可避免重复实现；
/// - **逻辑 (How)**：构造时若 OID 仍为“未指定”，且上下文绑定的连接报告的服务端版本低于
///   `legacy.unknown_oid_cutoff`（默认 `100000`），则强制改为 `text`；旧版本服务端对未指定类型的参数处理有误；
/// - **契约 (What)**：构造完成后 OID 不再改变，[`DumperBase`] 不提供任何修改方法；
/// - **风险 (Trade-offs)**：连接在构造时已释放则跳过兼容规则，后续 `quote` 会以“连接已关闭”失败。
#[derive(Clone)]
pub struct DumperBase {
    source: SourceType,
    format: Format,
    oid: Oid,
    connection: Option<ConnectionRef>,
    escape: EscapeConfig,
}

impl DumperBase {
    /// 构造共享状态并应用旧版本 OID 规则。
    pub fn new(source: SourceType, format: Format, oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            source,
            format,
            oid: resolve_oid(oid, ctx),
            connection: ctx.connection_ref().cloned(),
            escape: ctx.config().escape,
        }
    }

    /// 源类型。
    pub fn source(&self) -> SourceType {
        self.source
    }

    /// 输出格式。
    pub fn format(&self) -> Format {
        self.format
    }

    /// 线上类型标识。
    pub fn oid(&self) -> Oid {
        self.oid
    }

    /// 连接弱引用。
    pub fn connection_ref(&self) -> Option<&ConnectionRef> {
        self.connection.as_ref()
    }

    /// 尝试升级连接。
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection.as_ref().and_then(|weak| weak.upgrade())
    }

    /// 独立转义规则。
    pub fn escape_rules(&self) -> &EscapeConfig {
        &self.escape
    }
}

impl fmt::Debug for DumperBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DumperBase")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("oid", &self.oid)
            .field("bound", &self.connection.is_some())
            .finish()
    }
}

fn resolve_oid(oid: Oid, ctx: &AdaptContext) -> Oid {
    if !oid.is_unspecified() {
        return oid;
    }
    let Some(conn) = ctx.connection() else {
        return oid;
    };
    let version = conn.server_version();
    if version < ctx.config().legacy.unknown_oid_cutoff {
        trace!(server_version = version, "unspecified oid forced to text");
        Oid::TEXT
    } else {
        oid
    }
}

/// 值 → 线上字节的编解码器。
///
/// # 教案式说明
/// - **意图 (Why)**：以 trait 对象形式存放于缓存与数组编解码器中，不同源类型的实现共享统一入口；
/// - **逻辑 (How)**：
///   - [`dump`](Dumper::dump) 接收 `&dyn Any` 并由实现自行下转型，类型不符时返回 [`AdaptError::TypeMismatch`]；
///   - [`quote`](Dumper::quote) 默认先 `dump`，再交给 [`quote::quote_with`] 生成带引号的 SQL 字面量；
/// - **契约 (What)**：
///   - 未覆盖 `dump` 的实现调用时返回 [`AdaptError::NotImplemented`]；
///   - `quote` 的结果以单引号开头和结尾，内部按连接规则（或独立规则）转义；
///   - 具体实现可以覆盖 `quote`，例如布尔值输出 `true`/`false`；
/// - **风险 (Trade-offs)**：动态下转型有运行时开销，热路径可缓存实例（参见 `Transformer`）。
pub trait Dumper: Send + Sync {
    /// 共享状态。
    fn base(&self) -> &DumperBase;

    /// 诊断用名称，默认取实现类型名。
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// 线上类型标识。
    fn oid(&self) -> Oid {
        self.base().oid()
    }

    /// 输出格式。
    fn format(&self) -> Format {
        self.base().format()
    }

    /// 将值转换为线上字节。
    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let _ = value;
        Err(AdaptError::not_implemented(self.name(), "dump"))
    }

    /// 生成可直接嵌入查询文本的 SQL 字面量。
    fn quote(&self, value: &dyn Any) -> Result<Bytes> {
        let payload = self.dump(value)?;
        let base = self.base();
        quote::quote_with(base.connection_ref(), base.escape_rules(), &payload)
    }
}

/// 将动态值下转型为 `T`，失败时返回类型不匹配错误。
pub fn downcast_source<'a, T: Any>(codec: &'static str, value: &'a dyn Any) -> Result<&'a T> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| AdaptError::TypeMismatch {
            codec,
            expected: type_name::<T>(),
        })
}

/// 以静态方式声明构造逻辑的 Dumper。
pub trait BuildDumper: Dumper + Sized + 'static {
    /// 为指定源类型与上下文构造实例。
    fn build(source: SourceType, ctx: &AdaptContext) -> Self;
}

type BuildDumperFn = dyn Fn(SourceType, &AdaptContext) -> Box<dyn Dumper> + Send + Sync;

/// Dumper 构造器，注册中心中存放的值。
///
/// # 教案式说明
/// - **意图 (Why)**：实例与上下文绑定，注册中心只能保存“如何构造”，查找时再结合上下文生成实例；
/// - **逻辑 (How)**：内部为 `Arc<dyn Fn>`，克隆只增加引用计数；名称用于日志与测试断言；
/// - **契约 (What)**：同一构造器可注册到多个键下，[`DumperFactory::ptr_eq`] 判定两次查找是否得到同一构造器。
#[derive(Clone)]
pub struct DumperFactory {
    name: Cow<'static, str>,
    build: Arc<BuildDumperFn>,
}

impl DumperFactory {
    /// 以任意闭包创建构造器。
    pub fn new<F>(name: impl Into<Cow<'static, str>>, build: F) -> Self
    where
        F: Fn(SourceType, &AdaptContext) -> Box<dyn Dumper> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    /// 以实现了 [`BuildDumper`] 的类型创建构造器，名称取类型名。
    pub fn of<D: BuildDumper>() -> Self {
        Self {
            name: Cow::Borrowed(type_name::<D>()),
            build: Arc::new(build_boxed::<D>),
        }
    }

    /// 构造器名称。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 构造绑定上下文的实例。
    pub fn build(&self, source: SourceType, ctx: &AdaptContext) -> Box<dyn Dumper> {
        (self.build)(source, ctx)
    }

    /// 两个句柄是否指向同一构造器。
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.build, &other.build)
    }

    /// 注册到上下文的注册中心；未提供上下文时注册到进程级注册中心。
    pub fn register(&self, source: SourceType, ctx: Option<&AdaptContext>, format: Format) {
        self.register_into(AdaptersMap::target(ctx), source, format);
    }

    /// 注册到指定的注册中心。
    pub fn register_into(&self, map: &AdaptersMap, source: SourceType, format: Format) {
        map.register_dumper(source, self.clone(), format);
    }
}

fn build_boxed<D: BuildDumper>(source: SourceType, ctx: &AdaptContext) -> Box<dyn Dumper> {
    Box::new(D::build(source, ctx))
}

impl fmt::Debug for DumperFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DumperFactory").field(&self.name).finish()
    }
}
