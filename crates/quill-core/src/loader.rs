//! # loader 模块说明
//!
//! ## 角色定位（Why）
//! - Loader 把带类型标识的线上字节还原为内存值，是“协议 → 值”方向的编解码器；
//! - 解码结果以 `Box<dyn Any + Send + Sync>` 返回，调用方按约定类型下转型。
//!
//! ## 零拷贝边界（How）
//! - [`Loader::cload`] 直接接收借用切片，生命周期受调用方输入约束，是实现者需要覆盖的原语；
//! - [`Loader::load`] 接收不可变的 [`Bytes`]，取其切片视图后转发给 `cload`，是跨边界暴露的唯一入口。

use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::connection::{Connection, ConnectionRef};
use crate::context::AdaptContext;
use crate::error::{AdaptError, Result};
use crate::format::Format;
use crate::oid::Oid;
use crate::registry::AdaptersMap;

/// 解码得到的类型擦除值。
pub type LoadedValue = Box<dyn Any + Send + Sync>;

/// 具体 Loader 共享的状态。
#[derive(Clone)]
pub struct LoaderBase {
    oid: Oid,
    format: Format,
    connection: Option<ConnectionRef>,
}

impl LoaderBase {
    /// 构造共享状态，保存连接弱引用。
    pub fn new(oid: Oid, format: Format, ctx: &AdaptContext) -> Self {
        Self {
            oid,
            format,
            connection: ctx.connection_ref().cloned(),
        }
    }

    /// 解码的线上类型标识。
    pub fn oid(&self) -> Oid {
        self.oid
    }

    /// 输入格式。
    pub fn format(&self) -> Format {
        self.format
    }

    /// 尝试升级连接。
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection.as_ref().and_then(|weak| weak.upgrade())
    }
}

impl fmt::Debug for LoaderBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderBase")
            .field("oid", &self.oid)
            .field("format", &self.format)
            .field("bound", &self.connection.is_some())
            .finish()
    }
}

/// 线上字节 → 值的编解码器。
///
/// # 契约说明（What）
/// - 未覆盖 [`cload`](Loader::cload) 的实现调用时返回 [`AdaptError::NotImplemented`]；
/// - 输入不合法时返回 [`AdaptError::Data`]，不做部分恢复；
/// - [`load`](Loader::load) 不复制输入，只是把 `Bytes` 借为切片。
pub trait Loader: Send + Sync {
    /// 共享状态。
    fn base(&self) -> &LoaderBase;

    /// 诊断用名称，默认取实现类型名。
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// 解码的线上类型标识。
    fn oid(&self) -> Oid {
        self.base().oid()
    }

    /// 输入格式。
    fn format(&self) -> Format {
        self.base().format()
    }

    /// 零拷贝解码原语。
    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        let _ = data;
        Err(AdaptError::not_implemented(self.name(), "cload"))
    }

    /// 解码不可变字节缓冲。
    fn load(&self, data: &Bytes) -> Result<LoadedValue> {
        self.cload(data.as_ref())
    }
}

/// 将解码结果还原为 `T`，失败时返回类型不匹配错误。
pub fn downcast_loaded<T: Any>(codec: &'static str, value: LoadedValue) -> Result<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| AdaptError::TypeMismatch {
            codec,
            expected: type_name::<T>(),
        })
}

/// 以静态方式声明构造逻辑的 Loader。
pub trait BuildLoader: Loader + Sized + 'static {
    /// 为指定 OID 与上下文构造实例。
    fn build(oid: Oid, ctx: &AdaptContext) -> Self;
}

type BuildLoaderFn = dyn Fn(Oid, &AdaptContext) -> Box<dyn Loader> + Send + Sync;

/// Loader 构造器，注册中心中存放的值。
#[derive(Clone)]
pub struct LoaderFactory {
    name: Cow<'static, str>,
    build: Arc<BuildLoaderFn>,
}

impl LoaderFactory {
    /// 以任意闭包创建构造器。
    pub fn new<F>(name: impl Into<Cow<'static, str>>, build: F) -> Self
    where
        F: Fn(Oid, &AdaptContext) -> Box<dyn Loader> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    /// 以实现了 [`BuildLoader`] 的类型创建构造器，名称取类型名。
    pub fn of<L: BuildLoader>() -> Self {
        Self {
            name: Cow::Borrowed(type_name::<L>()),
            build: Arc::new(build_boxed::<L>),
        }
    }

    /// 构造器名称。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 构造绑定上下文的实例。
    pub fn build(&self, oid: Oid, ctx: &AdaptContext) -> Box<dyn Loader> {
        (self.build)(oid, ctx)
    }

    /// 两个句柄是否指向同一构造器。
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.build, &other.build)
    }

    /// 注册到上下文的注册中心；未提供上下文时注册到进程级注册中心。
    pub fn register(&self, oid: Oid, ctx: Option<&AdaptContext>, format: Format) {
        self.register_into(AdaptersMap::target(ctx), oid, format);
    }

    /// 注册到指定的注册中心。
    pub fn register_into(&self, map: &AdaptersMap, oid: Oid, format: Format) {
        map.register_loader(oid, self.clone(), format);
    }
}

fn build_boxed<L: BuildLoader>(oid: Oid, ctx: &AdaptContext) -> Box<dyn Loader> {
    Box::new(L::build(oid, ctx))
}

impl fmt::Debug for LoaderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoaderFactory").field(&self.name).finish()
    }
}
