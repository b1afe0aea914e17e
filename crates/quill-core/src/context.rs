//! # context 模块说明
//!
//! ## 角色定位（Why）
//! - 每次查询或操作都需要一份“能力包”：可选的连接、要查询的注册中心、适配配置；
//! - 上下文只借用连接（`Weak`），不延长其生命周期，也不拥有进程级注册中心。
//!
//! ## 契约说明（What）
//! - 未绑定连接的上下文仍可执行注册中心查询，默认指向进程级注册中心；
//! - 绑定局部注册中心后，所有查找与注册只作用于该局部实例，不会自动回落到进程级实例；
//!   需要继承全局条目时，由上下文的创建者调用 [`AdaptContext::seeded_from_global`] 预先复制。

use std::fmt;
use std::sync::Arc;

use crate::config::AdaptConfig;
use crate::connection::{Connection, ConnectionRef};
use crate::registry::AdaptersMap;

/// 上下文所引用的注册中心。
#[derive(Clone, Default)]
pub enum RegistryHandle {
    /// 进程级注册中心。
    #[default]
    Global,
    /// 上下文私有的注册中心。
    Local(Arc<AdaptersMap>),
}

impl RegistryHandle {
    /// 解析为具体的注册中心引用。
    pub fn resolve(&self) -> &AdaptersMap {
        match self {
            RegistryHandle::Global => AdaptersMap::global(),
            RegistryHandle::Local(map) => map,
        }
    }
}

/// 适配上下文。
///
/// # 教案式说明
/// - **意图 (Why)**：Dumper、Loader 与引用器在构造和执行时都需要知道“连接是否存在、服务端版本是多少、
///   该去哪个注册中心查找”，把这些信息集中在一个可克隆的值里，避免层层传参；
/// - **逻辑 (How)**：连接以 `Weak<dyn Connection>` 保存，每次使用时临时升级；
///   注册中心以 [`RegistryHandle`] 表达“全局”或“局部”两种来源；
/// - **契约 (What)**：上下文没有独立的销毁流程，丢弃即可；连接关闭后上下文依旧可用于注册中心查询；
/// - **风险 (Trade-offs)**：克隆上下文共享同一个局部注册中心（`Arc`），向其中注册会影响所有克隆体。
#[derive(Clone, Default)]
pub struct AdaptContext {
    connection: Option<ConnectionRef>,
    registry: RegistryHandle,
    config: AdaptConfig,
}

impl AdaptContext {
    /// 创建不绑定连接、使用进程级注册中心与默认配置的上下文。
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建持有进程级注册中心快照的上下文。
    ///
    /// 快照与全局实例相互独立：此后向任意一方注册都不会影响另一方。
    pub fn seeded_from_global() -> Self {
        Self::new().with_registry(Arc::new(AdaptersMap::global().snapshot()))
    }

    /// 绑定连接，仅保存弱引用。
    pub fn with_connection(mut self, connection: &Arc<dyn Connection>) -> Self {
        self.connection = Some(Arc::downgrade(connection));
        self
    }

    /// 绑定上下文私有的注册中心。
    pub fn with_registry(mut self, registry: Arc<AdaptersMap>) -> Self {
        self.registry = RegistryHandle::Local(registry);
        self
    }

    /// 替换适配配置。
    pub fn with_config(mut self, config: AdaptConfig) -> Self {
        self.config = config;
        self
    }

    /// 当前生效的注册中心。
    pub fn adapters(&self) -> &AdaptersMap {
        self.registry.resolve()
    }

    /// 注册中心句柄。
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// 是否使用上下文私有的注册中心。
    pub fn has_local_registry(&self) -> bool {
        matches!(self.registry, RegistryHandle::Local(_))
    }

    /// 尝试升级连接；未绑定或已释放时返回 `None`。
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection.as_ref().and_then(|weak| weak.upgrade())
    }

    /// 连接的弱引用本身，供编解码器复制保存。
    pub fn connection_ref(&self) -> Option<&ConnectionRef> {
        self.connection.as_ref()
    }

    /// 适配配置。
    pub fn config(&self) -> &AdaptConfig {
        &self.config
    }
}

impl fmt::Debug for AdaptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connection = match &self.connection {
            None => "none",
            Some(weak) if weak.strong_count() == 0 => "dropped",
            Some(_) => "bound",
        };
        f.debug_struct("AdaptContext")
            .field("connection", &connection)
            .field("local_registry", &self.has_local_registry())
            .field("config", &self.config)
            .finish()
    }
}
