//! # config 模块说明
//!
//! ## 角色定位（Why）
//! - 独立转义例程不了解服务端的 `standard_conforming_strings` 设置，需要由宿主显式声明规则；
//! - 旧版本服务端的“未指定 OID”兼容策略以版本阈值表达，集中在配置中便于测试与审计。
//!
//! ## 使用方式（How）
//! - 默认值即保守策略，可直接 [`AdaptConfig::default`]；
//! - 宿主也可以用 TOML 片段描述配置，再通过 [`AdaptConfig::from_toml_str`] 解析：
//!
//! ```toml
//! [escape]
//! standard_conforming_strings = true
//!
//! [legacy]
//! unknown_oid_cutoff = 100000
//! ```

use serde::Deserialize;
use thiserror::Error;

/// 服务端版本阈值：低于该版本时，未指定的参数类型会被强制为 `text`。
pub const DEFAULT_UNKNOWN_OID_CUTOFF: i32 = 100_000;

/// 适配层配置根节点。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaptConfig {
    /// 独立转义例程的规则。
    pub escape: EscapeConfig,
    /// 旧版本服务端兼容策略。
    pub legacy: LegacyConfig,
}

/// 独立转义规则。
///
/// # 教案式说明
/// - **意图 (Why)**：未绑定连接时只能按默认规则转义，`standard_conforming_strings` 决定反斜杠是否需要加倍；
/// - **契约 (What)**：默认 `false`，即同时加倍单引号与反斜杠，与 libpq 在未知服务端设置时的保守行为一致；
/// - **风险 (Trade-offs)**：若服务端实际开启了标准字符串，加倍的反斜杠会原样保留为两个字符，
///   因此拥有连接时应始终优先使用连接提供的转义例程。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscapeConfig {
    /// 服务端是否把反斜杠视为普通字符。
    pub standard_conforming_strings: bool,
}

/// 旧版本服务端兼容策略。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacyConfig {
    /// 版本号严格小于该值时启用 `text` 兜底。
    pub unknown_oid_cutoff: i32,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            unknown_oid_cutoff: DEFAULT_UNKNOWN_OID_CUTOFF,
        }
    }
}

/// 配置解析错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 文本不合法或包含未知字段。
    #[error("invalid adapt configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl AdaptConfig {
    /// 从 TOML 文本解析配置，缺省字段取默认值。
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}
