//! # format 模块说明
//!
//! ## 角色定位（Why）
//! - PostgreSQL 扩展查询协议为每个参数与结果列携带一个 16 位格式码：`0` 表示文本、`1` 表示二进制；
//! - 注册中心按 `(键, 格式)` 二元组索引编解码器，因此格式必须与协议层共享同一组取值，避免两侧出现转换表。
//!
//! ## 契约说明（What）
//! - [`Format`] 只有两个取值，判别式与线上格式码逐位一致；
//! - 未知格式码在 [`Format::from_wire`] 中返回 `None`，由协议层决定如何上报。

use core::fmt;

/// 线上编码格式。
///
/// # 教案式说明
/// - **意图 (Why)**：区分同一类型的文本表示与二进制表示，使注册中心可以为两种格式分别挂载编解码器；
/// - **契约 (What)**：`#[repr(i16)]` 保证 `Format::Text as i16 == 0`、`Format::Binary as i16 == 1`，
///   与 Bind/RowDescription 消息中的格式码完全相同；
/// - **风险 (Trade-offs)**：协议未来若新增格式码，需要同步扩展本枚举与所有按格式匹配的分支。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i16)]
pub enum Format {
    /// 文本格式，协议格式码 `0`。
    #[default]
    Text = 0,
    /// 二进制格式，协议格式码 `1`。
    Binary = 1,
}

impl Format {
    /// 全部格式，按格式码升序排列。
    pub const ALL: [Format; 2] = [Format::Text, Format::Binary];

    /// 返回协议格式码。
    pub const fn as_wire(self) -> i16 {
        self as i16
    }

    /// 由协议格式码还原格式；未知码值返回 `None`。
    pub const fn from_wire(code: i16) -> Option<Self> {
        match code {
            0 => Some(Format::Text),
            1 => Some(Format::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Text => f.write_str("text"),
            Format::Binary => f.write_str("binary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_match_protocol() {
        assert_eq!(Format::Text.as_wire(), 0);
        assert_eq!(Format::Binary.as_wire(), 1);
        for format in Format::ALL {
            assert_eq!(Format::from_wire(format.as_wire()), Some(format));
        }
    }

    #[test]
    fn unknown_wire_code_is_rejected() {
        assert_eq!(Format::from_wire(2), None);
        assert_eq!(Format::from_wire(-1), None);
    }

    #[test]
    fn default_is_text() {
        assert_eq!(Format::default(), Format::Text);
        assert_eq!(Format::Binary.to_string(), "binary");
    }
}
