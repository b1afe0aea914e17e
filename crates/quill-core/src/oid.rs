//! 线上类型标识（OID）与内置类型目录。
//!
//! 取值参考 PostgreSQL `src/include/catalog/pg_type.dat`；目录只覆盖适配层与内置编解码目录用到的类型，
//! 扩展类型的 OID 由外部目录在运行时自行登记。

use core::fmt;

/// PostgreSQL 线上类型标识。
///
/// # 教案式说明
/// - **意图 (Why)**：以新类型包装 `u32`，避免把格式码、长度等其他整数误当作类型标识传入注册中心；
/// - **契约 (What)**：[`Oid::UNSPECIFIED`]（`0`）表示“未指定”，服务端将根据上下文推断参数类型；
/// - **风险 (Trade-offs)**：常量仅覆盖内置类型，用户自定义类型请通过 [`Oid::new`] 构造。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(u32);

impl Oid {
    /// 未指定类型，交由服务端推断。
    pub const UNSPECIFIED: Oid = Oid(0);
    /// `bool`
    pub const BOOL: Oid = Oid(16);
    /// `bytea`
    pub const BYTEA: Oid = Oid(17);
    /// `"char"`
    pub const CHAR: Oid = Oid(18);
    /// `name`
    pub const NAME: Oid = Oid(19);
    /// `int8`
    pub const INT8: Oid = Oid(20);
    /// `int2`
    pub const INT2: Oid = Oid(21);
    /// `int4`
    pub const INT4: Oid = Oid(23);
    /// `text`
    pub const TEXT: Oid = Oid(25);
    /// `oid`
    pub const OID: Oid = Oid(26);
    /// `float4`
    pub const FLOAT4: Oid = Oid(700);
    /// `float8`
    pub const FLOAT8: Oid = Oid(701);
    /// `unknown`
    pub const UNKNOWN: Oid = Oid(705);
    /// `bpchar`
    pub const BPCHAR: Oid = Oid(1042);
    /// `varchar`
    pub const VARCHAR: Oid = Oid(1043);
    /// `numeric`
    pub const NUMERIC: Oid = Oid(1700);

    /// `bool[]`
    pub const BOOL_ARRAY: Oid = Oid(1000);
    /// `bytea[]`
    pub const BYTEA_ARRAY: Oid = Oid(1001);
    /// `"char"[]`
    pub const CHAR_ARRAY: Oid = Oid(1002);
    /// `name[]`
    pub const NAME_ARRAY: Oid = Oid(1003);
    /// `int2[]`
    pub const INT2_ARRAY: Oid = Oid(1005);
    /// `int4[]`
    pub const INT4_ARRAY: Oid = Oid(1007);
    /// `text[]`
    pub const TEXT_ARRAY: Oid = Oid(1009);
    /// `bpchar[]`
    pub const BPCHAR_ARRAY: Oid = Oid(1014);
    /// `varchar[]`
    pub const VARCHAR_ARRAY: Oid = Oid(1015);
    /// `int8[]`
    pub const INT8_ARRAY: Oid = Oid(1016);
    /// `float4[]`
    pub const FLOAT4_ARRAY: Oid = Oid(1021);
    /// `float8[]`
    pub const FLOAT8_ARRAY: Oid = Oid(1022);
    /// `oid[]`
    pub const OID_ARRAY: Oid = Oid(1028);
    /// `numeric[]`
    pub const NUMERIC_ARRAY: Oid = Oid(1231);

    /// 以原始数值构造类型标识。
    pub const fn new(raw: u32) -> Self {
        Oid(raw)
    }

    /// 返回原始数值。
    pub const fn get(self) -> u32 {
        self.0
    }

    /// 是否为“未指定”。
    pub const fn is_unspecified(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Oid {
    fn from(raw: u32) -> Self {
        Oid(raw)
    }
}

impl From<Oid> for u32 {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 内置类型的目录条目。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    /// 类型名称，与 `pg_type.typname` 一致。
    pub name: &'static str,
    /// 类型自身的 OID。
    pub oid: Oid,
    /// 对应数组类型的 OID；没有数组类型时为 [`Oid::UNSPECIFIED`]。
    pub array_oid: Oid,
}

/// 内置类型目录。
///
/// # 教案式说明
/// - **意图 (Why)**：数组编解码需要“元素类型 → 数组类型”的映射，批量注册数组加载器也需要遍历全部内置类型；
/// - **契约 (What)**：目录为只读静态表，查询按 OID 或名称线性扫描，条目数量很小，无需索引；
/// - **风险 (Trade-offs)**：只包含内置类型，其他适配上下文中登记的扩展类型不会出现在这里。
pub mod builtins {
    use super::{Oid, TypeInfo};

    const fn entry(name: &'static str, oid: Oid, array_oid: Oid) -> TypeInfo {
        TypeInfo {
            name,
            oid,
            array_oid,
        }
    }

    static TYPES: [TypeInfo; 15] = [
        entry("bool", Oid::BOOL, Oid::BOOL_ARRAY),
        entry("bytea", Oid::BYTEA, Oid::BYTEA_ARRAY),
        entry("char", Oid::CHAR, Oid::CHAR_ARRAY),
        entry("name", Oid::NAME, Oid::NAME_ARRAY),
        entry("int8", Oid::INT8, Oid::INT8_ARRAY),
        entry("int2", Oid::INT2, Oid::INT2_ARRAY),
        entry("int4", Oid::INT4, Oid::INT4_ARRAY),
        entry("text", Oid::TEXT, Oid::TEXT_ARRAY),
        entry("oid", Oid::OID, Oid::OID_ARRAY),
        entry("float4", Oid::FLOAT4, Oid::FLOAT4_ARRAY),
        entry("float8", Oid::FLOAT8, Oid::FLOAT8_ARRAY),
        entry("unknown", Oid::UNKNOWN, Oid::UNSPECIFIED),
        entry("bpchar", Oid::BPCHAR, Oid::BPCHAR_ARRAY),
        entry("varchar", Oid::VARCHAR, Oid::VARCHAR_ARRAY),
        entry("numeric", Oid::NUMERIC, Oid::NUMERIC_ARRAY),
    ];

    /// 遍历全部内置类型。
    pub fn iter() -> impl Iterator<Item = &'static TypeInfo> {
        TYPES.iter()
    }

    /// 按 OID 查询。
    pub fn by_oid(oid: Oid) -> Option<&'static TypeInfo> {
        TYPES.iter().find(|info| info.oid == oid)
    }

    /// 按名称查询。
    pub fn by_name(name: &str) -> Option<&'static TypeInfo> {
        TYPES.iter().find(|info| info.name == name)
    }

    /// 返回元素类型对应的数组类型；未知元素或无数组类型时返回 `None`。
    pub fn array_oid_of(base: Oid) -> Option<Oid> {
        if base.is_unspecified() {
            return None;
        }
        by_oid(base)
            .map(|info| info.array_oid)
            .filter(|oid| !oid.is_unspecified())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_by_oid_and_name() {
        let int4 = builtins::by_oid(Oid::INT4).expect("int4 应在内置目录中");
        assert_eq!(int4.name, "int4");
        assert_eq!(int4.array_oid, Oid::INT4_ARRAY);
        assert_eq!(builtins::by_name("text").map(|t| t.oid), Some(Oid::TEXT));
        assert!(builtins::by_oid(Oid::new(12345)).is_none());
    }

    #[test]
    fn array_oid_falls_back_to_none() {
        assert_eq!(builtins::array_oid_of(Oid::INT8), Some(Oid::INT8_ARRAY));
        assert_eq!(builtins::array_oid_of(Oid::UNSPECIFIED), None);
        assert_eq!(builtins::array_oid_of(Oid::UNKNOWN), None);
    }

    #[test]
    fn every_builtin_has_distinct_oid() {
        let mut seen: Vec<u32> = builtins::iter().map(|t| t.oid.get()).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), builtins::iter().count());
    }
}
