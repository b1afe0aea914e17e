//! 数值类型的协议描述。
//!
//! 参考目录与优化目录共享同一组数值类型到 OID、二进制宽度的映射，
//! 两者只在文本编解码的实现手法上不同。

use std::any::Any;
use std::fmt::{Debug, Display};
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use quill_core::Oid;

/// 可在协议中以定宽大端整数表示的类型。
///
/// # 契约说明（What）
/// - `OID` 为该类型对应的内置线上类型；
/// - `put_be` 追加恰好 `WIDTH` 个字节；`from_be_slice` 只接受长度恰为 `WIDTH` 的输入；
/// - `from_i64` 在超出取值范围时返回 `None`，供字节级解析器做溢出检查。
pub trait PgInteger:
    Any + Copy + Send + Sync + Debug + Display + FromStr + PartialEq + itoa::Integer
{
    /// 对应的线上类型。
    const OID: Oid;
    /// 二进制表示的字节数。
    const WIDTH: usize;

    /// 追加大端字节。
    fn put_be(self, buf: &mut BytesMut);

    /// 由大端字节还原。
    fn from_be_slice(data: &[u8]) -> Option<Self>;

    /// 由 `i64` 收窄。
    fn from_i64(value: i64) -> Option<Self>;
}

macro_rules! pg_integer {
    ($ty:ty, $oid:expr, $put:ident) => {
        impl PgInteger for $ty {
            const OID: Oid = $oid;
            const WIDTH: usize = size_of::<$ty>();

            fn put_be(self, buf: &mut BytesMut) {
                buf.$put(self);
            }

            fn from_be_slice(data: &[u8]) -> Option<Self> {
                data.try_into().ok().map(<$ty>::from_be_bytes)
            }

            fn from_i64(value: i64) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }
        }
    };
}

pg_integer!(i16, Oid::INT2, put_i16);
pg_integer!(i32, Oid::INT4, put_i32);
pg_integer!(i64, Oid::INT8, put_i64);
pg_integer!(u32, Oid::OID, put_u32);

/// 可在协议中以 IEEE 754 大端表示的浮点类型。
pub trait PgFloat:
    Any + Copy + Send + Sync + Debug + Display + FromStr + PartialEq + ryu::Float
{
    /// 对应的线上类型。
    const OID: Oid;

    /// 是否为 NaN。
    fn is_nan(self) -> bool;

    /// 是否为正负无穷。
    fn is_infinite(self) -> bool;

    /// 符号位是否为负。
    fn is_sign_negative(self) -> bool;

    /// 正无穷、负无穷与 NaN。
    fn specials() -> [Self; 3];

    /// 追加大端字节。
    fn put_be(self, buf: &mut BytesMut);

    /// 由大端字节还原。
    fn from_be_slice(data: &[u8]) -> Option<Self>;
}

macro_rules! pg_float {
    ($ty:ident, $oid:expr, $put:ident) => {
        impl PgFloat for $ty {
            const OID: Oid = $oid;

            fn is_nan(self) -> bool {
                $ty::is_nan(self)
            }

            fn is_infinite(self) -> bool {
                $ty::is_infinite(self)
            }

            fn is_sign_negative(self) -> bool {
                $ty::is_sign_negative(self)
            }

            fn specials() -> [Self; 3] {
                [$ty::INFINITY, $ty::NEG_INFINITY, $ty::NAN]
            }

            fn put_be(self, buf: &mut BytesMut) {
                buf.$put(self);
            }

            fn from_be_slice(data: &[u8]) -> Option<Self> {
                data.try_into().ok().map($ty::from_be_bytes)
            }
        }
    };
}

pg_float!(f32, Oid::FLOAT4, put_f32);
pg_float!(f64, Oid::FLOAT8, put_f64);

/// 非有限浮点数的文本表示；有限值返回 `None`。
pub(crate) fn special_float_text<T: PgFloat>(value: T) -> Option<&'static [u8]> {
    if value.is_nan() {
        Some(&b"NaN"[..])
    } else if value.is_infinite() && value.is_sign_negative() {
        Some(&b"-Infinity"[..])
    } else if value.is_infinite() {
        Some(&b"Infinity"[..])
    } else {
        None
    }
}

/// 识别服务端输出的非有限浮点数文本。
pub(crate) fn parse_special_float<T: PgFloat>(data: &[u8]) -> Option<T> {
    let [inf, neg_inf, nan] = T::specials();
    match data {
        b"NaN" => Some(nan),
        b"Infinity" => Some(inf),
        b"-Infinity" => Some(neg_inf),
        _ => None,
    }
}
