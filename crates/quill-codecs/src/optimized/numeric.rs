//! 优化实现：数值类型。
//!
//! - 文本编码使用栈上缓冲的 `itoa`/`ryu` 格式化，只在生成 `Bytes` 时拷贝一次；
//! - 文本解码在字节层面逐位累加，不经过 UTF-8 校验与 `str::parse`；
//! - 二进制方向直接读取定宽切片。

use std::any::Any;
use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use quill_core::{
    AdaptContext, AdaptError, AdaptersMap, BuildDumper, BuildLoader, Dumper, DumperBase,
    DumperFactory, Format, LoadedValue, Loader, LoaderBase, LoaderFactory, Oid, Result,
    SourceType, downcast_source,
};

use crate::scalar::{PgFloat, PgInteger, parse_special_float, special_float_text};

/// 字节级十进制整数解析，允许一个前导符号，溢出或非法字符返回 `None`。
fn parse_decimal<T: PgInteger>(data: &[u8]) -> Option<T> {
    let (negative, digits) = match data {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        _ => (false, data),
    };
    if digits.is_empty() {
        return None;
    }
    // 负数按负方向累加，`i64::MIN` 才不会溢出。
    let mut acc: i64 = 0;
    for &byte in digits {
        let digit = i64::from(byte.checked_sub(b'0').filter(|d| *d < 10)?);
        acc = acc.checked_mul(10)?;
        acc = if negative {
            acc.checked_sub(digit)?
        } else {
            acc.checked_add(digit)?
        };
    }
    T::from_i64(acc)
}

/// 整数文本 Dumper（`itoa`）。
pub struct IntTextDumper<T> {
    base: DumperBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgInteger> Dumper for IntTextDumper<T> {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let value = *downcast_source::<T>(self.name(), value)?;
        let mut digits = itoa::Buffer::new();
        Ok(Bytes::copy_from_slice(digits.format(value).as_bytes()))
    }
}

impl<T: PgInteger> BuildDumper for IntTextDumper<T> {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, T::OID, ctx),
            _marker: PhantomData,
        }
    }
}

/// 整数二进制 Dumper。
pub struct IntBinaryDumper<T> {
    base: DumperBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgInteger> Dumper for IntBinaryDumper<T> {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let value = *downcast_source::<T>(self.name(), value)?;
        let mut buf = BytesMut::with_capacity(T::WIDTH);
        value.put_be(&mut buf);
        Ok(buf.freeze())
    }
}

impl<T: PgInteger> BuildDumper for IntBinaryDumper<T> {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Binary, T::OID, ctx),
            _marker: PhantomData,
        }
    }
}

/// 整数文本 Loader（字节级解析）。
pub struct IntTextLoader<T> {
    base: LoaderBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgInteger> Loader for IntTextLoader<T> {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        match parse_decimal::<T>(data) {
            Some(value) => Ok(Box::new(value)),
            None => Err(AdaptError::data(format!(
                "invalid {} text: {:?}",
                T::OID,
                String::from_utf8_lossy(data)
            ))),
        }
    }
}

impl<T: PgInteger> BuildLoader for IntTextLoader<T> {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(oid, Format::Text, ctx),
            _marker: PhantomData,
        }
    }
}

/// 整数二进制 Loader。
pub struct IntBinaryLoader<T> {
    base: LoaderBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgInteger> Loader for IntBinaryLoader<T> {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        match T::from_be_slice(data) {
            Some(value) => Ok(Box::new(value)),
            None => Err(AdaptError::data(format!(
                "expected {} bytes for oid {}, got {}",
                T::WIDTH,
                T::OID,
                data.len()
            ))),
        }
    }
}

impl<T: PgInteger> BuildLoader for IntBinaryLoader<T> {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(oid, Format::Binary, ctx),
            _marker: PhantomData,
        }
    }
}

/// 浮点文本 Dumper（`ryu`）。
pub struct FloatTextDumper<T> {
    base: DumperBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgFloat> Dumper for FloatTextDumper<T> {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let value = *downcast_source::<T>(self.name(), value)?;
        if let Some(token) = special_float_text(value) {
            return Ok(Bytes::from_static(token));
        }
        let mut digits = ryu::Buffer::new();
        Ok(Bytes::copy_from_slice(digits.format_finite(value).as_bytes()))
    }
}

impl<T: PgFloat> BuildDumper for FloatTextDumper<T> {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, T::OID, ctx),
            _marker: PhantomData,
        }
    }
}

/// 浮点二进制 Dumper。
pub struct FloatBinaryDumper<T> {
    base: DumperBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgFloat> Dumper for FloatBinaryDumper<T> {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let value = *downcast_source::<T>(self.name(), value)?;
        let mut buf = BytesMut::with_capacity(size_of::<T>());
        value.put_be(&mut buf);
        Ok(buf.freeze())
    }
}

impl<T: PgFloat> BuildDumper for FloatBinaryDumper<T> {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Binary, T::OID, ctx),
            _marker: PhantomData,
        }
    }
}

/// 浮点文本 Loader；特殊值在字节层面识别。
pub struct FloatTextLoader<T> {
    base: LoaderBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgFloat> Loader for FloatTextLoader<T> {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        if let Some(value) = parse_special_float::<T>(data) {
            return Ok(Box::new(value));
        }
        let parsed = std::str::from_utf8(data)
            .ok()
            .and_then(|text| text.parse::<T>().ok());
        match parsed {
            Some(value) => Ok(Box::new(value)),
            None => Err(AdaptError::data(format!(
                "invalid {} text: {:?}",
                T::OID,
                String::from_utf8_lossy(data)
            ))),
        }
    }
}

impl<T: PgFloat> BuildLoader for FloatTextLoader<T> {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(oid, Format::Text, ctx),
            _marker: PhantomData,
        }
    }
}

/// 浮点二进制 Loader。
pub struct FloatBinaryLoader<T> {
    base: LoaderBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgFloat> Loader for FloatBinaryLoader<T> {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        match T::from_be_slice(data) {
            Some(value) => Ok(Box::new(value)),
            None => Err(AdaptError::data(format!(
                "expected {} bytes for oid {}, got {}",
                size_of::<T>(),
                T::OID,
                data.len()
            ))),
        }
    }
}

impl<T: PgFloat> BuildLoader for FloatBinaryLoader<T> {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(oid, Format::Binary, ctx),
            _marker: PhantomData,
        }
    }
}

macro_rules! register_numeric {
    ($map:expr; ints: $($int:ty),*; loaders: $($load:ty),*; floats: $($float:ty),*) => {{
        $(
            DumperFactory::of::<IntTextDumper<$int>>().register_into($map, SourceType::of::<$int>(), Format::Text);
            DumperFactory::of::<IntBinaryDumper<$int>>().register_into($map, SourceType::of::<$int>(), Format::Binary);
        )*
        $(
            LoaderFactory::of::<IntTextLoader<$load>>().register_into($map, <$load as PgInteger>::OID, Format::Text);
            LoaderFactory::of::<IntBinaryLoader<$load>>().register_into($map, <$load as PgInteger>::OID, Format::Binary);
        )*
        $(
            DumperFactory::of::<FloatTextDumper<$float>>().register_into($map, SourceType::of::<$float>(), Format::Text);
            DumperFactory::of::<FloatBinaryDumper<$float>>().register_into($map, SourceType::of::<$float>(), Format::Binary);
            LoaderFactory::of::<FloatTextLoader<$float>>().register_into($map, <$float as PgFloat>::OID, Format::Text);
            LoaderFactory::of::<FloatBinaryLoader<$float>>().register_into($map, <$float as PgFloat>::OID, Format::Binary);
        )*
    }};
}

/// 安装数值分组，覆盖参考实现的全部键。
pub fn register(map: &AdaptersMap) {
    register_numeric!(map; ints: i16, i32, i64; loaders: i16, i32, i64, u32; floats: f32, f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decimal_covers_boundaries() {
        assert_eq!(parse_decimal::<i64>(b"-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_decimal::<i64>(b"9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_decimal::<i64>(b"9223372036854775808"), None);
        assert_eq!(parse_decimal::<i16>(b"+12"), Some(12));
        assert_eq!(parse_decimal::<u32>(b"4294967295"), Some(u32::MAX));
        assert_eq!(parse_decimal::<u32>(b"-1"), None);
    }

    #[test]
    fn parse_decimal_rejects_garbage() {
        assert_eq!(parse_decimal::<i32>(b""), None);
        assert_eq!(parse_decimal::<i32>(b"-"), None);
        assert_eq!(parse_decimal::<i32>(b"1 2"), None);
        assert_eq!(parse_decimal::<i32>(b"0x10"), None);
    }

    #[test]
    fn ryu_output_is_shortest_roundtrip() {
        let ctx = AdaptContext::new();
        let dumper = FloatTextDumper::<f64>::build(SourceType::of::<f64>(), &ctx);
        assert_eq!(dumper.dump(&0.1f64).expect("编码应成功"), Bytes::from_static(b"0.1"));
        assert_eq!(dumper.dump(&f64::NAN).expect("编码应成功"), Bytes::from_static(b"NaN"));
    }
}
