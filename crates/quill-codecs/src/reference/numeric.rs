//! 参考实现：数值类型。
//!
//! 文本方向借助标准库的 `Display` 与 `FromStr`，二进制方向使用定宽大端字节。

use std::any::Any;
use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use quill_core::{
    AdaptContext, AdaptError, AdaptersMap, BuildDumper, BuildLoader, Dumper, DumperBase,
    DumperFactory, Format, LoadedValue, Loader, LoaderBase, LoaderFactory, Oid, Result,
    SourceType, downcast_source,
};

use crate::scalar::{PgFloat, PgInteger, parse_special_float, special_float_text};

/// 整数文本 Dumper。
pub struct IntTextDumper<T> {
    base: DumperBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgInteger> Dumper for IntTextDumper<T> {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let value = downcast_source::<T>(self.name(), value)?;
        Ok(Bytes::from(value.to_string()))
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
        let value = downcast_source::<T>(self.name(), value)?;
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

/// 整数文本 Loader。
pub struct IntTextLoader<T> {
    base: LoaderBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgInteger> Loader for IntTextLoader<T> {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        std::str::from_utf8(data)
            .ok()
            .and_then(|text| text.parse::<T>().ok())
            .map(|value| Box::new(value) as LoadedValue)
            .ok_or_else(|| {
                AdaptError::data(format!(
                    "invalid {} text: {:?}",
                    T::OID,
                    String::from_utf8_lossy(data)
                ))
            })
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
        T::from_be_slice(data)
            .map(|value| Box::new(value) as LoadedValue)
            .ok_or_else(|| {
                AdaptError::data(format!(
                    "expected {} bytes for oid {}, got {}",
                    T::WIDTH,
                    T::OID,
                    data.len()
                ))
            })
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

/// 浮点文本 Dumper；非有限值输出 `NaN`、`Infinity`、`-Infinity`。
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
        Ok(match special_float_text(value) {
            Some(token) => Bytes::from_static(token),
            None => Bytes::from(value.to_string()),
        })
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

/// 浮点文本 Loader。
pub struct FloatTextLoader<T> {
    base: LoaderBase,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgFloat> Loader for FloatTextLoader<T> {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        parse_special_float::<T>(data)
            .or_else(|| {
                std::str::from_utf8(data)
                    .ok()
                    .and_then(|text| text.parse::<T>().ok())
            })
            .map(|value| Box::new(value) as LoadedValue)
            .ok_or_else(|| {
                AdaptError::data(format!(
                    "invalid {} text: {:?}",
                    T::OID,
                    String::from_utf8_lossy(data)
                ))
            })
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
        T::from_be_slice(data)
            .map(|value| Box::new(value) as LoadedValue)
            .ok_or_else(|| {
                AdaptError::data(format!(
                    "expected {} bytes for oid {}, got {}",
                    size_of::<T>(),
                    T::OID,
                    data.len()
                ))
            })
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

fn register_integer<T: PgInteger>(map: &AdaptersMap, with_dumpers: bool) {
    if with_dumpers {
        let source = SourceType::of::<T>();
        DumperFactory::of::<IntTextDumper<T>>().register_into(map, source, Format::Text);
        DumperFactory::of::<IntBinaryDumper<T>>().register_into(map, source, Format::Binary);
    }
    LoaderFactory::of::<IntTextLoader<T>>().register_into(map, T::OID, Format::Text);
    LoaderFactory::of::<IntBinaryLoader<T>>().register_into(map, T::OID, Format::Binary);
}

fn register_float<T: PgFloat>(map: &AdaptersMap) {
    let source = SourceType::of::<T>();
    DumperFactory::of::<FloatTextDumper<T>>().register_into(map, source, Format::Text);
    DumperFactory::of::<FloatBinaryDumper<T>>().register_into(map, source, Format::Binary);
    LoaderFactory::of::<FloatTextLoader<T>>().register_into(map, T::OID, Format::Text);
    LoaderFactory::of::<FloatBinaryLoader<T>>().register_into(map, T::OID, Format::Binary);
}

/// 安装数值分组。
///
/// `u32` 只注册 `oid` 类型的 Loader：应用侧的 `u32` 没有唯一对应的线上类型。
pub fn register(map: &AdaptersMap) {
    register_integer::<i16>(map, true);
    register_integer::<i32>(map, true);
    register_integer::<i64>(map, true);
    register_integer::<u32>(map, false);
    register_float::<f32>(map);
    register_float::<f64>(map);
}
