//! 参考实现：布尔与 NULL。

use std::any::Any;

use bytes::Bytes;
use quill_core::{
    AdaptContext, AdaptError, AdaptersMap, BuildDumper, BuildLoader, Dumper, DumperBase,
    DumperFactory, Format, LoadedValue, Loader, LoaderBase, LoaderFactory, Oid, Result,
    SourceType, downcast_source,
};

use crate::value::Null;

/// 布尔文本 Dumper：编码为 `t`/`f`，引用为 `true`/`false`。
pub struct BoolTextDumper {
    base: DumperBase,
}

impl Dumper for BoolTextDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let value = *downcast_source::<bool>(self.name(), value)?;
        Ok(Bytes::from(if value { "t" } else { "f" }.to_owned()))
    }

    fn quote(&self, value: &dyn Any) -> Result<Bytes> {
        let value = *downcast_source::<bool>(self.name(), value)?;
        Ok(Bytes::from(value.to_string()))
    }
}

impl BuildDumper for BoolTextDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, Oid::BOOL, ctx),
        }
    }
}

/// 布尔二进制 Dumper：单字节 `0x01`/`0x00`。
pub struct BoolBinaryDumper {
    base: DumperBase,
}

impl Dumper for BoolBinaryDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let value = *downcast_source::<bool>(self.name(), value)?;
        Ok(Bytes::from(vec![u8::from(value)]))
    }
}

impl BuildDumper for BoolBinaryDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Binary, Oid::BOOL, ctx),
        }
    }
}

/// NULL 标记 Dumper：不支持编码，引用为 `NULL`。
pub struct NullDumper {
    base: DumperBase,
}

impl Dumper for NullDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn quote(&self, value: &dyn Any) -> Result<Bytes> {
        downcast_source::<Null>(self.name(), value)?;
        Ok(Bytes::from_static(b"NULL"))
    }
}

impl BuildDumper for NullDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, Oid::UNSPECIFIED, ctx),
        }
    }
}

/// 布尔文本 Loader，只接受服务端输出的 `t`/`f`。
pub struct BoolTextLoader {
    base: LoaderBase,
}

impl Loader for BoolTextLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        match data {
            b"t" => Ok(Box::new(true)),
            b"f" => Ok(Box::new(false)),
            _ => Err(AdaptError::data(format!(
                "invalid bool text: {:?}",
                String::from_utf8_lossy(data)
            ))),
        }
    }
}

impl BuildLoader for BoolTextLoader {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(oid, Format::Text, ctx),
        }
    }
}

/// 布尔二进制 Loader。
pub struct BoolBinaryLoader {
    base: LoaderBase,
}

impl Loader for BoolBinaryLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        match data {
            [byte] => Ok(Box::new(*byte != 0)),
            _ => Err(AdaptError::data(format!(
                "expected 1 byte for bool, got {}",
                data.len()
            ))),
        }
    }
}

impl BuildLoader for BoolBinaryLoader {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(oid, Format::Binary, ctx),
        }
    }
}

/// 安装单例分组。
pub fn register(map: &AdaptersMap) {
    let boolean = SourceType::of::<bool>();
    DumperFactory::of::<BoolTextDumper>().register_into(map, boolean, Format::Text);
    DumperFactory::of::<BoolBinaryDumper>().register_into(map, boolean, Format::Binary);
    DumperFactory::of::<NullDumper>().register_into(map, SourceType::of::<Null>(), Format::Text);
    LoaderFactory::of::<BoolTextLoader>().register_into(map, Oid::BOOL, Format::Text);
    LoaderFactory::of::<BoolBinaryLoader>().register_into(map, Oid::BOOL, Format::Binary);
}
