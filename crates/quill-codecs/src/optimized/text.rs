//! 优化实现：字符串与字节串。
//!
//! 与参考实现覆盖相同的键；十六进制编解码直接写入预分配缓冲，字符串编码只拷贝一次。

use std::any::Any;

use bytes::{BufMut, Bytes, BytesMut};
use quill_core::{
    AdaptContext, AdaptError, AdaptersMap, BuildDumper, BuildLoader, Dumper, DumperBase,
    DumperFactory, Format, LoadedValue, Loader, LoaderBase, LoaderFactory, Oid, Result,
    SourceType,
};

use crate::reference::text::{NUL_IN_TEXT, TEXT_OIDS, bytes_payload, string_payload, unescape_bytea};

fn checked_text(codec: &'static str, value: &dyn Any) -> Result<Bytes> {
    let text = string_payload(codec, value)?.as_bytes();
    if text.contains(&0) {
        return Err(AdaptError::data(NUL_IN_TEXT));
    }
    Ok(Bytes::copy_from_slice(text))
}

/// 字符串文本 Dumper。
pub struct StringTextDumper {
    base: DumperBase,
}

impl Dumper for StringTextDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        checked_text(self.name(), value)
    }
}

impl BuildDumper for StringTextDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, Oid::UNSPECIFIED, ctx),
        }
    }
}

/// 字符串二进制 Dumper。
pub struct StringBinaryDumper {
    base: DumperBase,
}

impl Dumper for StringBinaryDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        checked_text(self.name(), value)
    }
}

impl BuildDumper for StringBinaryDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Binary, Oid::TEXT, ctx),
        }
    }
}

/// 字节串文本 Dumper：一次分配 `2 + 2n` 字节，十六进制直接写入。
pub struct ByteaTextDumper {
    base: DumperBase,
}

impl Dumper for ByteaTextDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let data = bytes_payload(self.name(), value)?;
        let mut buf = BytesMut::with_capacity(2 + data.len() * 2);
        buf.put_slice(b"\\x");
        buf.resize(2 + data.len() * 2, 0);
        hex::encode_to_slice(data, &mut buf[2..])
            .map_err(|err| AdaptError::data(format!("bytea hex encoding failed: {err}")))?;
        Ok(buf.freeze())
    }
}

impl BuildDumper for ByteaTextDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, Oid::BYTEA, ctx),
        }
    }
}

/// 字节串二进制 Dumper。
pub struct ByteaBinaryDumper {
    base: DumperBase,
}

impl Dumper for ByteaBinaryDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        // `Bytes` 输入直接共享底层存储。
        if let Some(data) = value.downcast_ref::<Bytes>() {
            return Ok(data.clone());
        }
        Ok(Bytes::copy_from_slice(bytes_payload(self.name(), value)?))
    }
}

impl BuildDumper for ByteaBinaryDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Binary, Oid::BYTEA, ctx),
        }
    }
}

/// 文本 Loader：校验后直接接管拷贝出的缓冲。
pub struct TextLoader {
    base: LoaderBase,
}

impl Loader for TextLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        match String::from_utf8(data.to_vec()) {
            Ok(text) => Ok(Box::new(text)),
            Err(err) => Err(AdaptError::data(format!(
                "invalid utf-8 in text value: {}",
                err.utf8_error()
            ))),
        }
    }
}

/// 字节串文本 Loader：十六进制直接解码进预分配缓冲。
pub struct ByteaTextLoader {
    base: LoaderBase,
}

impl Loader for ByteaTextLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        let Some(digits) = data.strip_prefix(b"\\x") else {
            return Ok(Box::new(unescape_bytea(data)?));
        };
        if digits.len() % 2 != 0 {
            return Err(AdaptError::data("invalid bytea hex: odd number of digits"));
        }
        let mut out = vec![0u8; digits.len() / 2];
        hex::decode_to_slice(digits, &mut out)
            .map_err(|err| AdaptError::data(format!("invalid bytea hex: {err}")))?;
        Ok(Box::new(out))
    }
}

impl BuildLoader for ByteaTextLoader {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(oid, Format::Text, ctx),
        }
    }
}

/// 字节串二进制 Loader。
pub struct ByteaBinaryLoader {
    base: LoaderBase,
}

impl Loader for ByteaBinaryLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        Ok(Box::new(data.to_vec()))
    }
}

impl BuildLoader for ByteaBinaryLoader {
    fn build(oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(oid, Format::Binary, ctx),
        }
    }
}

fn text_loader(format: Format) -> LoaderFactory {
    let name = match format {
        Format::Text => "quill_codecs::optimized::text::TextLoader",
        Format::Binary => "quill_codecs::optimized::text::TextBinaryLoader",
    };
    LoaderFactory::new(name, move |oid, ctx| {
        Box::new(TextLoader {
            base: LoaderBase::new(oid, format, ctx),
        })
    })
}

/// 安装文本分组，覆盖参考实现的全部键。
pub fn register(map: &AdaptersMap) {
    let strings = [SourceType::of::<String>(), SourceType::of::<&'static str>()];
    let blobs = [SourceType::of::<Vec<u8>>(), SourceType::of::<Bytes>()];
    let (text, binary) = (
        DumperFactory::of::<StringTextDumper>(),
        DumperFactory::of::<StringBinaryDumper>(),
    );
    for source in strings {
        text.register_into(map, source, Format::Text);
        binary.register_into(map, source, Format::Binary);
    }
    let (text, binary) = (
        DumperFactory::of::<ByteaTextDumper>(),
        DumperFactory::of::<ByteaBinaryDumper>(),
    );
    for source in blobs {
        text.register_into(map, source, Format::Text);
        binary.register_into(map, source, Format::Binary);
    }
    for format in Format::ALL {
        let factory = text_loader(format);
        for oid in TEXT_OIDS {
            factory.register_into(map, oid, format);
        }
    }
    LoaderFactory::of::<ByteaTextLoader>().register_into(map, Oid::BYTEA, Format::Text);
    LoaderFactory::of::<ByteaBinaryLoader>().register_into(map, Oid::BYTEA, Format::Binary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::downcast_loaded;

    #[test]
    fn hex_roundtrip_through_preallocated_buffers() {
        let ctx = AdaptContext::new();
        let dumper = ByteaTextDumper::build(SourceType::of::<Vec<u8>>(), &ctx);
        let dumped = dumper.dump(&vec![0x00u8, 0x7f, 0xff]).expect("编码应成功");
        assert_eq!(dumped, Bytes::from_static(b"\\x007fff"));

        let loader = ByteaTextLoader::build(Oid::BYTEA, &ctx);
        let value = loader.cload(&dumped).expect("解码应成功");
        assert_eq!(
            downcast_loaded::<Vec<u8>>("bytea", value).expect("类型应为 Vec<u8>"),
            vec![0x00, 0x7f, 0xff]
        );
    }

    #[test]
    fn odd_hex_is_rejected() {
        let loader = ByteaTextLoader::build(Oid::BYTEA, &AdaptContext::new());
        assert!(loader.cload(b"\\xabc").is_err());
    }

    #[test]
    fn binary_bytes_share_storage() {
        let dumper = ByteaBinaryDumper::build(SourceType::of::<Bytes>(), &AdaptContext::new());
        let input = Bytes::from_static(b"shared");
        let dumped = dumper.dump(&input).expect("编码应成功");
        assert_eq!(dumped.as_ptr(), input.as_ptr());
    }
}
