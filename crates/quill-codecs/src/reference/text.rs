//! 参考实现：字符串与字节串。
//!
//! - 字符串文本格式的 OID 保持“未指定”，由服务端按上下文推断为 `text`、`varchar` 或其他字符类型；
//!   二进制格式必须声明具体类型，使用 `text`；
//! - 字节串文本格式输出十六进制形式 `\x...`，解码同时兼容十六进制与旧式转义形式。

use std::any::Any;

use bytes::Bytes;
use quill_core::{
    AdaptContext, AdaptError, AdaptersMap, BuildDumper, BuildLoader, Dumper, DumperBase,
    DumperFactory, Format, LoadedValue, Loader, LoaderBase, LoaderFactory, Oid, Result,
    SourceType,
};

/// 文本类 Loader 覆盖的线上类型。
pub const TEXT_OIDS: [Oid; 5] = [Oid::TEXT, Oid::VARCHAR, Oid::BPCHAR, Oid::NAME, Oid::UNKNOWN];

/// 提取字符串载荷；同时接受 `String` 与 `&'static str`。
pub(crate) fn string_payload<'a>(codec: &'static str, value: &'a dyn Any) -> Result<&'a str> {
    if let Some(text) = value.downcast_ref::<String>() {
        Ok(text.as_str())
    } else if let Some(text) = value.downcast_ref::<&'static str>() {
        Ok(*text)
    } else {
        Err(AdaptError::TypeMismatch {
            codec,
            expected: "String",
        })
    }
}

/// 提取字节串载荷；同时接受 `Vec<u8>` 与 `Bytes`。
pub(crate) fn bytes_payload<'a>(codec: &'static str, value: &'a dyn Any) -> Result<&'a [u8]> {
    if let Some(data) = value.downcast_ref::<Vec<u8>>() {
        Ok(data.as_slice())
    } else if let Some(data) = value.downcast_ref::<Bytes>() {
        Ok(&data[..])
    } else {
        Err(AdaptError::TypeMismatch {
            codec,
            expected: "Vec<u8>",
        })
    }
}

pub(crate) const NUL_IN_TEXT: &str = "PostgreSQL text fields cannot contain NUL (0x00) bytes";

/// 字符串文本 Dumper。
pub struct StringTextDumper {
    base: DumperBase,
}

impl Dumper for StringTextDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let text = string_payload(self.name(), value)?;
        if text.contains('\0') {
            return Err(AdaptError::data(NUL_IN_TEXT));
        }
        Ok(Bytes::from(text.to_owned()))
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
        let text = string_payload(self.name(), value)?;
        if text.contains('\0') {
            return Err(AdaptError::data(NUL_IN_TEXT));
        }
        Ok(Bytes::from(text.to_owned()))
    }
}

impl BuildDumper for StringBinaryDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Binary, Oid::TEXT, ctx),
        }
    }
}

/// 字节串文本 Dumper，输出 `\x` 十六进制形式。
pub struct ByteaTextDumper {
    base: DumperBase,
}

impl Dumper for ByteaTextDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let data = bytes_payload(self.name(), value)?;
        Ok(Bytes::from(format!("\\x{}", hex::encode(data))))
    }
}

impl BuildDumper for ByteaTextDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, Oid::BYTEA, ctx),
        }
    }
}

/// 字节串二进制 Dumper，原样输出。
pub struct ByteaBinaryDumper {
    base: DumperBase,
}

impl Dumper for ByteaBinaryDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
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

/// 文本 Loader，文本与二进制格式的载荷相同，均要求合法 UTF-8。
pub struct TextLoader {
    base: LoaderBase,
}

impl Loader for TextLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        std::str::from_utf8(data)
            .map(|text| Box::new(text.to_owned()) as LoadedValue)
            .map_err(|err| AdaptError::data(format!("invalid utf-8 in text value: {err}")))
    }
}

/// 字节串文本 Loader。
pub struct ByteaTextLoader {
    base: LoaderBase,
}

impl Loader for ByteaTextLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        let decoded = match data.strip_prefix(b"\\x") {
            Some(digits) => hex::decode(digits)
                .map_err(|err| AdaptError::data(format!("invalid bytea hex: {err}")))?,
            None => unescape_bytea(data)?,
        };
        Ok(Box::new(decoded))
    }
}

/// 解码旧式 `escape` 格式：`\\` 表示反斜杠，`\ooo` 表示八进制字节，其余字节原样保留。
pub(crate) fn unescape_bytea(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut rest = data;
    while let Some((&byte, tail)) = rest.split_first() {
        if byte != b'\\' {
            out.push(byte);
            rest = tail;
            continue;
        }
        match tail {
            [b'\\', after @ ..] => {
                out.push(b'\\');
                rest = after;
            }
            [a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7', after @ ..] => {
                out.push(((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0'));
                rest = after;
            }
            _ => return Err(AdaptError::data("invalid bytea escape sequence")),
        }
    }
    Ok(out)
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

macro_rules! loader_ctor {
    ($($ty:ident => $format:expr),* $(,)?) => {
        $(
            impl BuildLoader for $ty {
                fn build(oid: Oid, ctx: &AdaptContext) -> Self {
                    Self {
                        base: LoaderBase::new(oid, $format, ctx),
                    }
                }
            }
        )*
    };
}

loader_ctor!(
    ByteaTextLoader => Format::Text,
    ByteaBinaryLoader => Format::Binary,
);

/// 文本 Loader 的格式由注册键决定，因此分别提供两个构造器。
fn text_loader(format: Format) -> LoaderFactory {
    let name = match format {
        Format::Text => "quill_codecs::reference::text::TextLoader",
        Format::Binary => "quill_codecs::reference::text::TextBinaryLoader",
    };
    LoaderFactory::new(name, move |oid, ctx| {
        Box::new(TextLoader {
            base: LoaderBase::new(oid, format, ctx),
        })
    })
}

/// 安装文本分组。
pub fn register(map: &AdaptersMap) {
    for source in [SourceType::of::<String>(), SourceType::of::<&'static str>()] {
        DumperFactory::of::<StringTextDumper>().register_into(map, source, Format::Text);
        DumperFactory::of::<StringBinaryDumper>().register_into(map, source, Format::Binary);
    }
    for source in [SourceType::of::<Vec<u8>>(), SourceType::of::<Bytes>()] {
        DumperFactory::of::<ByteaTextDumper>().register_into(map, source, Format::Text);
        DumperFactory::of::<ByteaBinaryDumper>().register_into(map, source, Format::Binary);
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
