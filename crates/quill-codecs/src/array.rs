//! # array 模块说明
//!
//! ## 角色定位（Why）
//! - 数组的每个元素都要交给元素类型自己的编解码器处理，因此数组编解码器内部持有一个 [`Transformer`]，
//!   在同一实例的生命周期内复用元素编解码器；
//! - 元素类型在注册时未知：Dumper 从第一个非空元素推断，Loader 在注册时绑定基础类型 OID（文本）
//!   或读取二进制头部中的元素 OID。
//!
//! ## 格式（What）
//! - 文本：`{a,b,{c,d}}`；元素为空串、包含 `"{},\` 或空白、或等于 `NULL`（不区分大小写）时加双引号，
//!   引号内的 `"` 与 `\` 以反斜杠转义；空元素写作未加引号的 `NULL`；
//! - 二进制：头部 `(维数, 是否含 NULL, 元素 OID)`，随后每维 `(长度, 下界 = 1)`，再按行优先顺序写入
//!   带 4 字节长度前缀的元素，NULL 的长度为 `-1`；空数组只写头部 `(0, 0, text)`。
//!
//! ## 风险提示（Trade-offs）
//! - Dumper 的 OID 固定为 `text[]`；按元素推断出的数组类型通过 [`ListTextDumper::dump_array`] 与
//!   [`ListBinaryDumper::dump_array`] 的返回值提供，不修改实例状态；
//! - 只识别逗号分隔符，`box` 等使用分号分隔的类型不适用。

use std::any::Any;

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use quill_core::{
    AdaptContext, AdaptError, AdaptersMap, BuildDumper, Dumper, DumperBase, DumperFactory, Format,
    LoadedValue, Loader, LoaderBase, LoaderFactory, Oid, Result, SourceType, Transformer,
    builtins, downcast_source,
};
use tracing::debug;

/// 数组元素。
#[derive(Debug)]
pub enum ArrayElement {
    /// SQL `NULL`。
    Null,
    /// 由元素编解码器处理的值。
    Value(LoadedValue),
    /// 嵌套的子数组。
    Array(PgArray),
}

impl ArrayElement {
    /// 包装一个值。
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        ArrayElement::Value(Box::new(value))
    }

    /// 是否为 NULL。
    pub fn is_null(&self) -> bool {
        matches!(self, ArrayElement::Null)
    }

    /// 以 `T` 读取值元素；NULL、子数组或类型不符时返回 `None`。
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            ArrayElement::Value(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// 读取子数组。
    pub fn as_array(&self) -> Option<&PgArray> {
        match self {
            ArrayElement::Array(array) => Some(array),
            _ => None,
        }
    }
}

/// 可多维嵌套的数组值。
#[derive(Debug, Default)]
pub struct PgArray {
    items: Vec<ArrayElement>,
}

impl PgArray {
    /// 空数组。
    pub fn new() -> Self {
        Self::default()
    }

    /// 由元素列表构造。
    pub fn from_elements(items: Vec<ArrayElement>) -> Self {
        Self { items }
    }

    /// 由一组非空值构造一维数组。
    pub fn from_values<T: Any + Send + Sync>(values: impl IntoIterator<Item = T>) -> Self {
        Self::from_elements(values.into_iter().map(ArrayElement::value).collect())
    }

    /// 由可空值构造一维数组，`None` 对应 NULL。
    pub fn from_options<T: Any + Send + Sync>(values: impl IntoIterator<Item = Option<T>>) -> Self {
        Self::from_elements(
            values
                .into_iter()
                .map(|value| value.map_or(ArrayElement::Null, ArrayElement::value))
                .collect(),
        )
    }

    /// 由子数组构造高一维的数组。
    pub fn nested(rows: impl IntoIterator<Item = PgArray>) -> Self {
        Self::from_elements(rows.into_iter().map(ArrayElement::Array).collect())
    }

    /// 追加元素。
    pub fn push(&mut self, item: ArrayElement) {
        self.items.push(item);
    }

    /// 全部元素。
    pub fn items(&self) -> &[ArrayElement] {
        &self.items
    }

    /// 元素个数（仅最外层）。
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 以 `T` 读取一维数组；存在子数组或类型不符的元素时返回 `None`。
    pub fn values<T: Any>(&self) -> Option<Vec<Option<&T>>> {
        self.items
            .iter()
            .map(|item| match item {
                ArrayElement::Null => Some(None),
                ArrayElement::Value(value) => value.downcast_ref::<T>().map(Some),
                ArrayElement::Array(_) => None,
            })
            .collect()
    }
}

fn array_oid_for(element: Option<Oid>) -> Oid {
    element
        .and_then(builtins::array_oid_of)
        .unwrap_or(Oid::TEXT_ARRAY)
}

fn needs_quotes(token: &[u8]) -> bool {
    token.is_empty()
        || token.eq_ignore_ascii_case(b"null")
        || token.iter().any(|byte| {
            matches!(byte, b'"' | b'{' | b'}' | b',' | b'\\' | 0x0b) || byte.is_ascii_whitespace()
        })
}

fn write_text_level(
    array: &PgArray,
    out: &mut BytesMut,
    tx: &mut Transformer,
    element_oid: &mut Option<Oid>,
) -> Result<()> {
    out.put_u8(b'{');
    for (index, item) in array.items().iter().enumerate() {
        if index > 0 {
            out.put_u8(b',');
        }
        match item {
            ArrayElement::Null => out.put_slice(b"NULL"),
            ArrayElement::Array(inner) => write_text_level(inner, out, tx, element_oid)?,
            ArrayElement::Value(value) => {
                let value: &dyn Any = &**value;
                let dumper = tx.get_dumper(value, Format::Text)?;
                let token = dumper.dump(value)?;
                if needs_quotes(&token) {
                    out.put_u8(b'"');
                    for &byte in token.iter() {
                        if byte == b'"' || byte == b'\\' {
                            out.put_u8(b'\\');
                        }
                        out.put_u8(byte);
                    }
                    out.put_u8(b'"');
                } else {
                    out.put_slice(&token);
                }
                element_oid.get_or_insert(dumper.oid());
            }
        }
    }
    out.put_u8(b'}');
    Ok(())
}

/// 数组文本 Dumper。
pub struct ListTextDumper {
    base: DumperBase,
    tx: Mutex<Transformer>,
}

impl ListTextDumper {
    /// 编码数组，同时返回按首个非空元素推断出的数组类型（无法推断时为 `text[]`）。
    pub fn dump_array(&self, array: &PgArray) -> Result<(Bytes, Oid)> {
        let mut out = BytesMut::new();
        let mut element_oid = None;
        let mut tx = self.tx.lock();
        write_text_level(array, &mut out, &mut tx, &mut element_oid)?;
        Ok((out.freeze(), array_oid_for(element_oid)))
    }
}

impl Dumper for ListTextDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let array = downcast_source::<PgArray>(self.name(), value)?;
        self.dump_array(array).map(|(data, _)| data)
    }
}

impl BuildDumper for ListTextDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Text, Oid::TEXT_ARRAY, ctx),
            tx: Mutex::new(Transformer::new(ctx.clone())),
        }
    }
}

fn wire_len(len: usize, what: &str) -> Result<i32> {
    i32::try_from(len).map_err(|_| AdaptError::data(format!("{what} too large for a binary array")))
}

fn calc_dims(array: &PgArray) -> Result<Vec<usize>> {
    let mut dims = Vec::new();
    let mut level = array;
    loop {
        if level.is_empty() {
            return Err(AdaptError::data("lists cannot contain empty lists"));
        }
        dims.push(level.len());
        match level.items().first() {
            Some(ArrayElement::Array(inner)) => level = inner,
            _ => return Ok(dims),
        }
    }
}

struct BinaryItems<'t> {
    tx: &'t mut Transformer,
    out: BytesMut,
    has_null: bool,
    element_oid: Option<Oid>,
}

impl BinaryItems<'_> {
    fn write_level(&mut self, array: &PgArray, dims: &[usize]) -> Result<()> {
        let Some((&expected, inner_dims)) = dims.split_first() else {
            return Err(AdaptError::data("nested lists have inconsistent depths"));
        };
        if array.len() != expected {
            return Err(AdaptError::data("nested lists have inconsistent lengths"));
        }
        for item in array.items() {
            match (item, inner_dims.is_empty()) {
                (ArrayElement::Array(inner), false) => self.write_level(inner, inner_dims)?,
                (ArrayElement::Null, true) => {
                    self.has_null = true;
                    self.out.put_i32(-1);
                }
                (ArrayElement::Value(value), true) => {
                    let value: &dyn Any = &**value;
                    let dumper = self.tx.get_dumper(value, Format::Binary)?;
                    let data = dumper.dump(value)?;
                    self.out.put_i32(wire_len(data.len(), "element")?);
                    self.out.put_slice(&data);
                    self.element_oid.get_or_insert(dumper.oid());
                }
                _ => return Err(AdaptError::data("nested lists have inconsistent depths")),
            }
        }
        Ok(())
    }
}

/// 数组二进制 Dumper。
pub struct ListBinaryDumper {
    base: DumperBase,
    tx: Mutex<Transformer>,
}

impl ListBinaryDumper {
    /// 编码数组，同时返回按元素类型推断出的数组类型。
    pub fn dump_array(&self, array: &PgArray) -> Result<(Bytes, Oid)> {
        if array.is_empty() {
            let mut out = BytesMut::with_capacity(12);
            out.put_i32(0);
            out.put_i32(0);
            out.put_u32(Oid::TEXT.get());
            return Ok((out.freeze(), Oid::TEXT_ARRAY));
        }

        let dims = calc_dims(array)?;
        let mut tx = self.tx.lock();
        let mut items = BinaryItems {
            tx: &mut *tx,
            out: BytesMut::new(),
            has_null: false,
            element_oid: None,
        };
        items.write_level(array, &dims)?;
        let element_oid = items.element_oid.unwrap_or(Oid::TEXT);

        let mut out = BytesMut::with_capacity(12 + 8 * dims.len() + items.out.len());
        out.put_i32(wire_len(dims.len(), "dimension count")?);
        out.put_i32(i32::from(items.has_null));
        out.put_u32(element_oid.get());
        for &dim in &dims {
            out.put_i32(wire_len(dim, "dimension")?);
            out.put_i32(1);
        }
        out.put_slice(&items.out);
        Ok((out.freeze(), array_oid_for(Some(element_oid))))
    }
}

impl Dumper for ListBinaryDumper {
    fn base(&self) -> &DumperBase {
        &self.base
    }

    fn dump(&self, value: &dyn Any) -> Result<Bytes> {
        let array = downcast_source::<PgArray>(self.name(), value)?;
        self.dump_array(array).map(|(data, _)| data)
    }
}

impl BuildDumper for ListBinaryDumper {
    fn build(source: SourceType, ctx: &AdaptContext) -> Self {
        Self {
            base: DumperBase::new(source, Format::Binary, Oid::TEXT_ARRAY, ctx),
            tx: Mutex::new(Transformer::new(ctx.clone())),
        }
    }
}

fn malformed(detail: impl std::fmt::Display) -> AdaptError {
    AdaptError::data(format!("malformed array, {detail}"))
}

fn read_quoted(data: &[u8], mut pos: usize) -> Result<(Vec<u8>, usize)> {
    let mut token = Vec::new();
    while let Some(&byte) = data.get(pos) {
        match byte {
            b'"' => return Ok((token, pos + 1)),
            b'\\' => {
                let escaped = data
                    .get(pos + 1)
                    .ok_or_else(|| malformed("dangling escape"))?;
                token.push(*escaped);
                pos += 2;
            }
            _ => {
                token.push(byte);
                pos += 1;
            }
        }
    }
    Err(malformed("unterminated quoted element"))
}

fn parse_text_array(data: &[u8], element: &dyn Loader) -> Result<PgArray> {
    let mut stack: Vec<PgArray> = Vec::new();
    let mut result = None;
    let mut pos = 0;
    while let Some(&byte) = data.get(pos) {
        if result.is_some() {
            return Err(malformed("trailing data after '}'"));
        }
        let parsed = match byte {
            b'{' => {
                stack.push(PgArray::new());
                pos += 1;
                None
            }
            b'}' => {
                let done = stack.pop().ok_or_else(|| malformed("unexpected '}'"))?;
                pos += 1;
                Some(ArrayElement::Array(done))
            }
            b'"' => {
                let (token, next) = read_quoted(data, pos + 1)?;
                pos = next;
                Some(ArrayElement::Value(element.cload(&token)?))
            }
            _ => {
                let end = data[pos..]
                    .iter()
                    .position(|b| matches!(b, b'"' | b'{' | b'}' | b',' | b'\\'))
                    .map_or(data.len(), |offset| pos + offset);
                if end == pos {
                    return Err(malformed(format!("unexpected '{}'", char::from(byte))));
                }
                let token = &data[pos..end];
                pos = end;
                if token == b"NULL" {
                    Some(ArrayElement::Null)
                } else {
                    Some(ArrayElement::Value(element.cload(token)?))
                }
            }
        };
        match (parsed, stack.last_mut()) {
            (None, _) => {}
            (Some(ArrayElement::Array(done)), None) => result = Some(done),
            (Some(item), Some(parent)) => {
                parent.push(item);
                // 元素之后只能是分隔符或所在数组的结尾。
                match data.get(pos) {
                    Some(b',') => pos += 1,
                    Some(b'}') => {}
                    Some(&other) => {
                        return Err(malformed(format!(
                            "unexpected '{}' after element",
                            char::from(other)
                        )));
                    }
                    None => return Err(malformed("unterminated array")),
                }
            }
            (Some(_), None) => {
                let preview = String::from_utf8_lossy(&data[..pos.min(10)]).into_owned();
                return Err(malformed(format!("unexpected '{preview}'")));
            }
        }
    }
    if !stack.is_empty() {
        return Err(malformed("unterminated array"));
    }
    result.ok_or_else(|| malformed("missing '{'"))
}

/// 数组文本 Loader，元素交给基础类型的文本 Loader。
pub struct ArrayTextLoader {
    base: LoaderBase,
    base_oid: Oid,
    tx: Mutex<Transformer>,
}

impl ArrayTextLoader {
    /// 为 `array_oid` 构造 Loader，元素按 `base_oid` 解码。
    pub fn new(array_oid: Oid, base_oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(array_oid, Format::Text, ctx),
            base_oid,
            tx: Mutex::new(Transformer::new(ctx.clone())),
        }
    }
}

impl Loader for ArrayTextLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        let element = self.tx.lock().get_loader(self.base_oid, Format::Text)?;
        Ok(Box::new(parse_text_array(data, element.as_ref())?))
    }
}

struct WireCursor<'a>(&'a [u8]);

impl<'a> WireCursor<'a> {
    fn i32(&mut self) -> Result<i32> {
        let (head, rest) = self
            .0
            .split_first_chunk::<4>()
            .ok_or_else(|| malformed("truncated binary data"))?;
        self.0 = rest;
        Ok(i32::from_be_bytes(*head))
    }

    fn remaining(&self) -> usize {
        self.0.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.0.len() < len {
            return Err(malformed("truncated binary element"));
        }
        let (head, rest) = self.0.split_at(len);
        self.0 = rest;
        Ok(head)
    }
}

fn read_binary_level(
    dims: &[usize],
    cursor: &mut WireCursor<'_>,
    element: &dyn Loader,
) -> Result<PgArray> {
    let Some((&len, inner_dims)) = dims.split_first() else {
        return Ok(PgArray::new());
    };
    let mut array = PgArray::new();
    for _ in 0..len {
        let item = if !inner_dims.is_empty() {
            ArrayElement::Array(read_binary_level(inner_dims, cursor, element)?)
        } else {
            match cursor.i32()? {
                -1 => ArrayElement::Null,
                size => {
                    let size = usize::try_from(size)
                        .map_err(|_| malformed(format!("invalid element length {size}")))?;
                    ArrayElement::Value(element.cload(cursor.take(size)?)?)
                }
            }
        };
        array.push(item);
    }
    Ok(array)
}

/// 数组二进制 Loader，元素 OID 取自数据头部。
pub struct ArrayBinaryLoader {
    base: LoaderBase,
    tx: Mutex<Transformer>,
}

impl ArrayBinaryLoader {
    /// 为 `array_oid` 构造 Loader。
    pub fn new(array_oid: Oid, ctx: &AdaptContext) -> Self {
        Self {
            base: LoaderBase::new(array_oid, Format::Binary, ctx),
            tx: Mutex::new(Transformer::new(ctx.clone())),
        }
    }
}

impl Loader for ArrayBinaryLoader {
    fn base(&self) -> &LoaderBase {
        &self.base
    }

    fn cload(&self, data: &[u8]) -> Result<LoadedValue> {
        let mut cursor = WireCursor(data);
        let ndims = cursor.i32()?;
        let _has_null = cursor.i32()?;
        let element_oid = Oid::new(cursor.i32()? as u32);
        if ndims == 0 {
            return Ok(Box::new(PgArray::new()));
        }
        let ndims = usize::try_from(ndims)
            .map_err(|_| malformed(format!("invalid dimension count {ndims}")))?;
        let mut dims = Vec::with_capacity(ndims.min(6));
        for _ in 0..ndims {
            let len = cursor.i32()?;
            let _lower_bound = cursor.i32()?;
            dims.push(
                usize::try_from(len).map_err(|_| malformed(format!("invalid dimension {len}")))?,
            );
        }
        // 每个元素至少占 4 字节长度前缀，元素总数不能超过剩余字节所能容纳的数量。
        if dims.contains(&0) {
            return Err(malformed("zero-length dimension"));
        }
        let capacity = cursor.remaining() / 4;
        match dims.iter().try_fold(1usize, |total, &dim| total.checked_mul(dim)) {
            Some(total) if total <= capacity => {}
            _ => {
                return Err(malformed(format!(
                    "dimensions {dims:?} exceed the {} bytes of element data",
                    cursor.remaining()
                )));
            }
        }
        let element = self.tx.lock().get_loader(element_oid, Format::Binary)?;
        Ok(Box::new(read_binary_level(&dims, &mut cursor, element.as_ref())?))
    }
}

/// 为 `PgArray` 注册文本与二进制 Dumper。
pub fn register_list_dumpers(map: &AdaptersMap) {
    let source = SourceType::of::<PgArray>();
    DumperFactory::of::<ListTextDumper>().register_into(map, source, Format::Text);
    DumperFactory::of::<ListBinaryDumper>().register_into(map, source, Format::Binary);
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 为数组类型注册文本与二进制 Loader；未提供上下文时注册到进程级注册中心。
pub fn register_array(array_oid: Oid, base_oid: Oid, ctx: Option<&AdaptContext>, name: Option<&str>) {
    register_array_into(AdaptersMap::target(ctx), array_oid, base_oid, name);
}

/// 为数组类型注册文本与二进制 Loader 到指定注册中心。
pub fn register_array_into(map: &AdaptersMap, array_oid: Oid, base_oid: Oid, name: Option<&str>) {
    let name = title_case(&name.map_or_else(|| format!("oid{base_oid}"), str::to_owned));
    LoaderFactory::new(format!("{name}ArrayLoader"), move |oid, ctx| {
        Box::new(ArrayTextLoader::new(oid, base_oid, ctx))
    })
    .register_into(map, array_oid, Format::Text);
    LoaderFactory::new(format!("{name}ArrayBinaryLoader"), |oid, ctx| {
        Box::new(ArrayBinaryLoader::new(oid, ctx))
    })
    .register_into(map, array_oid, Format::Binary);
}

/// 为所有已注册了基础 Loader 的内置类型注册数组 Loader，返回注册的数组类型个数。
///
/// 应在基础 Loader 全部注册之后调用。
pub fn register_all_arrays(map: &AdaptersMap) -> usize {
    let mut registered = 0;
    for info in builtins::iter() {
        if info.array_oid.is_unspecified() {
            continue;
        }
        if map.has_loader(info.oid, Format::Text) || map.has_loader(info.oid, Format::Binary) {
            register_array_into(map, info.array_oid, info.oid, Some(info.name));
            registered += 1;
        }
    }
    debug!(registered, "array loaders registered");
    registered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_rules_for_text_elements() {
        assert!(needs_quotes(b""));
        assert!(needs_quotes(b"null"));
        assert!(needs_quotes(b"NuLl"));
        assert!(needs_quotes(b"a b"));
        assert!(needs_quotes(b"a,b"));
        assert!(needs_quotes(b"\x0b"));
        assert!(!needs_quotes(b"nullable"));
        assert!(!needs_quotes(b"42"));
    }

    #[test]
    fn array_oid_falls_back_to_text_array() {
        assert_eq!(array_oid_for(Some(Oid::INT4)), Oid::INT4_ARRAY);
        assert_eq!(array_oid_for(Some(Oid::UNSPECIFIED)), Oid::TEXT_ARRAY);
        assert_eq!(array_oid_for(None), Oid::TEXT_ARRAY);
    }

    #[test]
    fn dims_reject_empty_sublists() {
        let ragged = PgArray::nested([PgArray::new()]);
        let err = calc_dims(&ragged).expect_err("空子数组必须被拒绝");
        assert_eq!(err, AdaptError::data("lists cannot contain empty lists"));
    }

    #[test]
    fn title_case_matches_loader_names() {
        assert_eq!(title_case("int4"), "Int4");
        assert_eq!(title_case(""), "");
    }
}
