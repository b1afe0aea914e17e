//! 目录提供的应用侧值类型。

/// SQL `NULL` 标记。
///
/// 参数绑定时 NULL 通过长度 `-1` 表示，不经过 Dumper 编码；
/// 只有在直接拼接查询文本时，其 Dumper 才会被用来生成字面量 `NULL`。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Null;
