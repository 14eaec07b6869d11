//! 头文件解析的工具函数

use crate::error::ImportError;

/// 解析游标：当前解析的源文件名与行索引（从 0 开始）。
///
/// 所有子解析器共享同一种游标来构造带行号的错误信息。
#[derive(Debug, Clone, Copy)]
pub struct ParseCursor<'a> {
    source: &'a str,
    index: usize,
}

impl<'a> ParseCursor<'a> {
    #[must_use]
    pub const fn new(source: &'a str, index: usize) -> Self {
        Self { source, index }
    }

    /// 指向另一行的游标
    #[must_use]
    pub const fn at(&self, index: usize) -> Self {
        Self { source: self.source, index }
    }

    /// 行号（从 1 开始），用于展示
    #[must_use]
    pub const fn line_number(&self) -> usize {
        self.index + 1
    }

    /// 在当前行构造格式错误
    pub fn error<S: Into<String>>(&self, message: S) -> ImportError {
        ImportError::format_error(self.source, self.line_number(), message)
    }
}

/// 构造 `"<database>".` 限定前缀
#[must_use]
pub fn qualifier(database: &str) -> String {
    format!("\"{database}\".")
}

/// 去掉名称上的 `"<database>".` 限定前缀；没有该前缀时原样返回
#[must_use]
pub fn strip_qualifier<'a>(name: &'a str, database: &str) -> &'a str {
    let prefix = qualifier(database);
    name.strip_prefix(prefix.as_str()).unwrap_or(name)
}

/// 取第一个空白之前的标记
#[must_use]
pub fn first_token(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_qualifier() {
        assert_eq!(strip_qualifier("\"demo\".widgets", "demo"), "widgets");
        assert_eq!(strip_qualifier("widgets", "demo"), "widgets");
        assert_eq!(strip_qualifier("\"other\".widgets", "demo"), "\"other\".widgets");
    }

    #[test]
    fn test_cursor_line_number() {
        let cursor = ParseCursor::new("demo.sql", 4);
        assert_eq!(cursor.line_number(), 5);
        assert_eq!(cursor.at(9).line_number(), 10);

        let err = cursor.error("boom");
        assert!(err.to_string().contains("第5行"));
        assert!(err.to_string().contains("demo.sql"));
    }

    #[test]
    fn test_first_token() {
        assert_eq!(first_token("demo  delimiter | }"), "demo");
        assert_eq!(first_token(""), "");
    }
}
