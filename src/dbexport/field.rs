//! 列定义：类型语法、取值转换与目标列子句渲染

use crate::dbexport::utils::ParseCursor;
use crate::error::{ImportError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// unload 文件中 DATE 列的格式
pub const DATE_FORMAT: &str = "%m/%d/%Y";
/// unload 文件中 DATETIME YEAR TO SECOND 列的格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    SmallInt,
    Integer,
    BigInt,
    Date,
    /// `datetime year to second`
    Timestamp,
    Char { length: u32 },
    Varchar { length: u32 },
    Decimal { length: u32, precision: u32 },
    /// `text`（CLOB）
    Text,
}

/// 绑定参数时使用的标量类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    Integer,
    BigInt,
    Double,
    Date,
    Timestamp,
    Text,
}

impl FieldType {
    /// 从类型标记解析列类型，`rest` 为类型标记之后的剩余文本。
    ///
    /// 失败时返回错误描述，由调用方附加文件和行号。
    fn from_token(
        token: &str,
        rest: &str,
    ) -> std::result::Result<Self, String> {
        lazy_static! {
            static ref CHAR_RE: Regex =
                Regex::new(r"^(char|varchar)(?:\((\d+)(?:,\s*\d+)?\))?$").unwrap();
            static ref DECIMAL_RE: Regex =
                Regex::new(r"^decimal\((\d+)(?:,\s*(\d+))?\)$").unwrap();
        }

        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "smallint" => return Ok(Self::SmallInt),
            "integer" | "int" | "serial" => return Ok(Self::Integer),
            "bigint" | "int8" | "serial8" | "bigserial" => {
                return Ok(Self::BigInt);
            }
            "date" => return Ok(Self::Date),
            "text" => return Ok(Self::Text),
            "datetime" => {
                let qualifier = rest.trim_start().to_ascii_lowercase();
                return if qualifier.starts_with("year to second") {
                    Ok(Self::Timestamp)
                } else {
                    Err(format!("不支持的 datetime 精度: {}", rest.trim()))
                };
            }
            _ => {}
        }

        if let Some(caps) = CHAR_RE.captures(&lower) {
            let length = match caps.get(2) {
                Some(m) => parse_width(m.as_str())?,
                None if &caps[1] == "char" => 1,
                None => {
                    return Err(format!("varchar 缺少长度: {token}"));
                }
            };
            return Ok(if &caps[1] == "char" {
                Self::Char { length }
            } else {
                Self::Varchar { length }
            });
        }

        if let Some(caps) = DECIMAL_RE.captures(&lower) {
            let length = parse_width(&caps[1])?;
            let precision = match caps.get(2) {
                Some(m) => parse_width(m.as_str())?,
                None => 0,
            };
            return Ok(Self::Decimal { length, precision });
        }

        Err(format!("Unsupported data type: {token}"))
    }

    /// 字符/数值宽度，不适用时为 0
    #[must_use]
    pub const fn length(&self) -> u32 {
        match self {
            Self::Char { length }
            | Self::Varchar { length }
            | Self::Decimal { length, .. } => *length,
            _ => 0,
        }
    }

    /// 小数位数，不适用时为 0
    #[must_use]
    pub const fn precision(&self) -> u32 {
        match self {
            Self::Decimal { precision, .. } => *precision,
            _ => 0,
        }
    }

    /// 目标库中的列类型
    #[must_use]
    pub fn sql_type(&self) -> String {
        match self {
            Self::SmallInt => "smallint".to_string(),
            Self::Integer => "integer".to_string(),
            Self::BigInt => "bigint".to_string(),
            Self::Date => "date".to_string(),
            Self::Timestamp => "timestamp".to_string(),
            Self::Char { length } => format!("char({length})"),
            Self::Varchar { length } => format!("varchar({length})"),
            Self::Decimal { length, precision } => {
                format!("decimal({length},{precision})")
            }
            Self::Text => "text".to_string(),
        }
    }

    /// 绑定参数时的标量类别
    #[must_use]
    pub const fn bind_kind(&self) -> BindKind {
        match self {
            Self::SmallInt | Self::Integer => BindKind::Integer,
            Self::BigInt => BindKind::BigInt,
            Self::Decimal { .. } => BindKind::Double,
            Self::Date => BindKind::Date,
            Self::Timestamp => BindKind::Timestamp,
            Self::Char { .. } | Self::Varchar { .. } | Self::Text => {
                BindKind::Text
            }
        }
    }

    /// 字符串列允许的最大 UTF-8 字节数；`text` 与非字符列不受限制
    #[must_use]
    pub const fn max_bytes(&self) -> Option<usize> {
        match self {
            Self::Char { length } | Self::Varchar { length } => {
                Some(*length as usize)
            }
            _ => None,
        }
    }
}

fn parse_width(s: &str) -> std::result::Result<u32, String> {
    s.parse::<u32>().map_err(|e| format!("无效的类型宽度 {s}: {e}"))
}

/// 单个字段的取值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Integer(i32),
    BigInt(i64),
    Double(f64),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// 列定义，解析自 `create table` 块中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDefinition {
    pub field_name: String,
    pub field_type: FieldType,
    /// 声明了 `not null`
    pub required: bool,
}

impl FieldDefinition {
    /// 解析一行列声明，例如 `name varchar(10) not null,`。
    ///
    /// 第一个空白之前是列名；剩余文本的第一个空白分隔的标记（去掉末尾逗号）
    /// 是类型标记；类型标记之后的文本包含 `not null` 时列为必填。
    pub fn parse(line: &str, cursor: &ParseCursor) -> Result<Self> {
        let trimmed = line.trim();
        let Some((name, remainder)) = trimmed.split_once(char::is_whitespace)
        else {
            return Err(cursor.error(format!("列定义缺少类型: {trimmed}")));
        };

        let remainder = remainder.trim_start();
        let (token, rest) = remainder
            .split_once(char::is_whitespace)
            .unwrap_or((remainder, ""));
        let token = token.trim_end_matches(',');

        let field_type = FieldType::from_token(token, rest)
            .map_err(|msg| cursor.error(format!("列 {name}: {msg}")))?;
        let required = rest.contains("not null");

        tracing::trace!(
            line = cursor.line_number(),
            field = name,
            ?field_type,
            required,
            "解析列定义"
        );

        Ok(Self { field_name: name.to_string(), field_type, required })
    }

    /// 字符/数值宽度，不适用时为 0
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.field_type.length()
    }

    /// 小数位数，不适用时为 0
    #[must_use]
    pub const fn precision(&self) -> u32 {
        self.field_type.precision()
    }

    /// 将 unload 文件中的原始文本转换为取值，空串视为 NULL
    pub fn interpret(&self, raw: &str) -> Result<Value> {
        if raw.is_empty() {
            return Ok(Value::Null);
        }

        let err = |reason: String| {
            ImportError::value_error(&self.field_name, raw, reason)
        };

        let value = match self.field_type {
            FieldType::SmallInt | FieldType::Integer => Value::Integer(
                raw.trim().parse::<i32>().map_err(|e| err(e.to_string()))?,
            ),
            FieldType::BigInt => Value::BigInt(
                raw.trim().parse::<i64>().map_err(|e| err(e.to_string()))?,
            ),
            FieldType::Decimal { .. } => Value::Double(
                raw.trim().parse::<f64>().map_err(|e| err(e.to_string()))?,
            ),
            FieldType::Date => Value::Date(
                NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                    .map_err(|e| err(e.to_string()))?,
            ),
            FieldType::Timestamp => Value::Timestamp(
                NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
                    .map_err(|e| err(e.to_string()))?,
            ),
            FieldType::Char { .. }
            | FieldType::Varchar { .. }
            | FieldType::Text => Value::Text(raw.to_string()),
        };
        Ok(value)
    }

    /// 渲染目标库的列子句，列名按 `width` 左对齐
    #[must_use]
    pub fn column_clause(&self, width: usize) -> String {
        let mut clause = format!(
            "{:<width$} {}",
            self.field_name,
            self.field_type.sql_type()
        );
        if self.required {
            clause.push_str(" NOT NULL");
        }
        clause
    }

    /// 按列声明的长度截断字符串：超出字节数时从末尾逐字符删除，直到放得下。
    ///
    /// 未超长时返回 `Cow::Borrowed`。
    #[must_use]
    pub fn fit_text<'a>(&self, s: &'a str) -> Cow<'a, str> {
        match self.field_type.max_bytes() {
            Some(max) if s.len() > max => {
                let mut truncated = s.to_string();
                while truncated.len() > max {
                    truncated.pop();
                }
                Cow::Owned(truncated)
            }
            _ => Cow::Borrowed(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<FieldDefinition> {
        FieldDefinition::parse(line, &ParseCursor::new("demo.sql", 0))
    }

    #[test]
    fn test_parse_integer_not_null() {
        let field = parse("    age integer not null ,").unwrap();
        assert_eq!(field.field_name, "age");
        assert_eq!(field.field_type, FieldType::Integer);
        assert!(field.required);
        assert_eq!(field.length(), 0);
    }

    #[test]
    fn test_parse_sized_types() {
        let field = parse("name varchar(10),").unwrap();
        assert_eq!(field.field_type, FieldType::Varchar { length: 10 });
        assert!(!field.required);

        let field = parse("code char(3) not null").unwrap();
        assert_eq!(field.field_type, FieldType::Char { length: 3 });

        let field = parse("price decimal(8,2)").unwrap();
        assert_eq!(field.length(), 8);
        assert_eq!(field.precision(), 2);
    }

    #[test]
    fn test_parse_datetime() {
        let field = parse("created datetime year to second not null,").unwrap();
        assert_eq!(field.field_type, FieldType::Timestamp);
        assert!(field.required);

        let err = parse("created datetime year to fraction(3)").unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_parse_unsupported_type() {
        let err = parse("blob_col byte").unwrap_err();
        assert!(err.to_string().contains("Unsupported data type"));
        assert!(err.to_string().contains("第1行"));
    }

    #[test]
    fn test_interpret_values() {
        let int = parse("id integer").unwrap();
        assert_eq!(int.interpret("42").unwrap(), Value::Integer(42));
        assert_eq!(int.interpret("").unwrap(), Value::Null);
        assert!(int.interpret("4x").unwrap_err().is_value_error());

        let date = parse("d date").unwrap();
        assert_eq!(
            date.interpret("12/31/1999").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap())
        );

        let ts = parse("t datetime year to second").unwrap();
        let expected = NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        assert_eq!(
            ts.interpret("2020-02-29 13:05:09").unwrap(),
            Value::Timestamp(expected)
        );

        let text = parse("note text").unwrap();
        assert_eq!(
            text.interpret(" padded ").unwrap(),
            Value::Text(" padded ".to_string())
        );
    }

    #[test]
    fn test_column_clause() {
        let field = parse("age integer not null").unwrap();
        assert_eq!(field.column_clause(6), "age    integer NOT NULL");

        let field = parse("price decimal(8,2)").unwrap();
        assert_eq!(field.column_clause(0), "price decimal(8,2)");
    }

    #[test]
    fn test_fit_text() {
        let field = parse("name varchar(5)").unwrap();
        assert_eq!(field.fit_text("abcdef"), "abcde");
        assert!(matches!(field.fit_text("abcde"), Cow::Borrowed(_)));
        // 多字节字符不会被截断到一半
        assert_eq!(field.fit_text("ab中文"), "ab中");

        let text = parse("note text").unwrap();
        assert_eq!(text.fit_text("abcdefghij"), "abcdefghij");
    }
}
