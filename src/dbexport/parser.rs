//! dbexport 头文件解析器 - 按行前缀分派
//!
//! 头文件是一个面向行的类 DDL 文本，逐行扫描并按行首前缀分派：
//!
//! ```text
//! { DATABASE demo  delimiter | }            → 数据库名与分隔符
//! { TABLE "demo".widgets row size = ... }   → 表块子解析器（状态机）
//! create synonym "demo".w for "demo".widgets;
//! create [unique] [cluster] index ... ;     → 索引声明（可跨两行）
//! create ...                                → 不支持的语句，报错
//! 其他（grant/revoke/空行）                 → 忽略
//! ```
//!
//! 表块内部的状态转换：
//!
//! ```text
//! BeforeUnloadLine --create table--> AfterCreateTable --"("--> GatheringFields --")"--> 完成
//!        ^ { unload file name = ... } 只能出现在 BeforeUnloadLine
//! ```
//!
//! 所有错误都带有头文件名和从 1 开始的行号。

use crate::dbexport::field::FieldDefinition;
use crate::dbexport::index::{IndexDefinition, IndexKind};
use crate::dbexport::types::{ExportModel, TableDefinition};
use crate::dbexport::utils::{
    ParseCursor, first_token, qualifier, strip_qualifier,
};
use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

const DATABASE_PREFIX: &str = "{ DATABASE ";
const TABLE_PREFIX: &str = "{ TABLE ";
const UNLOAD_PREFIX: &str = "{ unload file name = ";
const SYNONYM_PREFIX: &str = "create synonym ";
const CREATE_TABLE_PREFIX: &str = "create table ";

/// 表块子解析器的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState {
    BeforeUnloadLine,
    AfterCreateTable,
    GatheringFields,
}

/// 头文件解析器
pub struct ExportParser<'a> {
    source: &'a str,
    lines: Vec<&'a str>,
    model: ExportModel,
    has_database: bool,
}

impl<'a> ExportParser<'a> {
    fn new(source: &'a str, content: &'a str) -> Self {
        Self {
            source,
            lines: content.lines().collect(),
            model: ExportModel::default(),
            has_database: false,
        }
    }

    /// 读取并解析头文件
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ExportModel> {
        let path = path.as_ref();
        let content = match String::from_utf8(std::fs::read(path)?) {
            Ok(content) => content,
            Err(e) => {
                let bytes = e.as_bytes();
                let valid = e.utf8_error().valid_up_to();
                let line =
                    bytes[..valid].iter().filter(|&&b| b == b'\n').count() + 1;
                tracing::warn!(
                    line,
                    "头文件 {} 含无效 UTF-8 字节序列，按替换字符解码",
                    path.display()
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        };
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!("开始解析头文件: {}", path.display());
        Self::parse_str(&source, &content)
    }

    /// 解析头文件内容，`source` 仅用于错误信息
    pub fn parse_str(source: &str, content: &str) -> Result<ExportModel> {
        let mut parser = ExportParser::new(source, content);
        parser.run()?;
        tracing::info!(
            database = %parser.model.database,
            tables = parser.model.tables.len(),
            synonyms = parser.model.synonyms.len(),
            indexes = parser.model.indexes.len(),
            unique_indexes = parser.model.unique_indexes.len(),
            "头文件解析完成: {}",
            source
        );
        Ok(parser.model)
    }

    fn run(&mut self) -> Result<()> {
        let mut idx = 0usize;
        while idx < self.lines.len() {
            let cursor = ParseCursor::new(self.source, idx);
            let raw: &'a str = self.lines[idx];
            let line = raw.trim_start();

            idx = if let Some(rest) = line.strip_prefix(DATABASE_PREFIX) {
                self.parse_database(rest, &cursor)?;
                idx + 1
            } else if let Some(rest) = line.strip_prefix(TABLE_PREFIX) {
                self.require_database(&cursor, "TABLE")?;
                self.parse_table_block(rest, idx)?
            } else if let Some(rest) = line.strip_prefix(SYNONYM_PREFIX) {
                self.require_database(&cursor, "synonym")?;
                self.parse_synonym(rest, &cursor)?;
                idx + 1
            } else if let Some(kind) = IndexKind::detect(line) {
                self.require_database(&cursor, kind.label())?;
                self.parse_index(kind, idx)?
            } else if line.starts_with("create ") {
                return Err(
                    cursor.error(format!("不支持的 create 语句: {}", line.trim()))
                );
            } else {
                idx + 1
            };
        }
        Ok(())
    }

    fn require_database(&self, cursor: &ParseCursor, what: &str) -> Result<()> {
        if self.has_database {
            Ok(())
        } else {
            Err(cursor.error(format!(
                "{what} 定义出现在 DATABASE 定义之前 (before DATABASE definition)"
            )))
        }
    }

    /// `{ DATABASE <name> [delimiter <c>] }`
    fn parse_database(&mut self, rest: &str, cursor: &ParseCursor) -> Result<()> {
        if self.has_database {
            return Err(cursor.error("重复的 DATABASE 定义"));
        }
        let name = first_token(rest);
        if name.is_empty() || name == "}" {
            return Err(cursor.error("DATABASE 定义缺少数据库名"));
        }
        self.model.database = name.to_string();

        if let Some(pos) = rest.find("delimiter ") {
            match rest[pos + "delimiter ".len()..].chars().next() {
                Some(c) if !c.is_whitespace() => self.model.delimiter = c,
                _ => return Err(cursor.error("delimiter 子句缺少分隔符")),
            }
        }

        self.has_database = true;
        tracing::debug!(
            line = cursor.line_number(),
            database = %self.model.database,
            delimiter = %self.model.delimiter,
            "解析 DATABASE 定义"
        );
        Ok(())
    }

    /// 解析 `{ TABLE ... }` 开始的表块，返回第一个未消费行的索引
    fn parse_table_block(&mut self, rest: &str, start: usize) -> Result<usize> {
        let start_cursor = ParseCursor::new(self.source, start);
        let raw_name = first_token(rest);
        if raw_name.is_empty() {
            return Err(start_cursor.error("TABLE 定义缺少表名"));
        }
        let table_name =
            strip_qualifier(raw_name, &self.model.database).to_string();

        let mut state = TableState::BeforeUnloadLine;
        let mut unload: Option<(String, usize)> = None;
        let mut fields = Vec::new();

        let mut idx = start + 1;
        while idx < self.lines.len() {
            let cursor = start_cursor.at(idx);
            let raw: &'a str = self.lines[idx];
            let line = raw.trim();
            idx += 1;

            if line.is_empty() {
                continue;
            }

            if state == TableState::GatheringFields {
                if line.starts_with(')') {
                    let Some((file, num_rows)) = unload.take() else {
                        return Err(cursor.error(format!(
                            "表 {table_name} 缺少 unload 文件定义"
                        )));
                    };
                    let table =
                        TableDefinition::new(&table_name, &file, num_rows, fields)
                            .map_err(|e| cursor.error(e.to_string()))?;
                    tracing::debug!(
                        table = %table.table_name,
                        fields = table.num_fields(),
                        rows = table.num_rows,
                        "表定义解析完成"
                    );
                    self.model.tables.push(table);
                    return Ok(idx);
                }
                fields.push(FieldDefinition::parse(line, &cursor)?);
                continue;
            }

            if line.starts_with(UNLOAD_PREFIX) {
                if state != TableState::BeforeUnloadLine {
                    return Err(cursor.error(
                        "unload 文件定义必须出现在 create table 之前",
                    ));
                }
                unload = Some(parse_unload_line(line, &cursor)?);
            } else if let Some(name) = line.strip_prefix(CREATE_TABLE_PREFIX) {
                let name = name.trim();
                if state != TableState::BeforeUnloadLine {
                    return Err(cursor.error(format!(
                        "表 {table_name} 中重复的 create table"
                    )));
                }
                if name != raw_name {
                    return Err(cursor.error(format!(
                        "create table {name} 与 TABLE 定义 {raw_name} 不一致"
                    )));
                }
                if unload.is_none() {
                    return Err(cursor.error(format!(
                        "create table {name} 之前缺少 unload 文件定义"
                    )));
                }
                state = TableState::AfterCreateTable;
            } else if line == "(" {
                if state != TableState::AfterCreateTable {
                    return Err(cursor.error("'(' 必须紧跟在 create table 之后"));
                }
                state = TableState::GatheringFields;
            }
        }

        Err(start_cursor.error(format!("表 {table_name} 的定义在文件结束前未完成")))
    }

    /// `create synonym "<db>".syn for "<db>".table;`
    fn parse_synonym(&mut self, rest: &str, cursor: &ParseCursor) -> Result<()> {
        let Some(body) = rest.trim_end().strip_suffix(';') else {
            return Err(cursor.error("create synonym 语句必须以 ';' 结尾"));
        };
        let Some((synonym, table)) = body.split_once(" for ") else {
            return Err(cursor.error("create synonym 语句缺少 \" for \""));
        };

        let prefix = qualifier(&self.model.database);
        let strip = |name: &str| -> Result<String> {
            name.trim()
                .strip_prefix(prefix.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    cursor.error(format!(
                        "同义词中的名称 {} 缺少 {prefix} 限定",
                        name.trim()
                    ))
                })
        };
        let synonym = strip(synonym)?;
        let table = strip(table)?;

        tracing::trace!(
            line = cursor.line_number(),
            synonym = %synonym,
            table = %table,
            "解析同义词"
        );
        self.model.synonyms.insert(synonym, table);
        Ok(())
    }

    /// 索引声明；行内没有 ';' 时拼接下一行。返回第一个未消费行的索引
    fn parse_index(&mut self, kind: IndexKind, idx: usize) -> Result<usize> {
        let cursor = ParseCursor::new(self.source, idx);
        let line = self.lines[idx].trim();
        let rest = &line[kind.prefix().len()..];

        let (decl, next) = if let Some(pos) = rest.find(';') {
            (rest[..=pos].to_string(), idx + 1)
        } else {
            let Some(following) = self.lines.get(idx + 1) else {
                return Err(cursor.error(format!("{} 声明缺少 ';'", kind.label())));
            };
            let joined = format!("{rest} {}", following.trim());
            let Some(pos) = joined.find(';') else {
                return Err(cursor.error(format!("{} 声明缺少 ';'", kind.label())));
            };
            (joined[..=pos].to_string(), idx + 2)
        };

        let index =
            IndexDefinition::parse(&decl, kind, &self.model.database, &cursor)?;
        if index.unique {
            self.model.unique_indexes.push(index);
        } else {
            self.model.indexes.push(index);
        }
        Ok(next)
    }
}

/// `{ unload file name = <file> number of rows = <n> }`
fn parse_unload_line(
    line: &str,
    cursor: &ParseCursor,
) -> Result<(String, usize)> {
    lazy_static! {
        static ref UNLOAD_RE: Regex = Regex::new(
            r"^\{ unload file name = (\S+) number of rows = (\d+)"
        )
        .unwrap();
    }

    let Some(caps) = UNLOAD_RE.captures(line) else {
        return Err(cursor.error(format!("无法解析 unload 文件定义: {line}")));
    };
    let num_rows = caps[2]
        .parse::<usize>()
        .map_err(|e| cursor.error(format!("无效的行数 {}: {e}", &caps[2])))?;
    Ok((caps[1].to_string(), num_rows))
}
