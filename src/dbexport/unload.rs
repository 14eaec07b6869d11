//! unload 数据文件加载 - 多行拼接与转义处理
//!
//! unload 文件中每个字段都以分隔符结尾，一条完整记录恰好包含 `列数` 个
//! 未转义的分隔符。字段内容中的换行会把一条记录拆成多个物理行，因此加载时
//! 需要把物理行重新拼接成逻辑记录：
//!
//! ```text
//! 物理行                     未转义分隔符累计      逻辑记录
//! 1|first line\             1 (< 3)
//! second line|2020-01-01|   3 (>= 3)  ──────→  "1|first line\\\nsecond line|2020-01-01|"
//! 2|plain|2020-01-02|       3 (>= 3)  ──────→  "2|plain|2020-01-02|"
//! ```
//!
//! 转义规则：分隔符前面紧邻奇数个 `\` 时被转义，偶数个 `\` 相互抵消。
//!
//! 数据文件按字节读取，不是合法 UTF-8 的行按替换字符解码并记录警告；
//! 文件末尾的空行被忽略。

use crate::dbexport::types::{ExportModel, Row, TableDefinition};
use crate::error::{ImportError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// unload 文件使用的转义字符
pub const ESCAPE: char = '\\';

/// 统计一行中未被转义的分隔符个数
#[must_use]
pub fn count_unescaped_delimiters(line: &str, delimiter: char) -> usize {
    let mut count = 0;
    let mut escapes = 0usize;
    for c in line.chars() {
        if c == delimiter && escapes % 2 == 0 {
            count += 1;
        }
        if c == ESCAPE {
            escapes += 1;
        } else {
            escapes = 0;
        }
    }
    count
}

/// 拼接后的逻辑记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRecord {
    /// 记录起始的物理行号（从 1 开始）
    pub line: usize,
    pub text: String,
    /// 未转义分隔符个数达到列数；只有文件末尾的残留记录可能为 false
    pub complete: bool,
}

/// 把物理行贪心地拼接成逻辑记录。
///
/// 一行的未转义分隔符个数已达到 `num_fields` 时直接成为一条记录；否则依次
/// 用 `\n` 拼接后续物理行并累计分隔符个数，直到达到阈值。文件末尾残留的
/// 不完整记录会作为最后一条记录返回（`complete` 为 false），由拆分阶段报错。
#[must_use]
pub fn merge_lines(
    lines: &[String],
    num_fields: usize,
    delimiter: char,
) -> Vec<LogicalRecord> {
    let mut records = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let start = i;
        let mut text = lines[i].clone();
        let mut count = count_unescaped_delimiters(&text, delimiter);
        i += 1;

        while count < num_fields && i < lines.len() {
            text.push('\n');
            text.push_str(&lines[i]);
            count += count_unescaped_delimiters(&lines[i], delimiter);
            i += 1;
        }

        if i - start > 1 {
            tracing::trace!(
                line = start + 1,
                physical_lines = i - start,
                "拼接跨行记录"
            );
        }
        records.push(LogicalRecord {
            line: start + 1,
            text,
            complete: count >= num_fields,
        });
    }
    records
}

/// 按未转义的分隔符把一条记录拆成恰好 `num_fields` 个值，并去掉转义符。
///
/// 每个字段都以分隔符结尾；最后一个分隔符之后若仍有内容，视为多出一个字段。
pub fn split_record(
    record: &str,
    num_fields: usize,
    delimiter: char,
) -> std::result::Result<Vec<String>, String> {
    let mut values = Vec::with_capacity(num_fields);
    let mut current = String::new();
    let mut escaped = false;

    for c in record.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == delimiter {
            values.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push(ESCAPE);
    }

    if !current.is_empty() {
        return Err(format!(
            "最后一个字段 {current:?} 缺少结尾分隔符 (已有 {} 个完整字段，期望 {num_fields} 个)",
            values.len()
        ));
    }
    if values.len() != num_fields {
        return Err(format!(
            "字段数不匹配: 期望 {num_fields} 个，实际 {} 个",
            values.len()
        ));
    }
    Ok(values)
}

/// unload 文件加载器
pub struct UnloadFileLoader {
    dir: PathBuf,
    delimiter: char,
}

impl UnloadFileLoader {
    /// `dir` 为导出目录，unload 文件名相对该目录解析
    pub fn new<P: AsRef<Path>>(dir: P, delimiter: char) -> Self {
        Self { dir: dir.as_ref().to_path_buf(), delimiter }
    }

    /// 按声明顺序加载模型中所有表的数据
    pub fn load_all(dir: &Path, model: &mut ExportModel) -> Result<()> {
        let loader = Self::new(dir, model.delimiter);
        for table in &mut model.tables {
            loader.load_table(table)?;
        }
        tracing::info!(
            tables = model.tables.len(),
            rows = model.total_rows(),
            "所有 unload 文件加载完成"
        );
        Ok(())
    }

    /// 加载单张表的 unload 文件，返回加载的行数
    pub fn load_table(&self, table: &mut TableDefinition) -> Result<usize> {
        let start = Instant::now();
        let path = self.dir.join(&table.unload_file);
        let lines = read_physical_lines(&path).map_err(|e| {
            ImportError::consistency(format!(
                "无法读取表 {} 的 unload 文件 {}: {e}",
                table.table_name,
                path.display()
            ))
        })?;

        let num_fields = table.num_fields();
        let records = merge_lines(&lines, num_fields, self.delimiter);
        // 文件末尾不完整的残留记录不计入行数
        let complete = records.iter().filter(|r| r.complete).count();
        if complete < table.num_rows {
            return Err(ImportError::consistency(format!(
                "{} has {} lines, but {} indicates it should have {} rows",
                table.unload_file, complete, table.table_name, table.num_rows
            )));
        }
        if complete > table.num_rows {
            tracing::warn!(
                table = %table.table_name,
                declared = table.num_rows,
                actual = complete,
                "unload 文件的行数多于头文件声明，全部加载"
            );
        }

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let row = self.convert_record(table, record).map_err(|source| {
                ImportError::Row {
                    table: table.table_name.clone(),
                    file: table.unload_file.clone(),
                    line: record.line,
                    source: Box::new(source),
                }
            })?;
            rows.push(row);
        }

        let count = rows.len();
        table.set_rows(rows)?;
        tracing::debug!(
            table = %table.table_name,
            physical_lines = lines.len(),
            rows = count,
            elapsed_ms = start.elapsed().as_millis(),
            "unload 文件加载完成"
        );
        Ok(count)
    }

    fn convert_record(
        &self,
        table: &TableDefinition,
        record: &LogicalRecord,
    ) -> Result<Row> {
        let raw = split_record(&record.text, table.num_fields(), self.delimiter)
            .map_err(ImportError::consistency)?;
        let values = table
            .fields()
            .iter()
            .zip(raw.iter())
            .map(|(field, value)| field.interpret(value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(values))
    }
}

/// 按字节读取物理行，去掉行尾的 CR/LF 和文件末尾的空行
fn read_physical_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        lines.push(decode_line(&buf, path, lines.len() + 1));
    }

    let physical = lines.len();
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    if lines.len() < physical {
        tracing::debug!(
            file = %path.display(),
            skipped = physical - lines.len(),
            "忽略文件末尾的空行"
        );
    }
    Ok(lines)
}

/// 解码一行；不是合法 UTF-8 时按替换字符解码并记录行号
fn decode_line(bytes: &[u8], path: &Path, line: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            tracing::warn!(
                file = %path.display(),
                line,
                error = %e,
                "发现无效 UTF-8 字节序列，按替换字符解码"
            );
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
