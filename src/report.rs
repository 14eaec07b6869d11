//! 导入统计报告模块

use crate::database::TargetInfo;
use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};

/// 单张表的导入统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub table: String,
    /// 插入的行数
    pub rows: usize,
    /// 插入耗时（毫秒）
    pub elapsed_ms: u64,
}

impl TableStats {
    /// 计算每秒插入行数
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rows_per_second(&self) -> f64 {
        if self.elapsed_ms > 0 {
            self.rows as f64 * 1000.0 / self.elapsed_ms as f64
        } else {
            0.0
        }
    }
}

/// 字符串超出列长度被截断的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncationWarning {
    pub table: String,
    pub column: String,
    /// 表内行序号（从 1 开始）
    pub row: usize,
    pub original: String,
    pub truncated: String,
}

/// 一次导入的统计报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// 头文件中的源数据库名
    pub database: String,
    /// 目标 schema
    pub schema: String,
    pub target: Option<TargetInfo>,
    /// 导入前是否删除了已有对象
    pub dropped_existing: bool,
    pub tables: Vec<TableStats>,
    /// 创建的同义词视图
    pub views: Vec<String>,
    pub indexes: usize,
    pub unique_indexes: usize,
    pub warnings: Vec<TruncationWarning>,
    /// 总耗时（毫秒），`finish` 之后有效
    pub elapsed_ms: u64,
    #[serde(skip)]
    start_time: Option<Instant>,
}

impl ImportReport {
    /// 创建新的报告，记录开始时间
    #[must_use]
    pub fn new(database: &str, schema: &str) -> Self {
        Self {
            database: database.to_string(),
            schema: schema.to_string(),
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// 记录一张表的插入结果
    pub fn add_table(&mut self, table: &str, rows: usize, elapsed: Duration) {
        self.tables.push(TableStats {
            table: table.to_string(),
            rows,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }

    /// 标记导入完成，记录总耗时
    pub fn finish(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed_ms =
                u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        }
    }

    /// 插入的总行数
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// 序列化为格式化的 JSON
    ///
    /// # Errors
    /// 序列化失败时返回错误
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::ImportError::config(format!("报告序列化失败: {e}")))
    }

    /// 把 JSON 报告写入文件，必要时创建父目录
    ///
    /// # Errors
    /// 序列化或写文件失败时返回错误
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!("导入报告已写入: {}", path.display());
        Ok(())
    }
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "表: {}, 行: {}, 视图: {}, 索引: {}, 唯一索引: {}",
            self.tables.len(),
            self.total_rows(),
            self.views.len(),
            self.indexes,
            self.unique_indexes
        )?;
        if !self.warnings.is_empty() {
            write!(f, ", 截断警告: {}", self.warnings.len())?;
        }
        write!(f, ", 耗时: {:.2}s", self.elapsed_ms as f64 / 1000.0)
    }
}
