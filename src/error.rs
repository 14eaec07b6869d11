//! 错误类型定义
//!
//! 这个模块定义了库中使用的所有错误类型，使用 thiserror 提供丰富的错误信息。
//! 解析与加载阶段的错误都在修改目标数据库之前被发现；导入阶段的错误会携带
//! 失败的阶段、对象名以及驱动返回的原始错误文本。

use std::fmt;

/// 导入引擎的结果类型
pub type Result<T> = std::result::Result<T, ImportError>;

/// 导入流水线的阶段，用于在错误中标明失败位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Phase {
    /// 加载 unload 数据文件
    Load,
    /// 删除已存在的表和视图
    Drop,
    /// 目标 schema 为空检查
    EmptinessCheck,
    /// 建表
    CreateTables,
    /// 创建同义词视图
    CreateViews,
    /// 批量插入数据
    InsertRows,
    /// 创建普通索引
    CreateIndexes,
    /// 创建唯一索引
    CreateUniqueIndexes,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "加载数据文件",
            Self::Drop => "删除已有对象",
            Self::EmptinessCheck => "schema 空检查",
            Self::CreateTables => "建表",
            Self::CreateViews => "创建同义词视图",
            Self::InsertRows => "批量插入",
            Self::CreateIndexes => "创建索引",
            Self::CreateUniqueIndexes => "创建唯一索引",
        };
        f.write_str(name)
    }
}

/// 导入错误类型
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 头文件格式错误，行号从 1 开始
    #[error("格式错误 ({file} 第{line}行): {message}")]
    Format { file: String, line: usize, message: String },

    /// 一致性错误（行数、字段数、文件布局等）
    #[error("一致性错误: {0}")]
    Consistency(String),

    /// 字段取值无法转换为声明的类型
    #[error("字段 {field} 的值 {value:?} 无法解析: {reason}")]
    Value { field: String, value: String, reason: String },

    /// 加载 unload 文件某一行时失败
    #[error("加载表 {table} 失败 ({file} 第{line}行): {source}")]
    Row {
        table: String,
        file: String,
        line: usize,
        #[source]
        source: Box<ImportError>,
    },

    /// 目标数据库执行失败
    #[error("{phase}阶段失败，对象 {object}: {message}")]
    Target { phase: Phase, object: String, message: String },

    /// 目标 schema 非空
    #[error("目标 schema {schema} 非空，已存在表: {}", .tables.join(", "))]
    SchemaNotEmpty { schema: String, tables: Vec<String> },

    /// 数据库驱动错误（尚未归属到具体阶段）
    #[error("数据库错误: {0}")]
    Database(String),

    /// 导入器状态错误（例如失败后继续调用）
    #[error("导入器状态错误: {0}")]
    State(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// TOML 反序列化错误
    #[error("配置解析错误: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML 序列化错误
    #[error("配置序列化错误: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl ImportError {
    /// 创建一个格式错误，`line` 为 1 开始的行号
    pub fn format_error<F: Into<String>, S: Into<String>>(
        file: F,
        line: usize,
        message: S,
    ) -> Self {
        let file = file.into();
        let message = message.into();
        #[cfg(feature = "logging")]
        crate::logging::ensure_logger_initialized();
        tracing::error!("格式错误发生在 {} 第{}行: {}", file, line, message);
        Self::Format { file, line, message }
    }

    /// 创建一个一致性错误
    pub fn consistency<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        crate::logging::ensure_logger_initialized();
        tracing::error!("一致性错误: {}", message);
        Self::Consistency(message)
    }

    /// 创建一个取值转换错误
    pub fn value_error<S: Into<String>>(
        field: &str,
        value: &str,
        reason: S,
    ) -> Self {
        Self::Value {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// 创建一个目标数据库执行错误
    pub fn target<O: Into<String>, S: fmt::Display>(
        phase: Phase,
        object: O,
        cause: S,
    ) -> Self {
        let object = object.into();
        let message = cause.to_string();
        #[cfg(feature = "logging")]
        crate::logging::ensure_logger_initialized();
        tracing::error!(%phase, object = %object, "目标数据库执行失败: {}", message);
        Self::Target { phase, object, message }
    }

    /// 创建一个配置错误
    pub fn config<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        #[cfg(feature = "logging")]
        crate::logging::ensure_logger_initialized();
        tracing::error!("配置错误: {}", message);
        Self::Config(message)
    }

    /// 将未归属阶段的数据库错误归入指定阶段
    #[must_use]
    pub fn in_phase(self, phase: Phase, object: &str) -> Self {
        match self {
            Self::Database(message) => {
                Self::target(phase, object.to_string(), message)
            }
            other => other,
        }
    }

    /// 检查是否为 IO 错误
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// 检查是否为格式错误
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Format { .. })
    }

    /// 检查是否为一致性错误
    pub fn is_consistency_error(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }

    /// 检查是否为取值转换错误（包括加载行时包装的转换错误）
    pub fn is_value_error(&self) -> bool {
        match self {
            Self::Value { .. } => true,
            Self::Row { source, .. } => source.is_value_error(),
            _ => false,
        }
    }

    /// 检查是否为目标数据库执行错误
    pub fn is_target_error(&self) -> bool {
        matches!(self, Self::Target { .. } | Self::Database(_))
    }

    /// 检查是否为 schema 非空错误
    pub fn is_schema_not_empty(&self) -> bool {
        matches!(self, Self::SchemaNotEmpty { .. })
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(feature = "target-sqlite")]
impl From<rusqlite::Error> for ImportError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(feature = "target-duckdb")]
impl From<duckdb::Error> for ImportError {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(feature = "target-postgres")]
impl From<tokio_postgres::Error> for ImportError {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let format_err =
            ImportError::format_error("demo.sql", 10, "invalid format");
        assert!(format_err.is_format_error());

        let consistency_err = ImportError::consistency("row count");
        assert!(consistency_err.is_consistency_error());

        let config_err = ImportError::config("config missing");
        assert!(!config_err.is_io_error());
        assert!(config_err.is_config_error());
    }

    #[test]
    fn test_error_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ImportError = io_err.into();
        assert!(err.is_io_error());
    }

    #[test]
    fn test_error_display() {
        let err = ImportError::Format {
            file: "demo.sql".to_string(),
            line: 42,
            message: "bad line".to_string(),
        };

        let display = format!("{}", err);
        assert!(display.contains("42"));
        assert!(display.contains("demo.sql"));
        assert!(display.contains("bad line"));
    }

    #[test]
    fn test_in_phase_wraps_database_error() {
        let err = ImportError::Database("relation exists".to_string())
            .in_phase(Phase::CreateTables, "widgets");
        assert!(err.is_target_error());
        let display = err.to_string();
        assert!(display.contains("widgets"));
        assert!(display.contains("relation exists"));
        assert!(display.contains("建表"));
    }

    #[test]
    fn test_row_error_keeps_value_kind() {
        let err = ImportError::Row {
            table: "widgets".to_string(),
            file: "widge00100.unl".to_string(),
            line: 3,
            source: Box::new(ImportError::value_error("id", "x", "invalid digit")),
        };
        assert!(err.is_value_error());
        assert!(err.to_string().contains("widgets"));
    }
}
