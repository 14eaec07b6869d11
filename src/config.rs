//! 配置管理模块
//!
//! 提供统一的配置文件读取和管理功能。所有字段都有默认值，
//! 配置文件中只需写出需要覆盖的部分。

use crate::database::DatabaseType;
use crate::error::{ImportError, Result};
use crate::importer::{DEFAULT_INDEX_TABLESPACE, ImportOptions};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 主配置结构体
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 日志配置
    pub log: LogConfig,
    /// 导入配置
    pub import: ImportConfig,
    /// 目标数据库配置
    pub target: TargetConfig,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 是否启用控制台输出
    pub enable_stdout: bool,
    /// 是否写入按天滚动的日志文件
    pub enable_file: bool,
    /// 日志输出目录
    pub log_dir: String,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enable_stdout: true,
            enable_file: true,
            log_dir: "logs".to_string(),
            file_prefix: "dbexport-import".to_string(),
            level: "info".to_string(),
        }
    }
}

/// 导入配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// 目标 schema，未设置时使用目标库的默认 schema
    pub schema: Option<String>,
    /// 导入前删除已有的同名表和视图
    pub drop_existing: bool,
    /// 插入时跳过的列名
    pub skip_columns: Vec<String>,
    /// 索引表空间，仅 PostgreSQL 使用；空串表示不输出表空间子句
    pub index_tablespace: Option<String>,
    /// JSON 报告输出路径
    pub report_path: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            schema: None,
            drop_existing: false,
            skip_columns: Vec::new(),
            index_tablespace: Some(DEFAULT_INDEX_TABLESPACE.to_string()),
            report_path: None,
        }
    }
}

/// 目标数据库配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// 数据库类型
    #[serde(rename = "type")]
    pub db_type: DatabaseType,
    /// 文件型数据库为文件路径（空串表示内存库），PostgreSQL 为连接串
    pub url: String,
}

lazy_static! {
    static ref IDENTIFIER_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").unwrap();
}

impl Config {
    /// 从文件加载配置
    ///
    /// # Errors
    /// 文件不可读、TOML 无效或校验失败时返回错误
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// 从字符串加载配置
    ///
    /// # Errors
    /// TOML 无效或校验失败时返回错误
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    ///
    /// # Errors
    /// 序列化或写文件失败时返回错误
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置的有效性
    ///
    /// # Errors
    /// 日志级别、schema 名、跳过列或目标连接串无效时返回配置错误
    pub fn validate(&self) -> Result<()> {
        // 验证日志级别
        match self.log.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ImportError::config(format!(
                    "无效的日志级别: {}",
                    self.log.level
                )));
            }
        }

        if let Some(schema) = &self.import.schema {
            if !IDENTIFIER_RE.is_match(schema) {
                return Err(ImportError::config(format!("无效的 schema 名: {schema:?}")));
            }
        }

        if let Some(column) =
            self.import.skip_columns.iter().find(|c| c.trim().is_empty())
        {
            return Err(ImportError::config(format!(
                "skip_columns 中存在空列名: {column:?}"
            )));
        }

        if self.target.db_type == DatabaseType::Postgres
            && self.target.url.trim().is_empty()
        {
            return Err(ImportError::config("PostgreSQL 目标必须配置连接串 url"));
        }

        Ok(())
    }

    /// 生成导入器的运行参数
    #[must_use]
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            schema: self
                .import
                .schema
                .clone()
                .unwrap_or_else(|| self.target.db_type.default_schema().to_string()),
            drop_existing: self.import.drop_existing,
            skip_columns: self.import.skip_columns.clone(),
            index_tablespace: self
                .import
                .index_tablespace
                .clone()
                .filter(|ts| !ts.trim().is_empty()),
        }
    }
}
