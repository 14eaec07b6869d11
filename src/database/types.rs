// 数据库模块类型定义
//
// 定义目标数据库相关的枚举和结构体

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 支持的目标数据库类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `SQLite` 数据库（内存或磁盘模式）
    #[default]
    Sqlite,
    /// `PostgreSQL` 服务器
    Postgres,
    /// `DuckDB` 数据库（内存或磁盘模式）
    #[value(name = "duckdb")]
    DuckDb,
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "duckdb" => Ok(Self::DuckDb),
            _ => Err(format!("不支持的目标数据库类型: {s}")),
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::DuckDb => "duckdb",
        })
    }
}

impl DatabaseType {
    /// 该类型未指定 schema 时使用的默认 schema
    #[must_use]
    pub const fn default_schema(&self) -> &'static str {
        match self {
            Self::Sqlite | Self::DuckDb => "main",
            Self::Postgres => "public",
        }
    }
}

/// 数据库连接方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseMode {
    /// 内存模式 - 数据存储在内存中，程序结束后丢失
    InMemory,
    /// 磁盘模式 - 数据持久化到指定文件
    Disk { path: String },
    /// 服务器模式 - 通过连接串访问，不记录口令
    Server { host: String },
}

impl DatabaseMode {
    /// 根据文件型数据库的连接串判断模式，空串或 `:memory:` 为内存模式
    #[must_use]
    pub fn from_file_url(url: &str) -> Self {
        if url.is_empty() || url == ":memory:" {
            Self::InMemory
        } else {
            Self::Disk { path: url.to_string() }
        }
    }
}

/// 目标数据库信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// 数据库类型
    pub db_type: DatabaseType,
    /// 连接方式
    pub mode: DatabaseMode,
    /// 数据库版本信息
    pub version: Option<String>,
}

impl TargetInfo {
    /// 创建新的目标数据库信息
    #[must_use]
    pub const fn new(db_type: DatabaseType, mode: DatabaseMode) -> Self {
        Self { db_type, mode, version: None }
    }

    /// 附加版本信息
    #[must_use]
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_from_str() {
        assert_eq!("SQLite".parse::<DatabaseType>(), Ok(DatabaseType::Sqlite));
        assert_eq!(
            "postgresql".parse::<DatabaseType>(),
            Ok(DatabaseType::Postgres)
        );
        assert_eq!("duckdb".parse::<DatabaseType>(), Ok(DatabaseType::DuckDb));
        assert!("oracle".parse::<DatabaseType>().is_err());
    }

    #[test]
    fn test_database_mode_from_file_url() {
        assert_eq!(DatabaseMode::from_file_url(":memory:"), DatabaseMode::InMemory);
        assert_eq!(DatabaseMode::from_file_url(""), DatabaseMode::InMemory);
        assert_eq!(
            DatabaseMode::from_file_url("out/demo.db"),
            DatabaseMode::Disk { path: "out/demo.db".to_string() }
        );
    }

    #[test]
    fn test_default_schema() {
        assert_eq!(DatabaseType::Postgres.default_schema(), "public");
        assert_eq!(DatabaseType::Sqlite.default_schema(), "main");
    }
}
