// 数据库模块 - 目标数据库的抽象层
//
// 该模块提供：
// - 可扩展的目标数据库抽象接口
// - 不同 SQL 方言的语句渲染差异
// - SQLite / PostgreSQL / DuckDB 实现（按 feature 启用）
// - 单表单事务的批量插入

#[cfg(feature = "target-duckdb")]
mod duckdb_impl;
#[cfg(feature = "target-postgres")]
mod postgres_impl;
#[cfg(feature = "target-sqlite")]
mod sqlite_impl;
mod types;

use crate::dbexport::{BindKind, Value};
use crate::error::{ImportError, Result};

#[cfg(feature = "target-duckdb")]
pub use duckdb_impl::DuckDbTarget;
#[cfg(feature = "target-postgres")]
pub use postgres_impl::PostgresTarget;
#[cfg(feature = "target-sqlite")]
pub use sqlite_impl::SqliteTarget;
pub use types::*;

/// 目标库的 SQL 方言差异
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
    DuckDb,
}

impl Dialect {
    /// `<schema>.<name>` 形式的限定名
    #[must_use]
    pub fn qualify(&self, schema: &str, name: &str) -> String {
        format!("{schema}.{name}")
    }

    /// 索引语句中的 (索引名, 表名)。
    ///
    /// `SQLite` 把 schema 放在索引名上，表名不能再带 schema；其余方言限定表名。
    #[must_use]
    pub fn index_target(
        &self,
        schema: &str,
        index: &str,
        table: &str,
    ) -> (String, String) {
        match self {
            Self::Sqlite => (self.qualify(schema, index), table.to_string()),
            Self::Postgres | Self::DuckDb => {
                (index.to_string(), self.qualify(schema, table))
            }
        }
    }

    /// 是否支持索引表空间子句
    #[must_use]
    pub const fn supports_tablespaces(&self) -> bool {
        matches!(self, Self::Postgres)
    }

    /// 是否支持 `ALTER TABLE ... SET UNLOGGED`
    #[must_use]
    pub const fn supports_unlogged(&self) -> bool {
        matches!(self, Self::Postgres)
    }

    /// 第 `n` 个（从 1 开始）绑定参数的占位符
    #[must_use]
    pub fn placeholder(&self, n: usize, kind: BindKind) -> String {
        match self {
            Self::Sqlite => "?".to_string(),
            Self::DuckDb => match kind {
                BindKind::Date => "CAST(? AS DATE)".to_string(),
                BindKind::Timestamp => "CAST(? AS TIMESTAMP)".to_string(),
                _ => "?".to_string(),
            },
            Self::Postgres => {
                let cast = match kind {
                    BindKind::Integer => "int4",
                    BindKind::BigInt => "int8",
                    BindKind::Double => "float8",
                    BindKind::Date => "date",
                    BindKind::Timestamp => "timestamp",
                    BindKind::Text => "text",
                };
                format!("${n}::{cast}")
            }
        }
    }

    /// 渲染参数化的 `INSERT` 语句，显式列出列名
    #[must_use]
    pub fn insert_statement(
        &self,
        qualified_table: &str,
        columns: &[(&str, BindKind)],
    ) -> String {
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let params: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (_, kind))| self.placeholder(i + 1, *kind))
            .collect();
        format!(
            "INSERT INTO {qualified_table} ({}) VALUES ({})",
            names.join(", "),
            params.join(", ")
        )
    }

    /// 渲染同义词视图。`SQLite` 视图体内不能引用带 schema 的表名
    #[must_use]
    pub fn create_view_statement(
        &self,
        schema: &str,
        view: &str,
        table: &str,
    ) -> String {
        let source = match self {
            Self::Sqlite => table.to_string(),
            Self::Postgres | Self::DuckDb => self.qualify(schema, table),
        };
        format!(
            "CREATE VIEW {} AS SELECT * FROM {source}",
            self.qualify(schema, view)
        )
    }

    #[must_use]
    pub fn drop_view_statement(&self, schema: &str, view: &str) -> String {
        format!("DROP VIEW IF EXISTS {}", self.qualify(schema, view))
    }

    #[must_use]
    pub fn drop_table_statement(&self, schema: &str, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.qualify(schema, table))
    }
}

/// 目标数据库抽象接口
///
/// 导入器只通过此 trait 访问目标库；所有实现都是同步的，
/// 需要异步驱动的实现自行持有运行时。
pub trait TargetDatabase {
    /// 目标名称，用于日志
    fn name(&self) -> &str;

    /// SQL 方言
    fn dialect(&self) -> Dialect;

    /// 执行一条不返回结果的语句（DDL）
    ///
    /// # Errors
    /// 语句执行失败时返回 `ImportError::Database`
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// 列出 schema 中已存在的基本表
    ///
    /// # Errors
    /// 查询目录失败时返回错误
    fn list_tables(&mut self, schema: &str) -> Result<Vec<String>>;

    /// 切换表的写日志模式，不支持的目标什么都不做
    ///
    /// # Errors
    /// 语句执行失败时返回错误
    fn set_logged(&mut self, qualified_table: &str, logged: bool) -> Result<()> {
        let _ = (qualified_table, logged);
        Ok(())
    }

    /// 在一个事务中用预编译语句插入全部行并提交，返回插入的行数。
    ///
    /// `kinds` 与语句中的参数一一对应，用于绑定 NULL 时确定参数类型。
    ///
    /// # Errors
    /// 任意一行失败时回滚并返回错误
    fn bulk_insert(
        &mut self,
        sql: &str,
        kinds: &[BindKind],
        rows: &mut dyn Iterator<Item = Vec<Value>>,
    ) -> Result<usize>;

    /// 目标数据库信息
    fn info(&self) -> TargetInfo;
}

/// 按类型和连接串打开目标数据库
///
/// 文件型数据库的连接串为文件路径，空串或 `:memory:` 表示内存库；
/// `PostgreSQL` 使用 libpq 风格的连接串。
///
/// # Errors
/// 对应 feature 未启用或连接失败时返回错误
pub fn connect(db_type: DatabaseType, url: &str) -> Result<Box<dyn TargetDatabase>> {
    tracing::info!(%db_type, "连接目标数据库");
    match db_type {
        #[cfg(feature = "target-sqlite")]
        DatabaseType::Sqlite => Ok(Box::new(SqliteTarget::open(url)?)),
        #[cfg(feature = "target-postgres")]
        DatabaseType::Postgres => Ok(Box::new(PostgresTarget::connect(url)?)),
        #[cfg(feature = "target-duckdb")]
        DatabaseType::DuckDb => Ok(Box::new(DuckDbTarget::open(url)?)),
        #[allow(unreachable_patterns)]
        other => {
            let _ = url;
            Err(ImportError::config(format!(
                "目标数据库 {other} 未启用，请使用 target-{other} feature 重新编译"
            )))
        }
    }
}
