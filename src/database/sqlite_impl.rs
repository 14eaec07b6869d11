// SQLite 目标数据库实现
//
// 日期以 `YYYY-MM-DD`、时间戳以 `YYYY-MM-DD HH:MM:SS` 文本存储，
// 与 SQLite 内置日期函数的输入格式一致。

use super::{DatabaseMode, DatabaseType, Dialect, TargetDatabase, TargetInfo};
use crate::dbexport::{BindKind, Value};
use crate::error::Result;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use std::path::Path;

/// `SQLite` 目标数据库
pub struct SqliteTarget {
    connection: Connection,
    mode: DatabaseMode,
}

impl SqliteTarget {
    /// 打开数据库文件，空串或 `:memory:` 打开内存库
    ///
    /// # Errors
    /// 当数据库文件无法打开时返回错误
    pub fn open(url: &str) -> Result<Self> {
        let mode = DatabaseMode::from_file_url(url);
        let connection = match &mode {
            DatabaseMode::Disk { path } => {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                tracing::info!("打开 SQLite 数据库: {}", path);
                Connection::open(path)?
            }
            _ => {
                tracing::info!("打开 SQLite 内存数据库");
                Connection::open_in_memory()?
            }
        };
        Ok(Self { connection, mode })
    }

    /// 打开内存库
    ///
    /// # Errors
    /// 当内存库创建失败时返回错误
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// 底层连接，便于调用方查询导入结果
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }
}

fn to_sql_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(i64::from(v)),
        Value::BigInt(v) => SqlValue::Integer(v),
        Value::Double(v) => SqlValue::Real(v),
        Value::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::Timestamp(ts) => {
            SqlValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        Value::Text(s) => SqlValue::Text(s),
    }
}

impl TargetDatabase for SqliteTarget {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        tracing::debug!("SQLite 执行: {}", sql);
        self.connection.execute_batch(sql)?;
        Ok(())
    }

    fn list_tables(&mut self, schema: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT name FROM \"{schema}\".sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        );
        let mut stmt = self.connection.prepare(&sql)?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tables)
    }

    fn bulk_insert(
        &mut self,
        sql: &str,
        _kinds: &[BindKind],
        rows: &mut dyn Iterator<Item = Vec<Value>>,
    ) -> Result<usize> {
        tracing::debug!("SQLite 批量插入: {}", sql);
        let tx = self.connection.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.into_iter().map(to_sql_value)))?;
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn info(&self) -> TargetInfo {
        TargetInfo::new(DatabaseType::Sqlite, self.mode.clone())
            .with_version(Some(rusqlite::version().to_string()))
    }
}
