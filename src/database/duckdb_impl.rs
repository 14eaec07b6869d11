// DuckDB 目标数据库实现
//
// 日期与时间戳以文本绑定，由插入语句中的 CAST 转为目标类型。

use super::{DatabaseMode, DatabaseType, Dialect, TargetDatabase, TargetInfo};
use crate::dbexport::{BindKind, Value};
use crate::error::Result;
use duckdb::types::Value as DuckValue;
use duckdb::{Connection, params, params_from_iter};
use std::path::Path;

/// `DuckDB` 目标数据库
pub struct DuckDbTarget {
    connection: Connection,
    mode: DatabaseMode,
}

impl DuckDbTarget {
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
                tracing::info!("打开 DuckDB 数据库: {}", path);
                Connection::open(path)?
            }
            _ => {
                tracing::info!("打开 DuckDB 内存数据库");
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

fn to_duck_value(value: Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Integer(v) => DuckValue::Int(v),
        Value::BigInt(v) => DuckValue::BigInt(v),
        Value::Double(v) => DuckValue::Double(v),
        Value::Date(d) => DuckValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::Timestamp(ts) => {
            DuckValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        Value::Text(s) => DuckValue::Text(s),
    }
}

impl TargetDatabase for DuckDbTarget {
    fn name(&self) -> &str {
        "DuckDB"
    }

    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        tracing::debug!("DuckDB 执行: {}", sql);
        self.connection.execute_batch(sql)?;
        Ok(())
    }

    fn list_tables(&mut self, schema: &str) -> Result<Vec<String>> {
        let mut stmt = self.connection.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )?;
        let tables = stmt
            .query_map(params![schema], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(tables)
    }

    fn bulk_insert(
        &mut self,
        sql: &str,
        _kinds: &[BindKind],
        rows: &mut dyn Iterator<Item = Vec<Value>>,
    ) -> Result<usize> {
        tracing::debug!("DuckDB 批量插入: {}", sql);
        let tx = self.connection.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.into_iter().map(to_duck_value)))?;
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn info(&self) -> TargetInfo {
        let version = self
            .connection
            .query_row("SELECT version()", [], |row| row.get::<_, String>(0))
            .ok();
        TargetInfo::new(DatabaseType::DuckDb, self.mode.clone())
            .with_version(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_bulk_insert_with_date_cast() {
        let mut target = DuckDbTarget::open_in_memory().unwrap();
        target
            .execute("CREATE TABLE main.t (id integer, d date)")
            .unwrap();
        assert_eq!(target.list_tables("main").unwrap(), vec!["t"]);

        let sql = Dialect::DuckDb.insert_statement(
            "main.t",
            &[("id", BindKind::Integer), ("d", BindKind::Date)],
        );
        let rows = vec![
            vec![
                Value::Integer(7),
                Value::Date(NaiveDate::from_ymd_opt(2022, 1, 2).unwrap()),
            ],
            vec![Value::Integer(8), Value::Null],
        ];
        let inserted = target
            .bulk_insert(
                &sql,
                &[BindKind::Integer, BindKind::Date],
                &mut rows.into_iter(),
            )
            .unwrap();
        assert_eq!(inserted, 2);

        let nulls: i64 = target
            .connection()
            .query_row("SELECT COUNT(*) FROM t WHERE d IS NULL", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(nulls, 1);
    }
}
