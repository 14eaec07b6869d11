// PostgreSQL 目标数据库实现
//
// tokio-postgres 是异步驱动；这里持有一个私有的单线程运行时，
// 所有调用都通过 block_on 同步完成，连接任务在同一运行时上被驱动。

use super::{DatabaseMode, DatabaseType, Dialect, TargetDatabase, TargetInfo};
use crate::dbexport::{BindKind, Value};
use crate::error::{ImportError, Result};
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::config::Host;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls};

type BoxedParam = Box<dyn ToSql + Sync>;

/// `PostgreSQL` 目标数据库
pub struct PostgresTarget {
    runtime: Runtime,
    client: Client,
    host: String,
    version: Option<String>,
}

impl PostgresTarget {
    /// 使用 libpq 风格的连接串连接服务器，例如
    /// `host=localhost user=postgres dbname=demo` 或 `postgresql://...`
    ///
    /// # Errors
    /// 连接串无效或连接失败时返回错误
    pub fn connect(url: &str) -> Result<Self> {
        let config: Config = url
            .parse()
            .map_err(|e| ImportError::config(format!("无效的 PostgreSQL 连接串: {e}")))?;
        let host = match config.get_hosts().first() {
            Some(Host::Tcp(h)) => h.clone(),
            _ => "localhost".to_string(),
        };

        let runtime = Builder::new_current_thread().enable_all().build()?;
        let (client, connection) =
            runtime.block_on(config.connect(NoTls))?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL 连接错误: {}", e);
            }
        });

        let version = runtime
            .block_on(client.query_one("SELECT version()", &[]))
            .ok()
            .and_then(|row| row.try_get::<_, String>(0).ok());
        tracing::info!(host = %host, ?version, "已连接 PostgreSQL");

        Ok(Self { runtime, client, host, version })
    }
}

/// 按绑定类别装箱一个参数；NULL 也需要带上与占位符一致的类型
fn bind_param(value: Value, kind: BindKind) -> BoxedParam {
    match (value, kind) {
        (Value::Null, BindKind::Integer) => Box::new(None::<i32>),
        (Value::Null, BindKind::BigInt) => Box::new(None::<i64>),
        (Value::Null, BindKind::Double) => Box::new(None::<f64>),
        (Value::Null, BindKind::Date) => Box::new(None::<chrono::NaiveDate>),
        (Value::Null, BindKind::Timestamp) => {
            Box::new(None::<chrono::NaiveDateTime>)
        }
        (Value::Null, BindKind::Text) => Box::new(None::<String>),
        (Value::Integer(v), BindKind::BigInt) => Box::new(i64::from(v)),
        (Value::Integer(v), _) => Box::new(v),
        (Value::BigInt(v), _) => Box::new(v),
        (Value::Double(v), _) => Box::new(v),
        (Value::Date(v), _) => Box::new(v),
        (Value::Timestamp(v), _) => Box::new(v),
        (Value::Text(v), _) => Box::new(v),
    }
}

impl TargetDatabase for PostgresTarget {
    fn name(&self) -> &str {
        "PostgreSQL"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        tracing::debug!("PostgreSQL 执行: {}", sql);
        self.runtime.block_on(self.client.batch_execute(sql))?;
        Ok(())
    }

    fn list_tables(&mut self, schema: &str) -> Result<Vec<String>> {
        // 未加引号的标识符在服务器端折叠为小写
        let schema = schema.to_lowercase();
        let rows = self.runtime.block_on(self.client.query(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            &[&schema],
        ))?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(ImportError::from))
            .collect()
    }

    fn set_logged(&mut self, qualified_table: &str, logged: bool) -> Result<()> {
        let mode = if logged { "LOGGED" } else { "UNLOGGED" };
        self.execute(&format!("ALTER TABLE {qualified_table} SET {mode}"))
    }

    fn bulk_insert(
        &mut self,
        sql: &str,
        kinds: &[BindKind],
        rows: &mut dyn Iterator<Item = Vec<Value>>,
    ) -> Result<usize> {
        tracing::debug!("PostgreSQL 批量插入: {}", sql);
        let client = &mut self.client;
        self.runtime.block_on(async move {
            let tx = client.transaction().await?;
            let stmt = tx.prepare(sql).await?;
            let mut inserted = 0;
            for row in rows {
                let params: Vec<BoxedParam> = row
                    .into_iter()
                    .zip(kinds.iter().copied())
                    .map(|(value, kind)| bind_param(value, kind))
                    .collect();
                let refs: Vec<&(dyn ToSql + Sync)> =
                    params.iter().map(|p| &**p).collect();
                tx.execute(&stmt, &refs).await?;
                inserted += 1;
            }
            tx.commit().await?;
            Ok::<usize, ImportError>(inserted)
        })
    }

    fn info(&self) -> TargetInfo {
        TargetInfo::new(
            DatabaseType::Postgres,
            DatabaseMode::Server { host: self.host.clone() },
        )
        .with_version(self.version.clone())
    }
}
