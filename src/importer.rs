//! 导入器 - 在目标数据库上重建 schema 与数据
//!
//! 导入按固定顺序分阶段执行，建模为一个没有回退的状态机：
//!
//! ```text
//! Parsed ──load──→ Loaded ──create_schema──→ SchemaCreated
//!     ──load_data──→ DataLoaded ──build_indexes──→ IndexesBuilt
//!
//! 任何阶段失败 ──→ Failed { phase, cause }（终态）
//! ```
//!
//! 索引在全部数据插入之后才创建；每张表的插入在单个事务中完成。

use crate::database::{Dialect, TargetDatabase};
use crate::dbexport::{
    BindKind, ExportModel, FieldDefinition, TableDefinition, UnloadFileLoader,
    Value,
};
use crate::error::{ImportError, Phase, Result};
use crate::report::{ImportReport, TruncationWarning};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::time::Instant;

/// 默认的索引表空间（仅支持表空间的目标使用）
pub const DEFAULT_INDEX_TABLESPACE: &str = "pg_default";

/// 一次导入的运行参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// 目标 schema
    pub schema: String,
    /// 导入前删除同名的视图和表
    pub drop_existing: bool,
    /// 插入时不绑定的列名（大小写不敏感），对应列取目标库默认值
    pub skip_columns: Vec<String>,
    /// 索引表空间，`None` 时不输出表空间子句
    pub index_tablespace: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            schema: "main".to_string(),
            drop_existing: false,
            skip_columns: Vec::new(),
            index_tablespace: Some(DEFAULT_INDEX_TABLESPACE.to_string()),
        }
    }
}

impl ImportOptions {
    /// 指定 schema，其余取默认值
    #[must_use]
    pub fn for_schema(schema: &str) -> Self {
        Self { schema: schema.to_string(), ..Default::default() }
    }

    fn is_skipped(&self, column: &str) -> bool {
        self.skip_columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// 导入器状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportState {
    /// 头文件已解析，数据未加载
    Parsed,
    /// 所有 unload 文件已加载
    Loaded,
    /// 表和视图已创建
    SchemaCreated,
    /// 所有数据已插入
    DataLoaded,
    /// 索引已创建，导入完成
    IndexesBuilt,
    /// 失败终态
    Failed { phase: Phase, cause: String },
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed => f.write_str("已解析"),
            Self::Loaded => f.write_str("已加载"),
            Self::SchemaCreated => f.write_str("schema 已创建"),
            Self::DataLoaded => f.write_str("数据已插入"),
            Self::IndexesBuilt => f.write_str("索引已创建"),
            Self::Failed { phase, .. } => write!(f, "{phase}阶段失败"),
        }
    }
}

/// schema 导入器
pub struct SchemaImporter {
    model: ExportModel,
    options: ImportOptions,
    state: ImportState,
    report: ImportReport,
}

impl SchemaImporter {
    /// 创建导入器；模型中的数据已全部加载时直接处于 `Loaded` 状态
    #[must_use]
    pub fn new(model: ExportModel, options: ImportOptions) -> Self {
        let state = if !model.tables.is_empty() && model.is_loaded() {
            ImportState::Loaded
        } else {
            ImportState::Parsed
        };
        let mut report = ImportReport::new(&model.database, &options.schema);
        report.dropped_existing = options.drop_existing;
        Self { model, options, state, report }
    }

    #[must_use]
    pub const fn state(&self) -> &ImportState {
        &self.state
    }

    #[must_use]
    pub const fn model(&self) -> &ExportModel {
        &self.model
    }

    #[must_use]
    pub const fn options(&self) -> &ImportOptions {
        &self.options
    }

    #[must_use]
    pub const fn report(&self) -> &ImportReport {
        &self.report
    }

    /// 从导出目录加载全部 unload 文件
    ///
    /// # Errors
    /// 文件缺失、行数不足或取值无法转换时返回错误，导入器进入失败状态
    pub fn load(&mut self, dir: &Path) -> Result<()> {
        self.expect_state(&ImportState::Parsed, "加载数据文件")?;
        if let Err(e) = UnloadFileLoader::load_all(dir, &mut self.model) {
            return Err(self.fail(Phase::Load, e));
        }
        self.state = ImportState::Loaded;
        Ok(())
    }

    /// 删除或检查已有对象，然后建表、创建同义词视图
    ///
    /// # Errors
    /// 目标库执行失败或 schema 非空时返回错误，导入器进入失败状态
    pub fn create_schema(&mut self, target: &mut dyn TargetDatabase) -> Result<()> {
        self.expect_state(&ImportState::Loaded, "创建 schema")?;
        self.report.target = Some(target.info());

        let phase = if self.options.drop_existing {
            Phase::Drop
        } else {
            Phase::EmptinessCheck
        };
        let result = if self.options.drop_existing {
            self.drop_existing(target)
        } else {
            self.check_empty(target)
        };
        if let Err(e) = result {
            return Err(self.fail(phase, e));
        }

        if let Err(e) = self.create_tables(target) {
            return Err(self.fail(Phase::CreateTables, e));
        }
        if let Err(e) = self.create_views(target) {
            return Err(self.fail(Phase::CreateViews, e));
        }

        self.state = ImportState::SchemaCreated;
        Ok(())
    }

    /// 按声明顺序逐表批量插入数据
    ///
    /// # Errors
    /// 任意一张表插入失败时返回错误，后续表不再插入
    pub fn load_data(&mut self, target: &mut dyn TargetDatabase) -> Result<()> {
        self.expect_state(&ImportState::SchemaCreated, "插入数据")?;
        let dialect = target.dialect();
        for idx in 0..self.model.tables.len() {
            if let Err(e) = self.insert_table(target, dialect, idx) {
                return Err(self.fail(Phase::InsertRows, e));
            }
        }
        self.state = ImportState::DataLoaded;
        Ok(())
    }

    /// 创建普通索引，然后创建唯一索引
    ///
    /// # Errors
    /// 任意索引创建失败时返回错误
    pub fn build_indexes(&mut self, target: &mut dyn TargetDatabase) -> Result<()> {
        self.expect_state(&ImportState::DataLoaded, "创建索引")?;
        let dialect = target.dialect();

        let plain = self.create_indexes(target, dialect, false);
        match plain {
            Ok(n) => self.report.indexes = n,
            Err(e) => return Err(self.fail(Phase::CreateIndexes, e)),
        }
        let unique = self.create_indexes(target, dialect, true);
        match unique {
            Ok(n) => self.report.unique_indexes = n,
            Err(e) => return Err(self.fail(Phase::CreateUniqueIndexes, e)),
        }

        self.state = ImportState::IndexesBuilt;
        self.report.finish();
        tracing::info!("导入完成: {}", self.report);
        Ok(())
    }

    /// 依次执行建 schema、插入数据、建索引三个阶段
    ///
    /// # Errors
    /// 任意阶段失败时返回该阶段的错误
    pub fn run(&mut self, target: &mut dyn TargetDatabase) -> Result<&ImportReport> {
        tracing::info!(
            db = target.name(),
            schema = %self.options.schema,
            drop_existing = self.options.drop_existing,
            "开始导入数据库 {}",
            self.model.database
        );
        self.create_schema(target)?;
        self.load_data(target)?;
        self.build_indexes(target)?;
        Ok(&self.report)
    }

    /// 取出报告
    #[must_use]
    pub fn into_report(self) -> ImportReport {
        self.report
    }

    fn expect_state(&self, expected: &ImportState, operation: &str) -> Result<()> {
        if let ImportState::Failed { phase, cause } = &self.state {
            return Err(ImportError::State(format!(
                "导入已在{phase}阶段失败 ({cause})，不能继续{operation}"
            )));
        }
        if &self.state != expected {
            return Err(ImportError::State(format!(
                "当前状态为{}，不能{operation}，需要状态{expected}",
                self.state
            )));
        }
        Ok(())
    }

    fn fail(&mut self, phase: Phase, error: ImportError) -> ImportError {
        tracing::error!(%phase, "导入失败: {}", error);
        self.state = ImportState::Failed { phase, cause: error.to_string() };
        error
    }

    fn qualify(&self, dialect: Dialect, name: &str) -> String {
        dialect.qualify(&self.options.schema, name)
    }

    fn drop_existing(&self, target: &mut dyn TargetDatabase) -> Result<()> {
        let dialect = target.dialect();
        let schema = &self.options.schema;
        for view in self.model.synonyms.keys() {
            target
                .execute(&dialect.drop_view_statement(schema, view))
                .map_err(|e| e.in_phase(Phase::Drop, view))?;
        }
        for table in &self.model.tables {
            target
                .execute(&dialect.drop_table_statement(schema, &table.table_name))
                .map_err(|e| e.in_phase(Phase::Drop, &table.table_name))?;
        }
        tracing::info!(
            views = self.model.synonyms.len(),
            tables = self.model.tables.len(),
            "已删除 schema {} 中的已有对象",
            schema
        );
        Ok(())
    }

    fn check_empty(&self, target: &mut dyn TargetDatabase) -> Result<()> {
        let schema = &self.options.schema;
        let tables = target
            .list_tables(schema)
            .map_err(|e| e.in_phase(Phase::EmptinessCheck, schema))?;
        if !tables.is_empty() {
            tracing::error!(?tables, "目标 schema {} 非空", schema);
            return Err(ImportError::SchemaNotEmpty {
                schema: schema.clone(),
                tables,
            });
        }
        Ok(())
    }

    fn create_tables(&self, target: &mut dyn TargetDatabase) -> Result<()> {
        let dialect = target.dialect();
        for table in &self.model.tables {
            let sql = table.create_statement(&self.qualify(dialect, &table.table_name));
            target
                .execute(&sql)
                .map_err(|e| e.in_phase(Phase::CreateTables, &table.table_name))?;
        }
        tracing::info!("已创建 {} 张表", self.model.tables.len());
        Ok(())
    }

    fn create_views(&mut self, target: &mut dyn TargetDatabase) -> Result<()> {
        let dialect = target.dialect();
        for (view, table) in &self.model.synonyms {
            let sql =
                dialect.create_view_statement(&self.options.schema, view, table);
            target
                .execute(&sql)
                .map_err(|e| e.in_phase(Phase::CreateViews, view))?;
            self.report.views.push(view.clone());
        }
        if !self.model.synonyms.is_empty() {
            tracing::info!("已创建 {} 个同义词视图", self.model.synonyms.len());
        }
        Ok(())
    }

    fn insert_table(
        &mut self,
        target: &mut dyn TargetDatabase,
        dialect: Dialect,
        idx: usize,
    ) -> Result<()> {
        let start = Instant::now();
        let table = &self.model.tables[idx];
        let qualified = dialect.qualify(&self.options.schema, &table.table_name);

        let columns: Vec<(usize, &FieldDefinition)> = table
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !self.options.is_skipped(&f.field_name))
            .collect();
        if columns.is_empty() {
            return Err(ImportError::config(format!(
                "表 {} 的所有列都被 skip_columns 排除",
                table.table_name
            )));
        }
        let bindings: Vec<(&str, BindKind)> = columns
            .iter()
            .map(|(_, f)| (f.field_name.as_str(), f.field_type.bind_kind()))
            .collect();
        let kinds: Vec<BindKind> = bindings.iter().map(|(_, k)| *k).collect();
        let sql = dialect.insert_statement(&qualified, &bindings);

        if dialect.supports_unlogged() {
            target
                .set_logged(&qualified, false)
                .map_err(|e| e.in_phase(Phase::InsertRows, &table.table_name))?;
        }

        let mut warnings = Vec::new();
        let inserted = {
            let mut rows = table.rows().iter().enumerate().map(|(n, row)| {
                columns
                    .iter()
                    .map(|(i, field)| {
                        let value = row.get(*i).unwrap_or(&Value::Null);
                        fit_value(table, field, value, n + 1, &mut warnings)
                    })
                    .collect::<Vec<_>>()
            });
            target
                .bulk_insert(&sql, &kinds, &mut rows)
                .map_err(|e| e.in_phase(Phase::InsertRows, &table.table_name))?
        };

        if dialect.supports_unlogged() {
            target
                .set_logged(&qualified, true)
                .map_err(|e| e.in_phase(Phase::InsertRows, &table.table_name))?;
        }

        tracing::info!(
            table = %table.table_name,
            rows = inserted,
            elapsed_ms = start.elapsed().as_millis(),
            "表数据插入完成"
        );
        let name = table.table_name.clone();
        self.report.add_table(&name, inserted, start.elapsed());
        self.report.warnings.extend(warnings);
        Ok(())
    }

    fn create_indexes(
        &self,
        target: &mut dyn TargetDatabase,
        dialect: Dialect,
        unique: bool,
    ) -> Result<usize> {
        let (indexes, phase) = if unique {
            (&self.model.unique_indexes, Phase::CreateUniqueIndexes)
        } else {
            (&self.model.indexes, Phase::CreateIndexes)
        };
        for index in indexes {
            let sql = index.create_statement(
                dialect,
                &self.options.schema,
                self.options.index_tablespace.as_deref(),
            );
            target
                .execute(&sql)
                .map_err(|e| e.in_phase(phase, &index.index_name))?;
        }
        if !indexes.is_empty() {
            tracing::info!("{}: 已创建 {} 个", phase, indexes.len());
        }
        Ok(indexes.len())
    }
}

/// 超出列长度的字符串按列长度截断，并记录警告
fn fit_value(
    table: &TableDefinition,
    field: &FieldDefinition,
    value: &Value,
    row: usize,
    warnings: &mut Vec<TruncationWarning>,
) -> Value {
    let Value::Text(text) = value else {
        return value.clone();
    };
    match field.fit_text(text) {
        Cow::Borrowed(_) => value.clone(),
        Cow::Owned(truncated) => {
            tracing::warn!(
                table = %table.table_name,
                column = %field.field_name,
                row,
                "字符串超出列长度 {}，已截断: {:?} → {:?}",
                field.length(),
                text,
                truncated
            );
            warnings.push(TruncationWarning {
                table: table.table_name.clone(),
                column: field.field_name.clone(),
                row,
                original: text.clone(),
                truncated: truncated.clone(),
            });
            Value::Text(truncated)
        }
    }
}
