use crate::dbexport::field::{FieldDefinition, Value};
use crate::dbexport::index::IndexDefinition;
use crate::error::{ImportError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// unload 文件默认的字段分隔符
pub const DEFAULT_DELIMITER: char = '|';

/// 一行数据：按列顺序排列的取值，长度等于表的列数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }
}

/// 表定义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDefinition {
    pub table_name: String,
    /// 相对导出目录的 unload 文件名
    pub unload_file: String,
    /// 头文件声明的行数
    pub num_rows: usize,
    fields: Vec<FieldDefinition>,
    /// 最长列名的宽度，用于对齐渲染的 DDL
    name_width: usize,
    rows: Vec<Row>,
    loaded: bool,
}

impl TableDefinition {
    /// 创建表定义，`fields` 不能为空
    pub fn new(
        table_name: &str,
        unload_file: &str,
        num_rows: usize,
        fields: Vec<FieldDefinition>,
    ) -> Result<Self> {
        if fields.is_empty() {
            return Err(ImportError::consistency(format!(
                "表 {table_name} 没有任何列定义"
            )));
        }
        let name_width = fields
            .iter()
            .map(|f| f.field_name.chars().count())
            .max()
            .unwrap_or(0);
        Ok(Self {
            table_name: table_name.to_string(),
            unload_file: unload_file.to_string(),
            num_rows,
            fields,
            name_width,
            rows: Vec::new(),
            loaded: false,
        })
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// 最长列名的字符数
    #[must_use]
    pub const fn name_width(&self) -> usize {
        self.name_width
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// 数据是否已从 unload 文件加载
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// 写入加载好的数据，每张表只允许一次
    pub(crate) fn set_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        if self.loaded {
            return Err(ImportError::consistency(format!(
                "表 {} 的数据已经加载过",
                self.table_name
            )));
        }
        self.rows = rows;
        self.loaded = true;
        Ok(())
    }

    /// 渲染 `CREATE TABLE` 语句，列按声明顺序排列并对齐
    #[must_use]
    pub fn create_statement(&self, qualified_name: &str) -> String {
        let columns: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("    {}", f.column_clause(self.name_width)))
            .collect();
        format!("CREATE TABLE {qualified_name} (\n{}\n);", columns.join(",\n"))
    }
}

/// 导出目录解析出的完整模型
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportModel {
    pub database: String,
    pub delimiter: char,
    pub tables: Vec<TableDefinition>,
    /// 同义词 → 表名
    pub synonyms: BTreeMap<String, String>,
    pub indexes: Vec<IndexDefinition>,
    pub unique_indexes: Vec<IndexDefinition>,
}

impl Default for ExportModel {
    fn default() -> Self {
        Self {
            database: String::new(),
            delimiter: DEFAULT_DELIMITER,
            tables: Vec::new(),
            synonyms: BTreeMap::new(),
            indexes: Vec::new(),
            unique_indexes: Vec::new(),
        }
    }
}

impl ExportModel {
    /// 按名称查找表
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.table_name == name)
    }

    /// 所有表的数据是否都已加载
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.tables.iter().all(TableDefinition::is_loaded)
    }

    /// 已加载的总行数
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbexport::field::FieldType;

    fn field(name: &str, field_type: FieldType, required: bool) -> FieldDefinition {
        FieldDefinition { field_name: name.to_string(), field_type, required }
    }

    #[test]
    fn test_table_requires_fields() {
        let err = TableDefinition::new("widgets", "w.unl", 0, vec![]).unwrap_err();
        assert!(err.is_consistency_error());
    }

    #[test]
    fn test_create_statement_alignment() {
        let table = TableDefinition::new(
            "widgets",
            "widge00100.unl",
            2,
            vec![
                field("id", FieldType::Integer, true),
                field("name", FieldType::Varchar { length: 10 }, false),
            ],
        )
        .unwrap();
        assert_eq!(table.name_width(), 4);
        assert_eq!(
            table.create_statement("app.widgets"),
            "CREATE TABLE app.widgets (\n    id   integer NOT NULL,\n    name varchar(10)\n);"
        );
    }

    #[test]
    fn test_rows_set_once() {
        let mut table = TableDefinition::new(
            "t",
            "t.unl",
            1,
            vec![field("a", FieldType::Integer, false)],
        )
        .unwrap();
        assert!(!table.is_loaded());
        table.set_rows(vec![Row::new(vec![Value::Integer(1)])]).unwrap();
        assert!(table.is_loaded());
        assert!(table.set_rows(vec![]).is_err());
    }
}
