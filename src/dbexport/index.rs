//! 索引声明的解析与渲染

use crate::database::Dialect;
use crate::dbexport::utils::{ParseCursor, strip_qualifier};
use crate::error::Result;
use serde::Serialize;

/// 头文件中出现的索引声明种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Index,
    ClusterIndex,
    UniqueIndex,
    UniqueClusterIndex,
}

impl IndexKind {
    /// 按匹配优先级排列的全部种类
    pub const ALL: [Self; 4] = [
        Self::Index,
        Self::ClusterIndex,
        Self::UniqueIndex,
        Self::UniqueClusterIndex,
    ];

    /// 声明行的关键字前缀
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Index => "create index ",
            Self::ClusterIndex => "create cluster index ",
            Self::UniqueIndex => "create unique index ",
            Self::UniqueClusterIndex => "create unique cluster index ",
        }
    }

    /// 错误信息中使用的构造名称
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::ClusterIndex => "cluster index",
            Self::UniqueIndex => "unique index",
            Self::UniqueClusterIndex => "unique cluster index",
        }
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        matches!(self, Self::UniqueIndex | Self::UniqueClusterIndex)
    }

    #[must_use]
    pub const fn is_clustered(&self) -> bool {
        matches!(self, Self::ClusterIndex | Self::UniqueClusterIndex)
    }

    /// 根据行首匹配索引种类
    #[must_use]
    pub fn detect(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| line.starts_with(kind.prefix()))
    }
}

/// 索引定义（普通或唯一）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDefinition {
    pub index_name: String,
    pub table_name: String,
    /// 组合键的列顺序
    pub field_names: Vec<String>,
    pub unique: bool,
    pub clustered: bool,
}

/// 唯一索引与普通索引共用同一结构，`unique` 为 true
pub type UniqueIndexDefinition = IndexDefinition;

impl IndexDefinition {
    /// 解析去掉关键字前缀后的声明，形如
    /// `<index-name> on "<db>".<table>(<col1>,<col2>,...)`。
    pub fn parse(
        decl: &str,
        kind: IndexKind,
        database: &str,
        cursor: &ParseCursor,
    ) -> Result<Self> {
        let label = kind.label();

        let Some(on_pos) = decl.find(" on ") else {
            return Err(cursor.error(format!("{label} 声明缺少 \" on \": {decl}")));
        };
        let index_name = strip_qualifier(decl[..on_pos].trim(), database);

        let after_on = on_pos + " on ".len();
        let Some(open_rel) = decl[after_on..].find('(') else {
            return Err(cursor.error(format!("{label} 声明缺少 '(': {decl}")));
        };
        let open = after_on + open_rel;
        let table_name = strip_qualifier(decl[after_on..open].trim(), database);

        let Some(close_rel) = decl[open..].find(')') else {
            return Err(cursor.error(format!("{label} 声明缺少 ')': {decl}")));
        };
        let close = open + close_rel;

        let field_names: Vec<String> = decl[open + 1..close]
            .split(',')
            .map(|col| {
                // 带排序方向的列只保留列名
                col.split_whitespace().next().unwrap_or("").to_string()
            })
            .collect();

        if index_name.is_empty()
            || table_name.is_empty()
            || field_names.iter().any(String::is_empty)
        {
            return Err(cursor.error(format!("{label} 声明不完整: {decl}")));
        }

        tracing::trace!(
            line = cursor.line_number(),
            index = index_name,
            table = table_name,
            ?field_names,
            "解析{}声明",
            label
        );

        Ok(Self {
            index_name: index_name.to_string(),
            table_name: table_name.to_string(),
            field_names,
            unique: kind.is_unique(),
            clustered: kind.is_clustered(),
        })
    }

    /// 渲染目标库的 `CREATE [UNIQUE] INDEX` 语句，列顺序与声明一致
    #[must_use]
    pub fn create_statement(
        &self,
        dialect: Dialect,
        schema: &str,
        tablespace: Option<&str>,
    ) -> String {
        let unique = if self.unique { "UNIQUE " } else { "" };
        let (index, table) = dialect.index_target(
            schema,
            &self.index_name,
            &self.table_name,
        );
        let mut sql = format!(
            "CREATE {unique}INDEX {index} ON {table} ({})",
            self.field_names.join(",")
        );
        if let Some(ts) = tablespace.filter(|_| dialect.supports_tablespaces())
        {
            sql.push_str(" TABLESPACE ");
            sql.push_str(ts);
        }
        sql.push(';');
        sql
    }
}
