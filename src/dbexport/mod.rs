//! dbexport 导出目录模型
//!
//! 该模块负责导出目录的读取侧：
//! - 头文件（`.sql`）的行级解析，得到表、同义词、索引定义
//! - unload 数据文件的多行拼接、转义处理与取值转换
//!
//! 解析与加载都在修改目标数据库之前完成，任何错误都会中止整个导入。

pub mod field;
pub mod index;
pub mod parser;
pub mod types;
pub mod unload;
pub mod utils;

pub use field::{BindKind, FieldDefinition, FieldType, Value};
pub use index::{IndexDefinition, IndexKind, UniqueIndexDefinition};
pub use parser::ExportParser;
pub use types::{DEFAULT_DELIMITER, ExportModel, Row, TableDefinition};
pub use unload::{UnloadFileLoader, count_unescaped_delimiters};
pub use utils::ParseCursor;
