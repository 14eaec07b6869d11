//! 集成测试公共模块

use dbexport_import::database::{
    DatabaseMode, DatabaseType, Dialect, TargetDatabase, TargetInfo,
};
use dbexport_import::dbexport::{BindKind, Value};
use dbexport_import::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 标准测试头文件：一张表、一个同义词、一个索引和一个跨行的唯一索引
#[allow(dead_code)]
pub const WIDGETS_HEADER: &str = r#"{ DATABASE demo  delimiter | }

grant dba to "informix";

{ TABLE "demo".widgets row size = 14 number of columns = 2 index size = 9 }

{ unload file name = widge00100.unl number of rows = 2 }

create table "demo".widgets
  (
    id integer not null ,
    name varchar(10)
  );

revoke all on "demo".widgets from "public" as "informix";

create synonym "demo".gadgets for "demo".widgets;

create index "demo".ix_name on "demo".widgets (name) using btree ;
create unique index "demo".ux_id on "demo".widgets
    (id) using btree ;
"#;

/// 与 `WIDGETS_HEADER` 对应的两行数据
#[allow(dead_code)]
pub const WIDGETS_DATA: &str = "1|alpha|\n2|beta|\n";

/// 覆盖所有列类型的头文件，两张表
#[allow(dead_code)]
pub const INVENTORY_HEADER: &str = r#"{ DATABASE stock  delimiter | }

{ TABLE "stock".items row size = 120 number of columns = 7 index size = 0 }
{ unload file name = items00100.unl number of rows = 3 }

create table "stock".items
  (
    item_no serial not null ,
    code char(3) not null ,
    qty smallint,
    weight decimal(8,2),
    received date,
    updated datetime year to second,
    note text
  );

{ TABLE "stock".movements row size = 30 number of columns = 3 index size = 0 }
{ unload file name = movem00101.unl number of rows = 2 }

create table "stock".movements
  (
    movement_id bigint not null ,
    item_no integer,
    memo varchar(8)
  );

create synonym "stock".moves for "stock".movements;

create cluster index "stock".ix_mv_item on "stock".movements (item_no,movement_id) using btree ;
create unique cluster index "stock".ux_items on "stock".items (code) using btree ;
"#;

/// `items` 表数据：第二条记录的 note 跨两行，第三条含转义的分隔符
#[allow(dead_code)]
pub const ITEMS_DATA: &str = "1|AB1|5|12.50|01/31/2020|2020-01-31 08:00:00|plain|\n\
2|CD2||0.75|02/29/2020|2020-02-29 23:59:59|first line\\\n\
second line|\n\
3|EF3|7|||| pipe \\| inside|\n";

/// `movements` 表数据
#[allow(dead_code)]
pub const MOVEMENTS_DATA: &str = "9000000000|1|in|\r\n9000000001|3|outgoing stock|\r\n";

/// 在临时目录下创建导出目录，写入头文件和数据文件
#[allow(dead_code)]
pub fn write_export(
    dir: &TempDir,
    header: &str,
    unload_files: &[(&str, &str)],
) -> PathBuf {
    let export = dir.path().join("demo.exp");
    fs::create_dir_all(&export).expect("Failed to create export dir");
    fs::write(export.join("demo.sql"), header).expect("Failed to write header");
    for (name, content) in unload_files {
        fs::write(export.join(name), content).expect("Failed to write unload file");
    }
    export
}

/// 标准的 widgets 导出目录
#[allow(dead_code)]
pub fn widgets_export(dir: &TempDir) -> PathBuf {
    write_export(dir, WIDGETS_HEADER, &[("widge00100.unl", WIDGETS_DATA)])
}

/// inventory 导出目录
#[allow(dead_code)]
pub fn inventory_export(dir: &TempDir) -> PathBuf {
    write_export(
        dir,
        INVENTORY_HEADER,
        &[("items00100.unl", ITEMS_DATA), ("movem00101.unl", MOVEMENTS_DATA)],
    )
}

/// 验证文件存在且非空
#[allow(dead_code)]
pub fn verify_output_file_exists(path: &Path) -> bool {
    path.exists() && fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// 只记录语句的目标库，用于检查语句顺序
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingTarget {
    pub statements: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TargetDatabase for RecordingTarget {
    fn name(&self) -> &str {
        "recording"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.statements.push(sql.to_string());
        Ok(())
    }

    fn list_tables(&mut self, _schema: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn bulk_insert(
        &mut self,
        sql: &str,
        _kinds: &[BindKind],
        rows: &mut dyn Iterator<Item = Vec<Value>>,
    ) -> Result<usize> {
        self.statements.push(sql.to_string());
        let before = self.rows.len();
        self.rows.extend(rows);
        Ok(self.rows.len() - before)
    }

    fn info(&self) -> TargetInfo {
        TargetInfo::new(DatabaseType::Postgres, DatabaseMode::InMemory)
    }
}
