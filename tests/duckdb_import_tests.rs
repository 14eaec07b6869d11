//! DuckDB 目标端到端导入测试

mod common;

#[cfg(feature = "target-duckdb")]
mod duckdb_import_tests {
    use super::common;
    use dbexport_import::ImportOptions;
    use dbexport_import::database::{DatabaseType, DuckDbTarget, TargetDatabase};
    use dbexport_import::process::import_export_dir;
    use tempfile::TempDir;

    #[test]
    fn test_import_widgets_into_duckdb() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let export = common::widgets_export(&temp_dir);
        let mut target = DuckDbTarget::open_in_memory().expect("Failed to open DuckDB");

        let report = import_export_dir(&export, &mut target, &ImportOptions::default())
            .expect("Import failed");
        assert_eq!(report.total_rows(), 2);
        assert_eq!(
            report.target.as_ref().map(|t| t.db_type),
            Some(DatabaseType::DuckDb)
        );

        let names: Vec<String> = {
            let mut stmt = target
                .connection()
                .prepare("SELECT name FROM main.gadgets ORDER BY id")
                .expect("Failed to prepare");
            stmt.query_map([], |r| r.get::<_, String>(0))
                .expect("Failed to query")
                .collect::<Result<Vec<_>, _>>()
                .expect("Failed to read rows")
        };
        assert_eq!(names, vec!["alpha", "beta"]);

        assert_eq!(
            target.list_tables("main").expect("Failed to list tables"),
            vec!["widgets"]
        );
    }

    #[test]
    fn test_dates_and_timestamps_are_typed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let export = common::inventory_export(&temp_dir);
        let mut target = DuckDbTarget::open_in_memory().expect("Failed to open DuckDB");

        let report = import_export_dir(&export, &mut target, &ImportOptions::default())
            .expect("Import failed");
        assert_eq!(report.total_rows(), 5);
        assert_eq!(report.warnings.len(), 1);

        let (received, updated): (String, String) = target
            .connection()
            .query_row(
                "SELECT CAST(received AS VARCHAR), CAST(updated AS VARCHAR) \
                 FROM main.items WHERE item_no = 2",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .expect("Failed to query item");
        assert_eq!(received, "2020-02-29");
        assert_eq!(updated, "2020-02-29 23:59:59");
    }
}
