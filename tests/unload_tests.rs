//! unload 数据文件加载集成测试

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use dbexport_import::ImportError;
use dbexport_import::dbexport::Value;
use dbexport_import::process::parse_and_load;
use tempfile::TempDir;

#[test]
fn test_load_multiline_and_escaped_records() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::inventory_export(&temp_dir);

    let model = parse_and_load(&export).expect("Failed to load export");
    assert!(model.is_loaded());
    assert_eq!(model.total_rows(), 5);

    let items = model.table("items").expect("items table");
    assert_eq!(items.rows().len(), 3);

    let first = items.rows()[0].values();
    assert_eq!(first[0], Value::Integer(1));
    assert_eq!(first[1], Value::Text("AB1".to_string()));
    assert_eq!(first[2], Value::Integer(5));
    assert_eq!(first[3], Value::Double(12.5));
    assert_eq!(
        first[4],
        Value::Date(NaiveDate::from_ymd_opt(2020, 1, 31).expect("valid date"))
    );
    assert_eq!(
        first[5],
        Value::Timestamp(
            NaiveDateTime::parse_from_str("2020-01-31 08:00:00", "%Y-%m-%d %H:%M:%S")
                .expect("valid timestamp")
        )
    );

    // 第二条记录跨两个物理行，转义的换行被还原
    let second = items.rows()[1].values();
    assert_eq!(second[2], Value::Null);
    assert_eq!(second[6], Value::Text("first line\nsecond line".to_string()));

    // 第三条记录含转义的分隔符，空字段为 NULL
    let third = items.rows()[2].values();
    assert_eq!(third[3], Value::Null);
    assert_eq!(third[4], Value::Null);
    assert_eq!(third[6], Value::Text(" pipe | inside".to_string()));
}

#[test]
fn test_crlf_line_endings() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::inventory_export(&temp_dir);

    let model = parse_and_load(&export).expect("Failed to load export");
    let movements = model.table("movements").expect("movements table");
    assert_eq!(movements.rows().len(), 2);
    assert_eq!(movements.rows()[0].values()[0], Value::BigInt(9_000_000_000));
    assert_eq!(movements.rows()[0].values()[2], Value::Text("in".to_string()));
    // 加载阶段不截断，超长字符串在插入时处理
    assert_eq!(
        movements.rows()[1].values()[2],
        Value::Text("outgoing stock".to_string())
    );
}

#[test]
fn test_fewer_records_than_declared() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", "1|alpha|\n")],
    );

    let err = parse_and_load(&export).unwrap_err();
    assert!(err.is_consistency_error());
    assert!(
        err.to_string()
            .contains("widge00100.unl has 1 lines, but widgets indicates it should have 2 rows"),
        "unexpected message: {err}"
    );
}

#[test]
fn test_more_records_than_declared_are_loaded() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", "1|alpha|\n2|beta|\n3|gamma|\n")],
    );

    let model = parse_and_load(&export).expect("Failed to load export");
    assert_eq!(model.total_rows(), 3);
}

#[test]
fn test_value_error_reports_line() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", "1|alpha|\nx2|beta|\n")],
    );

    let err = parse_and_load(&export).unwrap_err();
    assert!(err.is_value_error());
    match err {
        ImportError::Row { table, file, line, .. } => {
            assert_eq!(table, "widgets");
            assert_eq!(file, "widge00100.unl");
            assert_eq!(line, 2);
        }
        other => panic!("expected row error, got {other:?}"),
    }
}

#[test]
fn test_trailing_partial_record_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", "1|alpha|\n2|beta|\n3|unfinished\n")],
    );

    let err = parse_and_load(&export).unwrap_err();
    match err {
        ImportError::Row { line, source, .. } => {
            assert_eq!(line, 3);
            assert!(source.is_consistency_error());
        }
        other => panic!("expected row error, got {other:?}"),
    }
}

#[test]
fn test_missing_unload_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(&temp_dir, common::WIDGETS_HEADER, &[]);

    let err = parse_and_load(&export).unwrap_err();
    assert!(err.is_consistency_error());
    assert!(err.to_string().contains("widge00100.unl"));
}

#[test]
fn test_unreferenced_unload_file_is_ignored() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", common::WIDGETS_DATA), ("stray00999.unl", "junk|\n")],
    );

    let model = parse_and_load(&export).expect("Failed to load export");
    assert_eq!(model.total_rows(), 2);
}

#[test]
fn test_unexpected_file_in_export_dir() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", common::WIDGETS_DATA), ("notes.txt", "hello")],
    );

    let err = parse_and_load(&export).unwrap_err();
    assert!(err.is_consistency_error());
    assert!(err.to_string().contains("notes.txt"));
}

#[test]
fn test_invalid_utf8_is_decoded_per_line() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(&temp_dir, common::WIDGETS_HEADER, &[]);
    std::fs::write(export.join("widge00100.unl"), b"1|caf\xe9|\n2|beta|\n")
        .expect("Failed to write unload file");

    let model = parse_and_load(&export).expect("Failed to load export");
    let widgets = model.table("widgets").expect("widgets table");
    assert_eq!(widgets.rows().len(), 2);
    assert_eq!(
        widgets.rows()[0].values()[1],
        Value::Text("caf\u{FFFD}".to_string())
    );
    assert_eq!(widgets.rows()[1].values()[1], Value::Text("beta".to_string()));
}

#[test]
fn test_trailing_blank_lines_are_ignored() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", "1|alpha|\n2|beta|\n\n\r\n")],
    );

    let model = parse_and_load(&export).expect("Failed to load export");
    assert_eq!(model.total_rows(), 2);
}

#[test]
fn test_fragment_does_not_count_as_row() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", "1|alpha|\n2|beta")],
    );

    let err = parse_and_load(&export).unwrap_err();
    assert!(err.is_consistency_error());
    assert!(
        err.to_string()
            .contains("widge00100.unl has 1 lines, but widgets indicates it should have 2 rows"),
        "unexpected message: {err}"
    );
}

#[test]
fn test_unterminated_last_field_is_named() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let export = common::write_export(
        &temp_dir,
        common::WIDGETS_HEADER,
        &[("widge00100.unl", "1|alpha|\n2|beta|\n3|gamma")],
    );

    let err = parse_and_load(&export).unwrap_err();
    match err {
        ImportError::Row { line, source, .. } => {
            assert_eq!(line, 3);
            assert!(source.to_string().contains("缺少结尾分隔符"), "{source}");
        }
        other => panic!("expected row error, got {other:?}"),
    }
}
