// ==========================================
// ImportApi 端到端测试
// ==========================================
// 测试目标: 宿主接口 preview → apply 全流程、错误映射
// ==========================================


use health_tracker::config::config_keys;
use health_tracker::domain::SubmittedRow;
use health_tracker::{ApiError, ApplyInput, ImportApi, ImportMode, ImportSchema, RowStatus};
use test_helpers::{count_rows, create_test_db, query_text, set_config};

#[test]
fn test_preview_then_apply_rows() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(db_path.clone());

    let csv = "Fecha;Pasos;Peso\n2026-03-01;9500;74,2\n2026-03-02;;\n";
    let preview = api.preview("checkins", csv.as_bytes()).unwrap();
    assert_eq!(preview.report.mode, ImportMode::Preview);
    assert_eq!(preview.report.schema, ImportSchema::Checkin);
    assert_eq!(preview.report.summary.valid, 2);
    assert_eq!(count_rows(&db_path, "checkin_log"), 0);

    let rows: Vec<SubmittedRow> = preview.report.rows.iter().map(SubmittedRow::from).collect();
    let applied = api.apply("checkin", ApplyInput::Rows(rows)).unwrap();
    assert_eq!(applied.report.mode, ImportMode::Apply);
    assert_eq!(applied.report.summary.imported, 2);
    assert!(applied.report.batch_id.is_some());
    assert_eq!(count_rows(&db_path, "checkin_log"), 2);

    // 重复导入 → conflict
    let again = api
        .apply("checkin", ApplyInput::Text(csv.as_bytes().to_vec()))
        .unwrap();
    assert_eq!(again.report.summary.conflict, 2);
    assert!(again
        .report
        .rows
        .iter()
        .all(|r| r.status == RowStatus::Conflict));
}

#[test]
fn test_latin1_upload() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(db_path.clone());

    let bytes = b"fecha,sue\xF1o\n2026-03-01,7.5\n";
    let applied = api
        .apply("checkin", ApplyInput::Text(bytes.to_vec()))
        .unwrap();
    assert_eq!(applied.report.summary.imported, 1);
    assert_eq!(
        query_text(&db_path, "SELECT CAST(sleep_hours AS TEXT) FROM checkin_log"),
        Some("7.5".to_string())
    );
}

#[test]
fn test_error_mapping() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(db_path.clone());

    assert!(matches!(
        api.preview("medals", b"log_date\n2026-03-01\n"),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        api.preview("plan_session", b"log_date,session_type\n2026-03-01,pesas\n"),
        Err(ApiError::MissingColumns(cols)) if cols == vec!["plan_session_id"]
    ));
    assert!(matches!(
        api.preview("checkin", b""),
        Err(ApiError::ImportError(_))
    ));
    assert!(matches!(
        api.apply("checkin", ApplyInput::Rows(Vec::new())),
        Err(ApiError::ImportError(_))
    ));

    set_config(&db_path, config_keys::MAX_FILE_BYTES, "16");
    match api.preview("checkin", b"log_date\n2026-03-01\n2026-03-02\n") {
        Err(ApiError::FileTooLarge { size, limit }) => {
            assert_eq!(size, 31);
            assert_eq!(limit, 16);
        }
        other => panic!("expected FileTooLarge, got {:?}", other.map(|r| r.report)),
    }
}

#[test]
fn test_template_and_columns() {
    let api = ImportApi::new(String::new());

    let template = api.template("plan_diet").unwrap();
    let header = template.lines().next().unwrap();
    let columns = api.accepted_columns("plan_diet").unwrap();
    assert_eq!(header, columns.join(","));

    assert!(matches!(api.template("nope"), Err(ApiError::InvalidInput(_))));
}

#[test]
fn test_response_json_shape() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(db_path);

    let response = api.preview("checkin", b"log_date\n2026-03-01\n").unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["schema"], "checkin");
    assert_eq!(json["mode"], "preview");
    assert_eq!(json["summary"]["total"], 1);
    assert_eq!(json["rows"][0]["line_number"], 2);
    assert!(json.get("elapsed_ms").is_some());
    assert!(json.get("batch_id").is_none());
}
