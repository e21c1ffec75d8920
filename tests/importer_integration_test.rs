// ==========================================
// ImportEngine 集成测试
// ==========================================
// 测试目标: 验证完整的导入流程（解析 → 校验 → 对账 → 落库）
// ==========================================


use health_tracker::config::{config_keys, ConfigManager};
use health_tracker::domain::{ParsedRecord, RowOutcome, SubmittedRow};
use health_tracker::importer::conflict_handler::{
    REASON_DUPLICATE, REASON_EXISTS, REASON_NO_PARENT,
};
use health_tracker::importer::import_engine::REASON_REPLACED;
use health_tracker::importer::{template_csv, ImportEngine, ImportError, SchemaCatalog};
use health_tracker::logging;
use health_tracker::repository::ImportRepositoryImpl;
use health_tracker::{ImportMode, ImportSchema, RowStatus};
use test_helpers::{count_rows, create_test_db, open, query_text, set_config};

/// 创建测试用的 ImportEngine 实例
fn create_test_engine(db_path: &str) -> ImportEngine<ImportRepositoryImpl, ConfigManager> {
    let import_repo =
        ImportRepositoryImpl::new(db_path).expect("Failed to create ImportRepository");
    let config = ConfigManager::new(db_path).expect("Failed to create ConfigManager");
    ImportEngine::with_default_stages(import_repo, config)
}

fn statuses(rows: &[RowOutcome]) -> Vec<RowStatus> {
    rows.iter().map(|r| r.status).collect()
}

fn lines(rows: &[RowOutcome]) -> Vec<usize> {
    rows.iter().map(|r| r.line_number).collect()
}

// ==========================================
// 对账分类
// ==========================================

#[test]
fn test_checkin_conflict_duplicate_and_bad_date() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    engine
        .apply_text(ImportSchema::Checkin, "log_date\n2026-03-01\n")
        .unwrap();

    let text = "log_date,steps\n2026-03-01,100\n2026-03-02,200\nbad-date,1\n2026-03-02,300\n";
    let report = engine.preview(ImportSchema::Checkin, text).unwrap();

    assert_eq!(
        statuses(&report.rows),
        vec![
            RowStatus::Conflict,
            RowStatus::Valid,
            RowStatus::Invalid,
            RowStatus::Invalid
        ]
    );
    assert_eq!(lines(&report.rows), vec![2, 3, 4, 5]);
    assert_eq!(report.rows[0].reasons, vec![REASON_EXISTS]);
    assert_eq!(
        report.rows[2].reasons,
        vec!["log_date: invalid date format (expected YYYY-MM-DD)"]
    );
    assert_eq!(report.rows[3].reasons, vec![REASON_DUPLICATE]);
    assert_eq!(report.mode, ImportMode::Preview);
    assert_eq!(report.batch_id, None);

    // 预览不写库
    assert_eq!(count_rows(&db_path, "checkin_log"), 1);
}

#[test]
fn test_partition_sum_excludes_blank_and_hint_rows() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let text = "fecha;pasos\n\n2026-03-01;100\n#nota;x\n;\n2026-03-02;abc\n";
    let report = engine.preview(ImportSchema::Checkin, text).unwrap();

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.partition_sum(), report.summary.total);
    assert_eq!(lines(&report.rows), vec![3, 6]);
    assert_eq!(report.rows[1].reasons, vec!["steps: must be integer"]);
}

#[test]
fn test_semicolon_detected_from_first_line() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let text = "log_date;steps;peso\n2026-03-01;9500;74,2\n";
    let report = engine.preview(ImportSchema::Checkin, text).unwrap();

    assert_eq!(statuses(&report.rows), vec![RowStatus::Valid]);
    match &report.rows[0].record {
        ParsedRecord::Checkin(r) => {
            assert_eq!(r.steps, Some(9500));
            assert_eq!(r.weight_kg, Some(74.2));
        }
        other => panic!("unexpected record: {:?}", other),
    }
}

#[test]
fn test_preview_is_repeatable() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let text = "log_date,sleep_hours,photo_path\n2026-03-01,7,../x.jpg\n2026-03-02,30,\n";
    let first = engine.preview(ImportSchema::Checkin, text).unwrap();
    let second = engine.preview(ImportSchema::Checkin, text).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.summary.warned, 1);
}

// ==========================================
// 文件级错误
// ==========================================

#[test]
fn test_file_level_errors() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    match engine.preview(ImportSchema::Checkin, "  \n\n") {
        Err(ImportError::EmptyInput) => {}
        other => panic!("expected EmptyInput, got {:?}", other),
    }

    match engine.preview(ImportSchema::Checkin, "fecha,date\n2026-03-01,2026-03-01\n") {
        Err(ImportError::DuplicateColumns(cols)) => assert_eq!(cols, vec!["log_date"]),
        other => panic!("expected DuplicateColumns, got {:?}", other),
    }

    match engine.preview(ImportSchema::PlanDiet, "log_date,breakfast\n2026-03-01,x\n") {
        Err(ImportError::MissingRequiredColumns(cols)) => {
            assert!(cols.contains(&"calories_target_kcal".to_string()));
            assert!(!cols.contains(&"breakfast".to_string()));
        }
        other => panic!("expected MissingRequiredColumns, got {:?}", other),
    }
}

// ==========================================
// 训练计划
// ==========================================

#[test]
fn test_combined_class_session_drops_exercises() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let text = "log_date,session_type,exercise1_name,ex_2_name,exercise_2_sets\n\
                2026-03-01,clase,Remo,Press,3\n";
    let report = engine
        .apply_text(ImportSchema::PlanWorkoutCombined, text)
        .unwrap();

    assert_eq!(statuses(&report.rows), vec![RowStatus::Imported]);
    assert_eq!(
        report.rows[0].reasons,
        vec!["2 exercises ignored: only applicable to strength sessions"]
    );
    assert_eq!(report.summary.warned, 1);
    assert_eq!(count_rows(&db_path, "plan_day_workout_exercise"), 0);
    assert_eq!(
        query_text(&db_path, "SELECT plan_session_id FROM plan_day_workout_session"),
        Some("S01".to_string())
    );
}

#[test]
fn test_combined_session_ids_per_date() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let text = "fecha,tipo_sesion,exercise_1_name,exercise_1_sets\n\
                2026-03-01,pesas,Remo,3\n\
                2026-03-02,mixta,Press,4\n\
                2026-03-01,pesas,Sentadilla,5\n";
    let report = engine
        .apply_text(ImportSchema::PlanWorkoutCombined, text)
        .unwrap();
    assert_eq!(report.summary.imported, 3);

    let conn = open(&db_path);
    let mut stmt = conn
        .prepare(
            "SELECT log_date, plan_session_id, session_type FROM plan_day_workout_session
             ORDER BY log_date, plan_session_id",
        )
        .unwrap();
    let stored: Vec<(String, String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(
        stored,
        vec![
            ("2026-03-01".into(), "S01".into(), "pesas".into()),
            ("2026-03-01".into(), "S02".into(), "pesas".into()),
            ("2026-03-02".into(), "S01".into(), "pesas".into()),
        ]
    );
    assert_eq!(count_rows(&db_path, "plan_day_workout_exercise"), 3);
}

#[test]
fn test_reps_min_greater_than_max_is_one_error() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let text = "log_date,plan_session_id,exercise_order,exercise_name,target_reps_min,target_reps_max\n\
                2026-03-01,A,1,Remo,9,5\n";
    let report = engine.preview(ImportSchema::PlanExercise, text).unwrap();

    assert_eq!(statuses(&report.rows), vec![RowStatus::Invalid]);
    assert_eq!(
        report.rows[0].reasons,
        vec!["target_reps_min cannot be greater than target_reps_max"]
    );
}

#[test]
fn test_exercise_requires_parent_and_replaces_children() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let header = "log_date,plan_session_id,exercise_order,exercise_name\n";
    let orphan = engine
        .preview(
            ImportSchema::PlanExercise,
            &format!("{}2026-03-01,A,1,Remo\n", header),
        )
        .unwrap();
    assert_eq!(orphan.rows[0].reasons, vec![REASON_NO_PARENT]);

    engine
        .apply_text(
            ImportSchema::PlanSession,
            "log_date,session_id,session_type\n2026-03-01,A,pesas\n",
        )
        .unwrap();

    let first = engine
        .apply_text(
            ImportSchema::PlanExercise,
            &format!(
                "{}2026-03-01,A,1,Remo\n2026-03-01,A,2,Press\n2026-03-01,A,3,Curl\n",
                header
            ),
        )
        .unwrap();
    assert_eq!(first.summary.imported, 3);
    assert_eq!(count_rows(&db_path, "plan_day_workout_exercise"), 3);

    let second = engine
        .apply_text(
            ImportSchema::PlanExercise,
            &format!("{}2026-03-01,A,1,Hip Thrust\n", header),
        )
        .unwrap();
    assert_eq!(second.summary.imported, 1);
    assert_eq!(second.rows[0].reasons, vec![REASON_REPLACED]);
    assert_eq!(count_rows(&db_path, "plan_day_workout_exercise"), 1);
    assert_eq!(
        query_text(&db_path, "SELECT exercise_name FROM plan_day_workout_exercise"),
        Some("Hip Thrust".to_string())
    );

    // 训练课 upsert 不清空动作
    engine
        .apply_text(
            ImportSchema::PlanSession,
            "log_date,plan_session_id,session_type,notes\n2026-03-01,A,pesas,otra\n",
        )
        .unwrap();
    assert_eq!(count_rows(&db_path, "plan_day_workout_exercise"), 1);
}

// ==========================================
// 营养日幂等
// ==========================================

#[test]
fn test_plan_diet_applied_twice_is_idempotent() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);
    let text = template_csv(&SchemaCatalog::new(), ImportSchema::PlanDiet).unwrap();

    let first = engine.apply_text(ImportSchema::PlanDiet, &text).unwrap();
    let second = engine.apply_text(ImportSchema::PlanDiet, &text).unwrap();

    assert_eq!(statuses(&first.rows), vec![RowStatus::Imported]);
    assert_eq!(statuses(&second.rows), vec![RowStatus::Imported]);
    assert!(first.rows[0].reasons.is_empty());
    assert_eq!(second.rows[0].reasons, vec![REASON_REPLACED]);
    assert_eq!(count_rows(&db_path, "plan_day_diet"), 1);
    assert_eq!(
        query_text(&db_path, "SELECT breakfast FROM plan_day_diet"),
        Some("Huevos + ensalada + arepa".to_string())
    );
    assert_eq!(
        query_text(&db_path, "SELECT source_tag FROM plan_day_diet"),
        Some("manual".to_string())
    );
}

#[test]
fn test_source_tag_from_config() {
    let (_tmp, db_path) = create_test_db().unwrap();
    set_config(&db_path, config_keys::DEFAULT_SOURCE_TAG, "coach");
    let engine = create_test_engine(&db_path);

    engine
        .apply_text(
            ImportSchema::PlanSession,
            "log_date,plan_session_id,session_type\n2026-03-01,A,clase\n",
        )
        .unwrap();
    assert_eq!(
        query_text(&db_path, "SELECT source_tag FROM plan_day_workout_session"),
        Some("coach".to_string())
    );
}

// ==========================================
// apply(rows) 与 apply(text) 一致
// ==========================================

#[test]
fn test_apply_rows_matches_apply_text() {
    let checkin = "log_date,steps,photo_yn,photo_path\n\
                   2026-03-01,100,N,\n\
                   2026-03-02,200,Y,/etc/passwd\n\
                   2026-03-03,abc,N,\n\
                   2026-03-01,300,N,\n";
    let combined = "log_date,session_type,exercise_1_name,exercise_1_sets\n\
                    2026-03-01,pesas,Remo,3\n\
                    2026-03-01,clase,Remo,3\n";

    for (schema, text) in [
        (ImportSchema::Checkin, checkin),
        (ImportSchema::PlanWorkoutCombined, combined),
    ] {
        let (_tmp_a, db_a) = create_test_db().unwrap();
        let (_tmp_b, db_b) = create_test_db().unwrap();
        let engine_a = create_test_engine(&db_a);
        let engine_b = create_test_engine(&db_b);

        let preview = engine_a.preview(schema, text).unwrap();
        let submitted: Vec<SubmittedRow> = preview.rows.iter().map(SubmittedRow::from).collect();
        let from_rows = engine_a.apply_rows(schema, &submitted).unwrap();
        let from_text = engine_b.apply_text(schema, text).unwrap();

        assert_eq!(statuses(&from_rows.rows), statuses(&from_text.rows));
        assert_eq!(lines(&from_rows.rows), lines(&from_text.rows));
        for (a, b) in from_rows.rows.iter().zip(&from_text.rows) {
            assert_eq!(a.reasons, b.reasons);
            assert_eq!(a.record, b.record);
        }
        assert_eq!(from_rows.summary, from_text.summary);
    }
}

#[test]
fn test_apply_rows_with_repeated_line_numbers() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let row = |date: &str, photo_yn: &str| SubmittedRow {
        line_number: 2,
        fields: [
            ("log_date".to_string(), date.to_string()),
            ("photo_yn".to_string(), photo_yn.to_string()),
        ]
        .into_iter()
        .collect(),
    };
    let report = engine
        .apply_rows(
            ImportSchema::Checkin,
            &[row("2026-03-01", "N"), row("2026-03-02", "Y")],
        )
        .unwrap();

    assert_eq!(
        statuses(&report.rows),
        vec![RowStatus::Imported, RowStatus::Imported]
    );
    assert_eq!(report.summary.imported, 2);
    assert_eq!(report.summary.valid, 0);
    assert_eq!(report.summary.warned, 1);
    assert!(report.rows[0].reasons.is_empty());
    assert_eq!(report.rows[1].reasons.len(), 1);
    assert_eq!(count_rows(&db_path, "checkin_log"), 2);
}

#[test]
fn test_apply_rows_empty_is_error() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);
    assert!(matches!(
        engine.apply_rows(ImportSchema::Checkin, &[]),
        Err(ImportError::EmptyInput)
    ));
}

// ==========================================
// 写入失败与落库模式
// ==========================================

const REJECT_TRIGGER: &str = "CREATE TRIGGER reject_day BEFORE INSERT ON checkin_log
     WHEN NEW.log_date = '2026-03-03'
     BEGIN SELECT RAISE(ABORT, 'rechazado'); END;";

const FOUR_DAYS: &str = "log_date\n2026-03-01\n2026-03-02\n2026-03-03\n2026-03-04\n";

#[test]
fn test_best_effort_write_failure_is_row_invalid() {
    let (_tmp, db_path) = create_test_db().unwrap();
    open(&db_path).execute_batch(REJECT_TRIGGER).unwrap();
    let engine = create_test_engine(&db_path);

    let report = engine.apply_text(ImportSchema::Checkin, FOUR_DAYS).unwrap();
    assert_eq!(
        statuses(&report.rows),
        vec![
            RowStatus::Imported,
            RowStatus::Imported,
            RowStatus::Invalid,
            RowStatus::Imported
        ]
    );
    assert!(report.rows[2].reasons[0].contains("rechazado"));
    assert_eq!(count_rows(&db_path, "checkin_log"), 3);
}

#[test]
fn test_atomic_write_failure_rolls_back_file() {
    let (_tmp, db_path) = create_test_db().unwrap();
    open(&db_path).execute_batch(REJECT_TRIGGER).unwrap();
    set_config(&db_path, config_keys::APPLY_MODE, "atomic");
    let engine = create_test_engine(&db_path);

    let report = engine.apply_text(ImportSchema::Checkin, FOUR_DAYS).unwrap();
    assert_eq!(report.summary.invalid, 4);
    assert_eq!(report.summary.imported, 0);
    assert!(report.rows[0].reasons[0].starts_with("rolled back: "));
    assert!(report.rows[2].reasons[0].contains("rechazado"));
    assert!(!report.rows[2].reasons[0].starts_with("rolled back: "));
    assert_eq!(count_rows(&db_path, "checkin_log"), 0);
}

// ==========================================
// 批次审计与照片
// ==========================================

#[test]
fn test_apply_records_batch_and_photo() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);

    let text = "log_date,photo_yn,photo_path\n2026-03-01,N,uploads/progress/a.jpg\n2026-03-02,Y,\n";
    engine.preview(ImportSchema::Checkin, text).unwrap();
    assert_eq!(count_rows(&db_path, "import_batch"), 0);

    let report = engine.apply_text(ImportSchema::Checkin, text).unwrap();
    assert_eq!(report.summary.imported, 2);
    assert_eq!(report.summary.warned, 1);

    let batch_id = report.batch_id.clone().expect("batch id");
    assert_eq!(
        query_text(&db_path, "SELECT batch_id FROM import_batch"),
        Some(batch_id)
    );
    assert_eq!(
        query_text(&db_path, "SELECT path FROM photo_log WHERE log_date = '2026-03-01'"),
        Some("uploads/progress/a.jpg".to_string())
    );
    assert_eq!(
        query_text(&db_path, "SELECT photo_yn FROM checkin_log WHERE log_date = '2026-03-01'"),
        Some("Y".to_string())
    );
    assert_eq!(
        query_text(&db_path, "SELECT photo_yn FROM checkin_log WHERE log_date = '2026-03-02'"),
        None
    );
}

// ==========================================
// 模板可导入
// ==========================================

#[test]
fn test_templates_are_importable() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let engine = create_test_engine(&db_path);
    let catalog = SchemaCatalog::new();

    // 动作模板依赖训练课 A
    let sessions = template_csv(&catalog, ImportSchema::PlanSession).unwrap();
    engine
        .apply_text(ImportSchema::PlanSession, &sessions)
        .unwrap();

    for schema in ImportSchema::ALL {
        let text = template_csv(&catalog, schema).unwrap();
        let report = engine.preview(schema, &text).unwrap();
        assert!(report.summary.total > 0, "{}", schema);
        assert_eq!(report.summary.invalid, 0, "{}: {:?}", schema, report.rows);
    }

    let combined = engine
        .preview(
            ImportSchema::PlanWorkoutCombined,
            &template_csv(&catalog, ImportSchema::PlanWorkoutCombined).unwrap(),
        )
        .unwrap();
    assert_eq!(combined.summary.total, 3);
}
