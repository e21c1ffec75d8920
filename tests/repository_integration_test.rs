// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: ImportRepositoryImpl 的键快照、写入与批次审计
// ==========================================


use chrono::NaiveDate;
use health_tracker::domain::records::{
    CheckinRecord, ExerciseSlot, ExerciseTargets, PlanDietRecord, PlanExerciseRecord,
    PlanSessionRecord,
};
use health_tracker::domain::report::ImportBatch;
use health_tracker::repository::{
    ImportRepository, ImportRepositoryImpl, WriteKind, WriteOp, WriteResult,
};
use health_tracker::{ApplyMode, ImportSchema, NaturalKey, SessionType};
use test_helpers::{count_rows, create_test_db, query_text};

fn session(log_date: &str, id: &str, session_type: SessionType) -> PlanSessionRecord {
    PlanSessionRecord {
        log_date: log_date.to_string(),
        plan_session_id: id.to_string(),
        session_type: Some(session_type),
        ..Default::default()
    }
}

fn targets(name: &str) -> ExerciseTargets {
    ExerciseTargets {
        exercise_name: name.to_string(),
        target_sets: Some(3),
        target_reps_min: Some(8),
        target_reps_max: Some(10),
        ..Default::default()
    }
}

fn op(row: usize, kind: WriteKind) -> WriteOp {
    WriteOp {
        rows: vec![row],
        kind,
    }
}

#[test]
fn test_existing_keys_per_schema() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = ImportRepositoryImpl::new(&db_path).unwrap();

    let ops = vec![
        op(
            0,
            WriteKind::InsertCheckin(CheckinRecord {
                log_date: "2026-03-01".to_string(),
                ..Default::default()
            }),
        ),
        op(
            1,
            WriteKind::UpsertSession {
                session: session("2026-03-01", "S01", SessionType::Strength),
                exercises: Some(vec![ExerciseSlot {
                    exercise_order: 1,
                    targets: targets("Remo"),
                }]),
            },
        ),
    ];
    let results = repo
        .apply_writes(&ops, ApplyMode::BestEffort, "manual")
        .unwrap();
    assert_eq!(results, vec![WriteResult::Written, WriteResult::Written]);

    let checkin = repo.existing_keys(ImportSchema::Checkin).unwrap();
    assert!(checkin.contains(&NaturalKey::date("2026-03-01")));
    assert!(checkin.parent_keys.is_empty());

    assert!(repo
        .existing_keys(ImportSchema::PlanDiet)
        .unwrap()
        .keys
        .is_empty());

    let combined = repo.existing_keys(ImportSchema::PlanWorkoutCombined).unwrap();
    assert!(combined.contains(&NaturalKey::session("2026-03-01", "S01")));

    let exercises = repo.existing_keys(ImportSchema::PlanExercise).unwrap();
    assert!(exercises.contains(&NaturalKey::Exercise {
        log_date: "2026-03-01".to_string(),
        plan_session_id: "S01".to_string(),
        exercise_order: 1,
    }));
    assert!(exercises.parent_keys.contains(&NaturalKey::session("2026-03-01", "S01")));
}

#[test]
fn test_diet_upsert_overwrites_in_place() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = ImportRepositoryImpl::new(&db_path).unwrap();

    let diet = |breakfast: &str| PlanDietRecord {
        log_date: "2026-03-01".to_string(),
        calories_target_kcal: Some(2000.0),
        protein_target_g: Some(150.0),
        carbs_target_g: Some(200.0),
        fat_target_g: Some(60.0),
        breakfast: breakfast.to_string(),
        snack_1: "Fruta".to_string(),
        lunch: "Pollo".to_string(),
        snack_2: "Yogur".to_string(),
        dinner: "Pescado".to_string(),
        notes: String::new(),
    };

    repo.apply_writes(
        &[op(0, WriteKind::UpsertPlanDiet(diet("Avena")))],
        ApplyMode::BestEffort,
        "manual",
    )
    .unwrap();
    repo.apply_writes(
        &[op(0, WriteKind::UpsertPlanDiet(diet("Huevos")))],
        ApplyMode::BestEffort,
        "coach",
    )
    .unwrap();

    assert_eq!(count_rows(&db_path, "plan_day_diet"), 1);
    assert_eq!(
        query_text(&db_path, "SELECT breakfast FROM plan_day_diet"),
        Some("Huevos".to_string())
    );
    assert_eq!(
        query_text(&db_path, "SELECT source_tag FROM plan_day_diet"),
        Some("coach".to_string())
    );
    // 空文本存为 NULL
    assert_eq!(query_text(&db_path, "SELECT notes FROM plan_day_diet"), None);
}

#[test]
fn test_replace_exercises_without_parent_fails() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = ImportRepositoryImpl::new(&db_path).unwrap();

    let exercises = vec![PlanExerciseRecord {
        log_date: "2026-03-01".to_string(),
        plan_session_id: "Z".to_string(),
        exercise_order: Some(1),
        targets: targets("Remo"),
    }];
    let results = repo
        .apply_writes(
            &[op(
                0,
                WriteKind::ReplaceExercises {
                    parent: NaturalKey::session("2026-03-01", "Z"),
                    exercises,
                },
            )],
            ApplyMode::BestEffort,
            "manual",
        )
        .unwrap();

    assert!(matches!(results[0], WriteResult::Failed(_)));
    assert_eq!(count_rows(&db_path, "plan_day_workout_exercise"), 0);
}

#[test]
fn test_record_batch() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = ImportRepositoryImpl::new(&db_path).unwrap();

    let batch = ImportBatch {
        batch_id: "batch-1".to_string(),
        schema: ImportSchema::PlanSession,
        source_tag: "manual".to_string(),
        total: 4,
        imported: 2,
        conflict: 1,
        invalid: 1,
        warned: 0,
        imported_at: NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap(),
        elapsed_ms: 12,
    };
    repo.record_batch(&batch).unwrap();

    assert_eq!(
        query_text(&db_path, "SELECT schema_name FROM import_batch"),
        Some("plan_session".to_string())
    );
    assert_eq!(
        query_text(&db_path, "SELECT imported_at FROM import_batch"),
        Some("2026-03-01T08:30:00".to_string())
    );

    // 批次号唯一
    assert!(repo.record_batch(&batch).is_err());
}
