// ==========================================
// 健康追踪系统 - 数据质量校验器实现
// ==========================================
// 阶段 2: 类型转换 + 范围校验 + 跨字段校验
// 红线: 错误按字段累积,一行内不短路
// ==========================================

use crate::domain::records::{
    CheckinRecord, CombinedWorkoutRecord, ExerciseTargets, FieldMap, ParsedRecord, ParsedRow,
    PlanDietRecord, PlanExerciseRecord, PlanSessionRecord,
};
use crate::domain::types::{ImportSchema, SessionType};
use crate::importer::combined_decoder::{decode_slots, discard_class_exercises};
use crate::importer::data_cleaner::{normalize_photo_path, DataCleaner, Range};
use crate::importer::import_trait::RecordValidator;

// ===== 每日打卡范围 =====
const SLEEP_HOURS: Range = Range::new(0.0, 24.0);
const SLEEP_QUALITY: Range = Range::new(1.0, 10.0);
const STEPS: Range = Range::new(0.0, 200_000.0);
const WEIGHT_KG: Range = Range::new(0.0, 500.0);
const GIRTH_CM: Range = Range::new(0.0, 300.0);
const ALCOHOL_UNITS: Range = Range::new(0.0, 100.0);

// ===== 营养日范围 =====
const CALORIES_KCAL: Range = Range::new(0.0, 12_000.0);
const PROTEIN_G: Range = Range::new(0.0, 800.0);
const CARBS_G: Range = Range::new(0.0, 1_500.0);
const FAT_G: Range = Range::new(0.0, 500.0);
const MEAL_MAX_CHARS: usize = 600;

// ===== 训练范围 =====
const SESSION_ID_MAX_CHARS: usize = 48;
const SESSION_TEXT_MAX_CHARS: usize = 700;
const EXERCISE_ORDER: Range = Range::new(1.0, 32.0);
const EXERCISE_NAME_MAX_CHARS: usize = 90;
const TARGET_SETS: Range = Range::new(1.0, 12.0);
const TARGET_REPS: Range = Range::new(1.0, 100.0);
const TARGET_WEIGHT_KG: Range = Range::new(0.0, 1_000.0);
const TARGET_RPE: Range = Range::new(1.0, 10.0);
const INTENSITY_MAX_CHARS: usize = 140;
const PROGRESSION_MAX_CHARS: usize = 240;

/// 独立动作行的目标列（与宽表槽位子字段一一对应）
pub const EXERCISE_TARGET_FIELDS: [&str; 9] = [
    "exercise_name",
    "target_sets",
    "target_reps_min",
    "target_reps_max",
    "target_weight_kg",
    "target_rpe",
    "intensity_target",
    "progression_weight_rule",
    "progression_reps_rule",
];

pub struct DqValidator;

impl RecordValidator for DqValidator {
    fn validate(&self, schema: ImportSchema, line_number: usize, fields: &FieldMap) -> ParsedRow {
        let mut warnings = Vec::new();
        let mut cleaner = DataCleaner::new(fields);

        let record = match schema {
            ImportSchema::Checkin => {
                ParsedRecord::Checkin(validate_checkin(&mut cleaner, &mut warnings))
            }
            ImportSchema::PlanDiet => ParsedRecord::PlanDiet(validate_plan_diet(&mut cleaner)),
            ImportSchema::PlanSession => {
                ParsedRecord::PlanSession(read_session(&mut cleaner, true))
            }
            ImportSchema::PlanExercise => {
                ParsedRecord::PlanExercise(validate_plan_exercise(&mut cleaner))
            }
            ImportSchema::PlanWorkoutCombined => {
                let session = read_session(&mut cleaner, false);
                let (exercises, slot_errors) = decode_slots(fields);
                for error in slot_errors {
                    cleaner.push_error(error);
                }
                let mut record = CombinedWorkoutRecord {
                    session,
                    session_order: None,
                    exercises,
                };
                warnings.extend(discard_class_exercises(&mut record));
                ParsedRecord::PlanWorkoutCombined(record)
            }
        };

        ParsedRow {
            line_number,
            record,
            field_errors: cleaner.into_errors(),
            warnings,
            source_fields: fields.clone(),
        }
    }
}

// ==========================================
// 每日打卡
// ==========================================
fn validate_checkin(c: &mut DataCleaner, warnings: &mut Vec<String>) -> CheckinRecord {
    let log_date = c.date("log_date");
    let sleep_hours = c.float("sleep_hours", "sleep_hours", SLEEP_HOURS, false);
    let sleep_quality = c.int("sleep_quality", "sleep_quality", SLEEP_QUALITY, false);
    let steps = c.int("steps", "steps", STEPS, false);
    let weight_kg = c.float("weight_kg", "weight_kg", WEIGHT_KG, false);
    let waist_cm = c.float("waist_cm", "waist_cm", GIRTH_CM, false);
    let hip_cm = c.float("hip_cm", "hip_cm", GIRTH_CM, false);
    // 空值按 0 杯
    let alcohol_units = c
        .int("alcohol_units", "alcohol_units", ALCOHOL_UNITS, false)
        .unwrap_or(0);
    let creatine = c.yn("creatine_yn");
    let photo_flag = c.yn("photo_yn");

    let photo_raw = c.raw("photo_path").to_string();
    let photo_path = normalize_photo_path(&photo_raw);
    if !photo_raw.is_empty() && photo_path.is_none() {
        warnings.push("photo_path ignored (invalid path)".to_string());
    }

    // 合法路径强制 photo_yn = Y; 无路径时 Y 标记被清除
    let photo = match (&photo_path, photo_flag) {
        (Some(_), _) => Some(true),
        (None, Some(true)) => {
            warnings.push("photo_yn=Y without a valid photo_path: photo flag dropped".to_string());
            None
        }
        (None, flag) => flag,
    };

    CheckinRecord {
        log_date,
        sleep_hours,
        sleep_quality,
        steps,
        weight_kg,
        waist_cm,
        hip_cm,
        alcohol_units,
        creatine,
        photo,
        photo_path,
    }
}

// ==========================================
// 计划-营养日
// ==========================================
fn validate_plan_diet(c: &mut DataCleaner) -> PlanDietRecord {
    let log_date = c.date("log_date");
    let calories_target_kcal =
        c.float("calories_target_kcal", "calories_target_kcal", CALORIES_KCAL, true);
    let protein_target_g = c.float("protein_target_g", "protein_target_g", PROTEIN_G, true);
    let carbs_target_g = c.float("carbs_target_g", "carbs_target_g", CARBS_G, true);
    let fat_target_g = c.float("fat_target_g", "fat_target_g", FAT_G, true);

    PlanDietRecord {
        log_date,
        calories_target_kcal,
        protein_target_g,
        carbs_target_g,
        fat_target_g,
        breakfast: c.text("breakfast", "breakfast", MEAL_MAX_CHARS, true),
        snack_1: c.text("snack_1", "snack_1", MEAL_MAX_CHARS, true),
        lunch: c.text("lunch", "lunch", MEAL_MAX_CHARS, true),
        snack_2: c.text("snack_2", "snack_2", MEAL_MAX_CHARS, true),
        dinner: c.text("dinner", "dinner", MEAL_MAX_CHARS, true),
        notes: c.text("notes", "notes", MEAL_MAX_CHARS, false),
    }
}

// ==========================================
// 计划-训练课（独立行与宽表共用）
// ==========================================
fn read_session(c: &mut DataCleaner, with_id: bool) -> PlanSessionRecord {
    let log_date = c.date("log_date");
    let plan_session_id = if with_id {
        c.text("plan_session_id", "plan_session_id", SESSION_ID_MAX_CHARS, true)
    } else {
        String::new()
    };

    let raw_type = c.raw("session_type").to_string();
    let session_type = SessionType::parse(&raw_type);
    if raw_type.is_empty() {
        c.push_error("session_type: required".to_string());
    } else if session_type.is_none() {
        c.push_error("session_type: must be clase or pesas".to_string());
    }

    PlanSessionRecord {
        log_date,
        plan_session_id,
        session_type,
        warmup: c.text("warmup", "warmup", SESSION_TEXT_MAX_CHARS, false),
        class_sessions: c.text("class_sessions", "class_sessions", SESSION_TEXT_MAX_CHARS, false),
        cardio: c.text("cardio", "cardio", SESSION_TEXT_MAX_CHARS, false),
        mobility_cooldown: c.text(
            "mobility_cooldown",
            "mobility_cooldown",
            SESSION_TEXT_MAX_CHARS,
            false,
        ),
        additional_exercises: c.text(
            "additional_exercises",
            "additional_exercises",
            SESSION_TEXT_MAX_CHARS,
            false,
        ),
        notes: c.text("notes", "notes", SESSION_TEXT_MAX_CHARS, false),
    }
}

// ==========================================
// 计划-训练动作
// ==========================================
fn validate_plan_exercise(c: &mut DataCleaner) -> PlanExerciseRecord {
    let log_date = c.date("log_date");
    let plan_session_id = c.text("plan_session_id", "plan_session_id", SESSION_ID_MAX_CHARS, true);
    let exercise_order = c.int("exercise_order", "exercise_order", EXERCISE_ORDER, true);
    let columns: Vec<String> = EXERCISE_TARGET_FIELDS.iter().map(|s| s.to_string()).collect();
    let targets = read_exercise_targets(c, &columns, &EXERCISE_TARGET_FIELDS);

    PlanExerciseRecord {
        log_date,
        plan_session_id,
        exercise_order,
        targets,
    }
}

/// 读取动作目标
///
/// # 参数
/// - columns: 9 个目标列的实际列名（顺序同宽表子字段）
/// - labels: 错误信息中使用的字段名
pub fn read_exercise_targets(
    c: &mut DataCleaner,
    columns: &[String],
    labels: &[&str],
) -> ExerciseTargets {
    let exercise_name = c.text(&columns[0], labels[0], EXERCISE_NAME_MAX_CHARS, true);
    let target_sets = c.int(&columns[1], labels[1], TARGET_SETS, false);
    let target_reps_min = c.int(&columns[2], labels[2], TARGET_REPS, false);
    let target_reps_max = c.int(&columns[3], labels[3], TARGET_REPS, false);
    if let (Some(lo), Some(hi)) = (target_reps_min, target_reps_max) {
        if lo > hi {
            c.push_error(format!("{} cannot be greater than {}", labels[2], labels[3]));
        }
    }
    let target_weight_kg = c.float(&columns[4], labels[4], TARGET_WEIGHT_KG, false);
    let target_rpe = c.float(&columns[5], labels[5], TARGET_RPE, false);

    ExerciseTargets {
        exercise_name,
        target_sets,
        target_reps_min,
        target_reps_max,
        target_weight_kg,
        target_rpe,
        intensity_target: c.text(&columns[6], labels[6], INTENSITY_MAX_CHARS, false),
        progression_weight_rule: c.text(&columns[7], labels[7], PROGRESSION_MAX_CHARS, false),
        progression_reps_rule: c.text(&columns[8], labels[8], PROGRESSION_MAX_CHARS, false),
    }
}
