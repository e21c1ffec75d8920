// ==========================================
// 健康追踪系统 - 导入记录实体
// ==========================================
// 职责: 各 schema 的强类型记录、自然键、规范化字段投影
// 红线: 字典形态的行只存在于 FieldMap 边界,校验后立即投影为结构体
// ==========================================

use crate::domain::types::SessionType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 规范列名 → 单元格文本
pub type FieldMap = BTreeMap<String, String>;

// ==========================================
// RawRow - 切分后的数据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 物理行号(表头为第 1 行)
    pub line_number: usize,
    /// 已 trim 的单元格
    pub cells: Vec<String>,
}

// ==========================================
// HeaderMap - 列序号 → 规范列名
// ==========================================
// 空字符串表示该列被忽略; 单文件内不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    columns: Vec<String>,
}

impl HeaderMap {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 行 → 字段表; 超出表头的单元格丢弃,缺失的尾部单元格视为空串
    pub fn project(&self, row: &RawRow) -> FieldMap {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(idx, name)| {
                let value = row.cells.get(idx).cloned().unwrap_or_default();
                (name.clone(), value)
            })
            .collect()
    }
}

// ==========================================
// NaturalKey - 自然键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NaturalKey {
    Date {
        log_date: String,
    },
    Session {
        log_date: String,
        plan_session_id: String,
    },
    Exercise {
        log_date: String,
        plan_session_id: String,
        exercise_order: i64,
    },
}

impl NaturalKey {
    pub fn date(log_date: &str) -> Self {
        NaturalKey::Date {
            log_date: log_date.to_string(),
        }
    }

    pub fn session(log_date: &str, plan_session_id: &str) -> Self {
        NaturalKey::Session {
            log_date: log_date.to_string(),
            plan_session_id: plan_session_id.to_string(),
        }
    }

    /// 动作键 → 所属训练课键
    pub fn parent(&self) -> Option<NaturalKey> {
        match self {
            NaturalKey::Exercise {
                log_date,
                plan_session_id,
                ..
            } => Some(NaturalKey::session(log_date, plan_session_id)),
            _ => None,
        }
    }
}

// ==========================================
// 每日打卡
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckinRecord {
    pub log_date: String,
    pub sleep_hours: Option<f64>,
    pub sleep_quality: Option<i64>,
    pub steps: Option<i64>,
    pub weight_kg: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hip_cm: Option<f64>,
    pub alcohol_units: i64,
    pub creatine: Option<bool>,
    pub photo: Option<bool>,
    pub photo_path: Option<String>,
}

// ==========================================
// 计划-营养日
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanDietRecord {
    pub log_date: String,
    pub calories_target_kcal: Option<f64>,
    pub protein_target_g: Option<f64>,
    pub carbs_target_g: Option<f64>,
    pub fat_target_g: Option<f64>,
    pub breakfast: String,
    pub snack_1: String,
    pub lunch: String,
    pub snack_2: String,
    pub dinner: String,
    pub notes: String,
}

// ==========================================
// 计划-训练课
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanSessionRecord {
    pub log_date: String,
    pub plan_session_id: String,
    pub session_type: Option<SessionType>,
    pub warmup: String,
    pub class_sessions: String,
    pub cardio: String,
    pub mobility_cooldown: String,
    pub additional_exercises: String,
    pub notes: String,
}

/// 动作目标(独立动作行与宽表槽位共用)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseTargets {
    pub exercise_name: String,
    pub target_sets: Option<i64>,
    pub target_reps_min: Option<i64>,
    pub target_reps_max: Option<i64>,
    pub target_weight_kg: Option<f64>,
    pub target_rpe: Option<f64>,
    pub intensity_target: String,
    pub progression_weight_rule: String,
    pub progression_reps_rule: String,
}

// ==========================================
// 计划-训练动作
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanExerciseRecord {
    pub log_date: String,
    pub plan_session_id: String,
    pub exercise_order: Option<i64>,
    #[serde(flatten)]
    pub targets: ExerciseTargets,
}

impl PlanExerciseRecord {
    pub fn natural_key(&self) -> Option<NaturalKey> {
        let order = self.exercise_order?;
        if self.log_date.is_empty() || self.plan_session_id.is_empty() {
            return None;
        }
        Some(NaturalKey::Exercise {
            log_date: self.log_date.clone(),
            plan_session_id: self.plan_session_id.clone(),
            exercise_order: order,
        })
    }
}

/// 宽表中的一个动作槽位(槽位号即动作顺序)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseSlot {
    pub exercise_order: i64,
    #[serde(flatten)]
    pub targets: ExerciseTargets,
}

// ==========================================
// 计划-训练宽表
// ==========================================
// plan_session_id 由同日计数器合成(S01, S02, ...)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinedWorkoutRecord {
    #[serde(flatten)]
    pub session: PlanSessionRecord,
    pub session_order: Option<u32>,
    pub exercises: Vec<ExerciseSlot>,
}

// ==========================================
// ParsedRecord - 校验后的记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum ParsedRecord {
    Checkin(CheckinRecord),
    PlanDiet(PlanDietRecord),
    PlanSession(PlanSessionRecord),
    PlanExercise(PlanExerciseRecord),
    PlanWorkoutCombined(CombinedWorkoutRecord),
}

impl ParsedRecord {
    /// 自然键(关键字段缺失时返回 None)
    pub fn natural_key(&self) -> Option<NaturalKey> {
        match self {
            ParsedRecord::Checkin(r) => date_key(&r.log_date),
            ParsedRecord::PlanDiet(r) => date_key(&r.log_date),
            ParsedRecord::PlanSession(r) => session_key(&r.log_date, &r.plan_session_id),
            ParsedRecord::PlanExercise(r) => r.natural_key(),
            ParsedRecord::PlanWorkoutCombined(r) => {
                session_key(&r.session.log_date, &r.session.plan_session_id)
            }
        }
    }

    /// 规范化字段投影
    ///
    /// 对合法记录再次校验得到相同结果,供"按行提交"回放。
    pub fn to_fields(&self) -> FieldMap {
        let mut out = FieldMap::new();
        match self {
            ParsedRecord::Checkin(r) => {
                put(&mut out, "log_date", r.log_date.clone());
                put(&mut out, "sleep_hours", opt_num(r.sleep_hours));
                put(&mut out, "sleep_quality", opt_num(r.sleep_quality));
                put(&mut out, "steps", opt_num(r.steps));
                put(&mut out, "weight_kg", opt_num(r.weight_kg));
                put(&mut out, "waist_cm", opt_num(r.waist_cm));
                put(&mut out, "hip_cm", opt_num(r.hip_cm));
                put(&mut out, "alcohol_units", r.alcohol_units.to_string());
                put(&mut out, "creatine_yn", opt_yn(r.creatine));
                put(&mut out, "photo_yn", opt_yn(r.photo));
                put(&mut out, "photo_path", r.photo_path.clone().unwrap_or_default());
            }
            ParsedRecord::PlanDiet(r) => {
                put(&mut out, "log_date", r.log_date.clone());
                put(&mut out, "calories_target_kcal", opt_num(r.calories_target_kcal));
                put(&mut out, "protein_target_g", opt_num(r.protein_target_g));
                put(&mut out, "carbs_target_g", opt_num(r.carbs_target_g));
                put(&mut out, "fat_target_g", opt_num(r.fat_target_g));
                put(&mut out, "breakfast", r.breakfast.clone());
                put(&mut out, "snack_1", r.snack_1.clone());
                put(&mut out, "lunch", r.lunch.clone());
                put(&mut out, "snack_2", r.snack_2.clone());
                put(&mut out, "dinner", r.dinner.clone());
                put(&mut out, "notes", r.notes.clone());
            }
            ParsedRecord::PlanSession(r) => {
                session_fields(&mut out, r);
                put(&mut out, "plan_session_id", r.plan_session_id.clone());
            }
            ParsedRecord::PlanExercise(r) => {
                put(&mut out, "log_date", r.log_date.clone());
                put(&mut out, "plan_session_id", r.plan_session_id.clone());
                put(&mut out, "exercise_order", opt_num(r.exercise_order));
                put(&mut out, "exercise_name", r.targets.exercise_name.clone());
                put(&mut out, "target_sets", opt_num(r.targets.target_sets));
                put(&mut out, "target_reps_min", opt_num(r.targets.target_reps_min));
                put(&mut out, "target_reps_max", opt_num(r.targets.target_reps_max));
                put(&mut out, "target_weight_kg", opt_num(r.targets.target_weight_kg));
                put(&mut out, "target_rpe", opt_num(r.targets.target_rpe));
                put(&mut out, "intensity_target", r.targets.intensity_target.clone());
                put(
                    &mut out,
                    "progression_weight_rule",
                    r.targets.progression_weight_rule.clone(),
                );
                put(
                    &mut out,
                    "progression_reps_rule",
                    r.targets.progression_reps_rule.clone(),
                );
            }
            ParsedRecord::PlanWorkoutCombined(r) => {
                session_fields(&mut out, &r.session);
                for slot in &r.exercises {
                    let prefix = format!("exercise_{}_", slot.exercise_order);
                    let t = &slot.targets;
                    let pairs = [
                        ("name", t.exercise_name.clone()),
                        ("sets", opt_num(t.target_sets)),
                        ("reps_min", opt_num(t.target_reps_min)),
                        ("reps_max", opt_num(t.target_reps_max)),
                        ("weight_kg", opt_num(t.target_weight_kg)),
                        ("rpe", opt_num(t.target_rpe)),
                        ("intensity_target", t.intensity_target.clone()),
                        ("progression_weight_rule", t.progression_weight_rule.clone()),
                        ("progression_reps_rule", t.progression_reps_rule.clone()),
                    ];
                    for (suffix, value) in pairs {
                        out.insert(format!("{}{}", prefix, suffix), value);
                    }
                }
            }
        }
        out
    }
}

// ==========================================
// ParsedRow - 校验阶段输出
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub line_number: usize,
    pub record: ParsedRecord,
    pub field_errors: Vec<String>,
    pub warnings: Vec<String>,
    /// 进入校验前的原始字段
    pub source_fields: FieldMap,
}

impl ParsedRow {
    /// 回放投影: 干净行用规范化值,带错误/警告的行保留原始输入
    pub fn replay_fields(&self) -> FieldMap {
        if self.field_errors.is_empty() && self.warnings.is_empty() {
            self.record.to_fields()
        } else {
            self.source_fields.clone()
        }
    }
}

fn date_key(log_date: &str) -> Option<NaturalKey> {
    if log_date.is_empty() {
        None
    } else {
        Some(NaturalKey::date(log_date))
    }
}

fn session_key(log_date: &str, plan_session_id: &str) -> Option<NaturalKey> {
    if log_date.is_empty() || plan_session_id.is_empty() {
        None
    } else {
        Some(NaturalKey::session(log_date, plan_session_id))
    }
}

fn session_fields(out: &mut FieldMap, r: &PlanSessionRecord) {
    put(out, "log_date", r.log_date.clone());
    put(
        out,
        "session_type",
        r.session_type.map(|t| t.as_str().to_string()).unwrap_or_default(),
    );
    put(out, "warmup", r.warmup.clone());
    put(out, "class_sessions", r.class_sessions.clone());
    put(out, "cardio", r.cardio.clone());
    put(out, "mobility_cooldown", r.mobility_cooldown.clone());
    put(out, "additional_exercises", r.additional_exercises.clone());
    put(out, "notes", r.notes.clone());
}

fn put(out: &mut FieldMap, key: &str, value: String) {
    out.insert(key.to_string(), value);
}

fn opt_num<T: ToString>(v: Option<T>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn opt_yn(v: Option<bool>) -> String {
    match v {
        Some(true) => "Y".to_string(),
        Some(false) => "N".to_string(),
        None => String::new(),
    }
}
