// ==========================================
// 健康追踪系统 - Schema 目录
// ==========================================
// 职责: 各 schema 的规范列、必填列、表头别名表
// 红线: 构建一次后只读,按引用传给解析器,不在请求中修改
// ==========================================

use crate::domain::types::ImportSchema;
use std::collections::HashMap;

/// 宽表动作槽位数
pub const COMBINED_EXERCISE_SLOTS: usize = 6;

/// 宽表槽位子字段(顺序即模板列顺序)
pub const COMBINED_EXERCISE_SUFFIXES: [&str; 9] = [
    "name",
    "sets",
    "reps_min",
    "reps_max",
    "weight_kg",
    "rpe",
    "intensity_target",
    "progression_weight_rule",
    "progression_reps_rule",
];

// ===== 每日打卡 =====
const CHECKIN_FIELDS: &[&str] = &[
    "log_date",
    "sleep_hours",
    "sleep_quality",
    "steps",
    "weight_kg",
    "waist_cm",
    "hip_cm",
    "alcohol_units",
    "creatine_yn",
    "photo_yn",
    "photo_path",
];
const CHECKIN_REQUIRED: &[&str] = &["log_date"];
const CHECKIN_ALIASES: &[(&str, &str)] = &[
    ("date", "log_date"),
    ("fecha", "log_date"),
    ("sleep", "sleep_hours"),
    ("sueno_horas", "sleep_hours"),
    ("sueno", "sleep_hours"),
    ("quality", "sleep_quality"),
    ("calidad_sueno", "sleep_quality"),
    ("calidad", "sleep_quality"),
    ("pasos", "steps"),
    ("peso_kg", "weight_kg"),
    ("peso", "weight_kg"),
    ("cintura_cm", "waist_cm"),
    ("cintura", "waist_cm"),
    ("cadera_cm", "hip_cm"),
    ("cadera", "hip_cm"),
    ("alcohol", "alcohol_units"),
    ("creatina_yn", "creatine_yn"),
    ("creatina", "creatine_yn"),
    ("foto_yn", "photo_yn"),
    ("foto", "photo_yn"),
    ("foto_path", "photo_path"),
];

// ===== 计划-营养日 =====
const PLAN_DIET_FIELDS: &[&str] = &[
    "log_date",
    "calories_target_kcal",
    "protein_target_g",
    "carbs_target_g",
    "fat_target_g",
    "breakfast",
    "snack_1",
    "lunch",
    "snack_2",
    "dinner",
    "notes",
];
const PLAN_DIET_REQUIRED: &[&str] = &[
    "log_date",
    "calories_target_kcal",
    "protein_target_g",
    "carbs_target_g",
    "fat_target_g",
    "breakfast",
    "snack_1",
    "lunch",
    "snack_2",
    "dinner",
];
const PLAN_DIET_ALIASES: &[(&str, &str)] = &[
    ("date", "log_date"),
    ("fecha", "log_date"),
    ("kcal_target", "calories_target_kcal"),
    ("snack1", "snack_1"),
    ("snack2", "snack_2"),
];

// ===== 计划-训练课 =====
const PLAN_SESSION_FIELDS: &[&str] = &[
    "log_date",
    "plan_session_id",
    "session_type",
    "warmup",
    "class_sessions",
    "cardio",
    "mobility_cooldown",
    "additional_exercises",
    "notes",
];
const PLAN_SESSION_REQUIRED: &[&str] = &["log_date", "plan_session_id", "session_type"];
const PLAN_SESSION_ALIASES: &[(&str, &str)] = &[
    ("date", "log_date"),
    ("fecha", "log_date"),
    ("session_id", "plan_session_id"),
    ("tipo_sesion", "session_type"),
    ("sessions_class", "class_sessions"),
];

// ===== 计划-训练动作 =====
const PLAN_EXERCISE_FIELDS: &[&str] = &[
    "log_date",
    "plan_session_id",
    "exercise_order",
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
const PLAN_EXERCISE_REQUIRED: &[&str] = &[
    "log_date",
    "plan_session_id",
    "exercise_order",
    "exercise_name",
];
const PLAN_EXERCISE_ALIASES: &[(&str, &str)] = &[
    ("date", "log_date"),
    ("fecha", "log_date"),
    ("session_id", "plan_session_id"),
    ("order", "exercise_order"),
    ("name", "exercise_name"),
];

// ===== 计划-训练宽表 =====
const COMBINED_BASE_FIELDS: &[&str] = &[
    "log_date",
    "session_type",
    "warmup",
    "class_sessions",
    "cardio",
    "mobility_cooldown",
    "additional_exercises",
    "notes",
];
const COMBINED_REQUIRED: &[&str] = &["log_date", "session_type"];
const COMBINED_ALIASES: &[(&str, &str)] = &[
    ("date", "log_date"),
    ("fecha", "log_date"),
    ("tipo_sesion", "session_type"),
    ("sessions_class", "class_sessions"),
];
const COMBINED_SUFFIX_ALIASES: &[(&str, &str)] = &[
    ("exercise_name", "name"),
    ("target_sets", "sets"),
    ("target_reps_min", "reps_min"),
    ("target_reps_max", "reps_max"),
    ("target_weight_kg", "weight_kg"),
    ("weight", "weight_kg"),
    ("target_rpe", "rpe"),
    ("intensity", "intensity_target"),
    ("progression_weight", "progression_weight_rule"),
    ("progression_reps", "progression_reps_rule"),
];

// ==========================================
// SchemaDef - 单个 schema 的列定义
// ==========================================
#[derive(Debug, Clone)]
pub struct SchemaDef {
    pub schema: ImportSchema,
    /// 规范列(模板顺序)
    pub fields: Vec<String>,
    pub required: Vec<String>,
    /// slug → 规范列名; 规范列名自身也在表中
    aliases: HashMap<String, String>,
}

impl SchemaDef {
    fn build(
        schema: ImportSchema,
        fields: Vec<String>,
        required: &[&str],
        aliases: &[(&str, &str)],
    ) -> Self {
        let mut map: HashMap<String, String> = fields
            .iter()
            .map(|f| (f.clone(), f.clone()))
            .collect();
        for (alias, canonical) in aliases {
            map.insert(alias.to_string(), canonical.to_string());
        }
        Self {
            schema,
            fields,
            required: required.iter().map(|s| s.to_string()).collect(),
            aliases: map,
        }
    }

    /// 别名查找
    pub fn lookup(&self, slug: &str) -> Option<&str> {
        self.aliases.get(slug).map(|s| s.as_str())
    }
}

// ==========================================
// SchemaCatalog - 全部 schema 的只读目录
// ==========================================
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    defs: HashMap<ImportSchema, SchemaDef>,
    suffix_aliases: HashMap<String, String>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        let owned = |fields: &[&str]| fields.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mut combined_fields = owned(COMBINED_BASE_FIELDS);
        for slot in 1..=COMBINED_EXERCISE_SLOTS {
            for suffix in COMBINED_EXERCISE_SUFFIXES {
                combined_fields.push(slot_field(slot, suffix));
            }
        }

        let defs = [
            SchemaDef::build(
                ImportSchema::Checkin,
                owned(CHECKIN_FIELDS),
                CHECKIN_REQUIRED,
                CHECKIN_ALIASES,
            ),
            SchemaDef::build(
                ImportSchema::PlanDiet,
                owned(PLAN_DIET_FIELDS),
                PLAN_DIET_REQUIRED,
                PLAN_DIET_ALIASES,
            ),
            SchemaDef::build(
                ImportSchema::PlanSession,
                owned(PLAN_SESSION_FIELDS),
                PLAN_SESSION_REQUIRED,
                PLAN_SESSION_ALIASES,
            ),
            SchemaDef::build(
                ImportSchema::PlanExercise,
                owned(PLAN_EXERCISE_FIELDS),
                PLAN_EXERCISE_REQUIRED,
                PLAN_EXERCISE_ALIASES,
            ),
            SchemaDef::build(
                ImportSchema::PlanWorkoutCombined,
                combined_fields,
                COMBINED_REQUIRED,
                COMBINED_ALIASES,
            ),
        ]
        .into_iter()
        .map(|def| (def.schema, def))
        .collect();

        let mut suffix_aliases: HashMap<String, String> = COMBINED_EXERCISE_SUFFIXES
            .iter()
            .map(|s| (s.to_string(), s.to_string()))
            .collect();
        for (alias, canonical) in COMBINED_SUFFIX_ALIASES {
            suffix_aliases.insert(alias.to_string(), canonical.to_string());
        }

        Self {
            defs,
            suffix_aliases,
        }
    }

    pub fn def(&self, schema: ImportSchema) -> &SchemaDef {
        // new() 为 ImportSchema::ALL 中每个取值都建了定义
        &self.defs[&schema]
    }

    /// 宽表子字段别名 → 规范子字段
    pub fn canonical_suffix(&self, suffix: &str) -> Option<&str> {
        self.suffix_aliases.get(suffix).map(|s| s.as_str())
    }

    /// 对外公布的可接受列(规范名)
    pub fn accepted_columns(&self, schema: ImportSchema) -> Vec<String> {
        self.def(schema).fields.clone()
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// 宽表槽位列名: exercise_{slot}_{suffix}
pub fn slot_field(slot: usize, suffix: &str) -> String {
    format!("exercise_{}_{}", slot, suffix)
}
