// ==========================================
// 健康追踪系统 - 领域类型定义
// ==========================================
// 职责: 导入 schema、对账策略、行状态等封闭枚举
// 红线: 枚举取值即持久化/序列化取值,不可随意改名
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入 Schema
// ==========================================
// 每个 schema 固定: 别名表、必填列、自然键、对账策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSchema {
    Checkin,             // 每日打卡
    PlanDiet,            // 计划-营养日
    PlanSession,         // 计划-训练课
    PlanExercise,        // 计划-训练动作
    PlanWorkoutCombined, // 计划-训练宽表(课 + 动作槽位)
}

impl ImportSchema {
    pub const ALL: [ImportSchema; 5] = [
        ImportSchema::Checkin,
        ImportSchema::PlanDiet,
        ImportSchema::PlanSession,
        ImportSchema::PlanExercise,
        ImportSchema::PlanWorkoutCombined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSchema::Checkin => "checkin",
            ImportSchema::PlanDiet => "plan_diet",
            ImportSchema::PlanSession => "plan_session",
            ImportSchema::PlanExercise => "plan_exercise",
            ImportSchema::PlanWorkoutCombined => "plan_workout_combined",
        }
    }

    /// schema 声明的对账策略
    pub fn policy(&self) -> ReconcilePolicy {
        match self {
            ImportSchema::Checkin => ReconcilePolicy::AppendOnly,
            _ => ReconcilePolicy::Upsert,
        }
    }

    /// 是否要求父级训练课已存在
    pub fn requires_parent(&self) -> bool {
        matches!(self, ImportSchema::PlanExercise)
    }
}

impl fmt::Display for ImportSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImportSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        match key.as_str() {
            "checkin" | "checkins" => Ok(ImportSchema::Checkin),
            "plan_diet" => Ok(ImportSchema::PlanDiet),
            "plan_session" | "plan_sessions" => Ok(ImportSchema::PlanSession),
            "plan_exercise" | "plan_exercises" => Ok(ImportSchema::PlanExercise),
            "plan_workout_combined" | "plan_workout" => Ok(ImportSchema::PlanWorkoutCombined),
            _ => Err(format!("未知的导入 schema: {}", s)),
        }
    }
}

// ==========================================
// 对账策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    AppendOnly, // 已存在 → conflict,不覆盖
    Upsert,     // 已存在 → 幂等覆盖
}

// ==========================================
// 训练课类型
// ==========================================
// 封闭集合 {clase, pesas}; 历史值经别名表归并
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    #[serde(rename = "clase")]
    Class,
    #[serde(rename = "pesas")]
    Strength,
}

/// 训练课类型别名表(小写输入 → 规范值)
pub const SESSION_TYPE_ALIASES: &[(&str, SessionType)] = &[
    ("clase", SessionType::Class),
    ("pesas", SessionType::Strength),
    // 历史取值,已并入力量训练
    ("mixta", SessionType::Strength),
];

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Class => "clase",
            SessionType::Strength => "pesas",
        }
    }

    /// 解析训练课类型(大小写不敏感,走别名表)
    pub fn parse(raw: &str) -> Option<SessionType> {
        let key = raw.trim().to_lowercase();
        SESSION_TYPE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, t)| *t)
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 行状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Valid,
    Conflict,
    Invalid,
    Imported,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Valid => write!(f, "valid"),
            RowStatus::Conflict => write!(f, "conflict"),
            RowStatus::Invalid => write!(f, "invalid"),
            RowStatus::Imported => write!(f, "imported"),
        }
    }
}

// ==========================================
// 调用模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    Preview, // 只分类,不落库
    Apply,   // 分类 + 落库
}

// ==========================================
// 落库模式
// ==========================================
// BestEffort: 每行独立 savepoint,失败行单独回滚
// Atomic: 任一行失败整文件回滚
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    BestEffort,
    Atomic,
}

impl ApplyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyMode::BestEffort => "best_effort",
            ApplyMode::Atomic => "atomic",
        }
    }
}

impl FromStr for ApplyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_effort" => Ok(ApplyMode::BestEffort),
            "atomic" => Ok(ApplyMode::Atomic),
            other => Err(format!("未知的落库模式: {}", other)),
        }
    }
}

// ==========================================
// 分隔符
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    /// 候选顺序即并列时的优先级
    pub const CANDIDATES: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }

    pub fn as_char(&self) -> char {
        self.as_byte() as char
    }
}
