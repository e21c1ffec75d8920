// ==========================================
// 健康追踪系统 - 领域模型层
// ==========================================
// 职责: 定义导入记录、类型、结果实体
// 红线: 不含数据访问逻辑,不含校验逻辑
// ==========================================

pub mod records;
pub mod report;
pub mod types;

// 重导出核心类型
pub use records::{
    CheckinRecord, CombinedWorkoutRecord, ExerciseSlot, ExerciseTargets, FieldMap, HeaderMap,
    NaturalKey, ParsedRecord, ParsedRow, PlanDietRecord, PlanExerciseRecord, PlanSessionRecord,
    RawRow,
};
pub use report::{
    ExistingKeySet, ImportBatch, ImportReport, ImportSummary, RowOutcome, SubmittedRow,
};
pub use types::{
    ApplyMode, Delimiter, ImportMode, ImportSchema, ReconcilePolicy, RowStatus, SessionType,
};
