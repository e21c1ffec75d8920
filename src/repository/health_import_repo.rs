// ==========================================
// 健康追踪系统 - 导入 Repository Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含校验/对账规则,只做数据读写
// ==========================================

use crate::domain::records::{
    CheckinRecord, ExerciseSlot, NaturalKey, PlanDietRecord, PlanExerciseRecord,
    PlanSessionRecord,
};
use crate::domain::report::{ExistingKeySet, ImportBatch};
use crate::domain::types::{ApplyMode, ImportSchema};
use crate::repository::error::RepositoryResult;

// ==========================================
// WriteOp - 单个写操作
// ==========================================
// 一个写操作可能对应多行（同一训练课下的动作整体替换）
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    /// 该操作覆盖的行结果下标
    pub rows: Vec<usize>,
    pub kind: WriteKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteKind {
    /// 追加打卡（已存在 → 唯一约束冲突）
    InsertCheckin(CheckinRecord),
    /// 营养日 upsert
    UpsertPlanDiet(PlanDietRecord),
    /// 训练课 upsert; exercises 为 Some 时整体替换其动作
    UpsertSession {
        session: PlanSessionRecord,
        exercises: Option<Vec<ExerciseSlot>>,
    },
    /// 替换父训练课下的全部动作
    ReplaceExercises {
        parent: NaturalKey,
        exercises: Vec<PlanExerciseRecord>,
    },
}

// ==========================================
// WriteResult - 写操作结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// 已写入
    Written,
    /// 写入时发现键已存在（快照之后被并发插入）
    Conflict,
    /// 本操作失败,已单独回滚
    Failed(String),
    /// 本操作成功但整批因其他操作失败被回滚
    RolledBack(String),
}

// ==========================================
// ImportRepository Trait
// ==========================================
// 用途: 导入管道所需的存储接口
// 实现者: ImportRepositoryImpl（使用 rusqlite）
pub trait ImportRepository: Send + Sync {
    /// 读取已存在键快照（每次调用一次）
    ///
    /// # 参数
    /// - schema: 导入 schema
    ///
    /// # 返回
    /// - keys: 该 schema 自然键集合
    /// - parent_keys: 动作 schema 的父训练课键集合
    fn existing_keys(&self, schema: ImportSchema) -> RepositoryResult<ExistingKeySet>;

    /// 在一个事务中按顺序执行写操作
    ///
    /// # 参数
    /// - ops: 写操作列表
    /// - mode: BestEffort（每个操作独立 savepoint）/ Atomic（任一失败整批回滚）
    /// - source_tag: 计划数据的来源标记
    ///
    /// # 返回
    /// - Ok(Vec<WriteResult>): 与 ops 一一对应
    /// - Err: 存储整体失败（连接/事务/提交）
    fn apply_writes(
        &self,
        ops: &[WriteOp],
        mode: ApplyMode,
        source_tag: &str,
    ) -> RepositoryResult<Vec<WriteResult>>;

    /// 写入导入批次审计记录
    fn record_batch(&self, batch: &ImportBatch) -> RepositoryResult<()>;
}
