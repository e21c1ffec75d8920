// ==========================================
// 健康追踪系统 - 导入结果与批次实体
// ==========================================
// 职责: 行结果、汇总统计、已存在键快照、导入批次审计
// ==========================================

use crate::domain::records::{FieldMap, NaturalKey, ParsedRecord};
use crate::domain::types::{ImportMode, ImportSchema, RowStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// RowOutcome - 单行结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub line_number: usize,
    pub status: RowStatus,
    pub reasons: Vec<String>,
    pub record: ParsedRecord,
    /// 可直接回传给 apply(rows) 的字段投影
    pub fields: FieldMap,
}

// ==========================================
// SubmittedRow - 按行提交的输入
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedRow {
    pub line_number: usize,
    pub fields: FieldMap,
}

impl From<&RowOutcome> for SubmittedRow {
    fn from(outcome: &RowOutcome) -> Self {
        SubmittedRow {
            line_number: outcome.line_number,
            fields: outcome.fields.clone(),
        }
    }
}

// ==========================================
// ImportSummary - 汇总统计
// ==========================================
// 不变式: valid + imported + conflict + invalid == total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total: usize,
    pub valid: usize,
    pub imported: usize,
    pub conflict: usize,
    pub invalid: usize,
    /// 非 invalid 且带警告的行数
    pub warned: usize,
}

impl ImportSummary {
    /// 按行结果统计
    ///
    /// # 参数
    /// - warned_rows: 带警告的行结果下标
    pub fn tally(rows: &[RowOutcome], warned_rows: &HashSet<usize>) -> Self {
        let mut summary = ImportSummary {
            total: rows.len(),
            ..Default::default()
        };
        for (idx, row) in rows.iter().enumerate() {
            match row.status {
                RowStatus::Valid => summary.valid += 1,
                RowStatus::Imported => summary.imported += 1,
                RowStatus::Conflict => summary.conflict += 1,
                RowStatus::Invalid => summary.invalid += 1,
            }
            if row.status != RowStatus::Invalid && warned_rows.contains(&idx) {
                summary.warned += 1;
            }
        }
        summary
    }

    pub fn partition_sum(&self) -> usize {
        self.valid + self.imported + self.conflict + self.invalid
    }
}

// ==========================================
// ImportReport - 单次调用结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub schema: ImportSchema,
    pub mode: ImportMode,
    pub summary: ImportSummary,
    pub rows: Vec<RowOutcome>,
    pub accepted_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

// ==========================================
// ExistingKeySet - 已存在键快照
// ==========================================
// 每次调用读取一次
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingKeySet {
    pub keys: HashSet<NaturalKey>,
    /// 父级训练课键(仅动作 schema 使用)
    pub parent_keys: HashSet<NaturalKey>,
}

impl ExistingKeySet {
    pub fn contains(&self, key: &NaturalKey) -> bool {
        self.keys.contains(key)
    }

    pub fn has_parent(&self, key: &NaturalKey) -> bool {
        match key.parent() {
            Some(parent) => self.parent_keys.contains(&parent),
            None => true,
        }
    }
}

// ==========================================
// ImportBatch - 导入批次审计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub schema: ImportSchema,
    pub source_tag: String,
    pub total: usize,
    pub imported: usize,
    pub conflict: usize,
    pub invalid: usize,
    pub warned: usize,
    pub imported_at: NaiveDateTime,
    pub elapsed_ms: i64,
}
