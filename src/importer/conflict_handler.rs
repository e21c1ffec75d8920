// ==========================================
// 健康追踪系统 - 冲突处理器实现
// ==========================================
// 阶段 3: 批内去重 + 与已存在键对账
// 策略: append-only → conflict; upsert → 幂等覆盖
// ==========================================

use crate::domain::records::{NaturalKey, ParsedRow};
use crate::domain::report::{ExistingKeySet, RowOutcome};
use crate::domain::types::{ImportSchema, ReconcilePolicy, RowStatus};
use crate::importer::import_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::HashSet;

pub const REASON_MISSING_KEY: &str = "missing key";
pub const REASON_DUPLICATE: &str = "duplicate within file";
pub const REASON_EXISTS: &str = "already exists, not overwritten";
pub const REASON_NO_PARENT: &str = "parent session not found (import workout sessions first)";
pub const REASON_WILL_REPLACE: &str = "existing entry will be replaced";

pub struct ConflictHandler;

impl ConflictHandler {
    /// 单行分类（不含警告）
    ///
    /// # 返回
    /// - (状态, 原因, 是否计入 seen_keys 的键)
    fn classify(
        &self,
        policy: ReconcilePolicy,
        requires_parent: bool,
        row: &ParsedRow,
        seen: &HashSet<NaturalKey>,
        existing: &ExistingKeySet,
    ) -> (RowStatus, Vec<String>, Option<NaturalKey>) {
        if !row.field_errors.is_empty() {
            return (RowStatus::Invalid, row.field_errors.clone(), None);
        }

        let key = match row.record.natural_key() {
            Some(k) => k,
            None => return (RowStatus::Invalid, vec![REASON_MISSING_KEY.to_string()], None),
        };

        if seen.contains(&key) {
            return (RowStatus::Invalid, vec![REASON_DUPLICATE.to_string()], None);
        }

        if requires_parent && !existing.has_parent(&key) {
            return (RowStatus::Invalid, vec![REASON_NO_PARENT.to_string()], None);
        }

        if existing.contains(&key) {
            return match policy {
                ReconcilePolicy::AppendOnly => {
                    (RowStatus::Conflict, vec![REASON_EXISTS.to_string()], Some(key))
                }
                ReconcilePolicy::Upsert => {
                    (RowStatus::Valid, vec![REASON_WILL_REPLACE.to_string()], Some(key))
                }
            };
        }

        (RowStatus::Valid, Vec::new(), Some(key))
    }
}

impl ConflictHandlerTrait for ConflictHandler {
    fn reconcile(
        &self,
        schema: ImportSchema,
        rows: &[ParsedRow],
        existing: &ExistingKeySet,
    ) -> Vec<RowOutcome> {
        let policy = schema.policy();
        let requires_parent = schema.requires_parent();
        let mut seen: HashSet<NaturalKey> = HashSet::new();

        rows.iter()
            .map(|row| {
                let (status, mut reasons, key) =
                    self.classify(policy, requires_parent, row, &seen, existing);

                // conflict 行同样占位,阻止后续重复
                if let Some(key) = key {
                    seen.insert(key);
                }
                reasons.extend(row.warnings.iter().cloned());

                RowOutcome {
                    line_number: row.line_number,
                    status,
                    reasons,
                    record: row.record.clone(),
                    fields: row.replay_fields(),
                }
            })
            .collect()
    }
}
