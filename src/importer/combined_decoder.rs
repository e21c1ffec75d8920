// ==========================================
// 健康追踪系统 - 训练宽表解码器
// ==========================================
// 职责: 6 个动作槽位 × 9 子字段 → ExerciseSlot 列表
// 规则: 槽位全空跳过; 槽位错误合并为 "exercise_N: e1; e2"
//       clase 课丢弃动作并给出警告; 同日计数器合成 plan_session_id
// ==========================================

use crate::domain::records::{CombinedWorkoutRecord, ExerciseSlot, FieldMap, ParsedRecord, ParsedRow};
use crate::domain::types::SessionType;
use crate::importer::data_cleaner::{parse_date, DataCleaner};
use crate::importer::dq_validator::read_exercise_targets;
use crate::importer::schema_catalog::{slot_field, COMBINED_EXERCISE_SLOTS, COMBINED_EXERCISE_SUFFIXES};
use std::collections::HashMap;
use tracing::debug;

/// 解码全部槽位
///
/// # 返回
/// - (合法槽位列表, 槽位错误列表)
pub fn decode_slots(fields: &FieldMap) -> (Vec<ExerciseSlot>, Vec<String>) {
    let mut slots = Vec::new();
    let mut errors = Vec::new();

    for slot in 1..=COMBINED_EXERCISE_SLOTS {
        let columns: Vec<String> = COMBINED_EXERCISE_SUFFIXES
            .iter()
            .map(|suffix| slot_field(slot, suffix))
            .collect();

        let is_empty = columns
            .iter()
            .all(|c| fields.get(c).map_or(true, |v| v.trim().is_empty()));
        if is_empty {
            continue;
        }

        let mut cleaner = DataCleaner::new(fields);
        let targets = read_exercise_targets(&mut cleaner, &columns, &COMBINED_EXERCISE_SUFFIXES);
        let slot_errors = cleaner.into_errors();

        if slot_errors.is_empty() {
            slots.push(ExerciseSlot {
                exercise_order: slot as i64,
                targets,
            });
        } else {
            errors.push(format!("exercise_{}: {}", slot, slot_errors.join("; ")));
        }
    }

    (slots, errors)
}

/// clase 课不带动作: 丢弃并返回警告
pub fn discard_class_exercises(record: &mut CombinedWorkoutRecord) -> Option<String> {
    if record.session.session_type != Some(SessionType::Class) || record.exercises.is_empty() {
        return None;
    }
    let count = record.exercises.len();
    record.exercises.clear();
    Some(format!(
        "{} exercises ignored: only applicable to strength sessions",
        count
    ))
}

/// 训练课编号: S01, S02, ...
pub fn session_id_from_order(order: u32) -> String {
    format!("S{:02}", order)
}

// ==========================================
// SessionIdAllocator - 同日计数器
// ==========================================
// 作用域: 单次调用; 只为日期合法的行计数
#[derive(Debug, Default)]
pub struct SessionIdAllocator {
    per_date: HashMap<String, u32>,
}

impl SessionIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按输入顺序为宽表行合成 plan_session_id
    pub fn assign(&mut self, rows: &mut [ParsedRow]) {
        for row in rows.iter_mut() {
            if let ParsedRecord::PlanWorkoutCombined(record) = &mut row.record {
                let log_date = record.session.log_date.clone();
                if parse_date(&log_date).is_none() {
                    continue;
                }
                let counter = self.per_date.entry(log_date).or_insert(0);
                *counter += 1;
                record.session_order = Some(*counter);
                record.session.plan_session_id = session_id_from_order(*counter);
            }
        }
        debug!(dates = self.per_date.len(), "宽表训练课编号完成");
    }
}
