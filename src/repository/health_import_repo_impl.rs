// ==========================================
// 健康追踪系统 - 导入 Repository 实现
// ==========================================
// 职责: 实现导入相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则,只做数据读写
// 事务: 一个文件一个事务,每个写操作一个 savepoint
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::records::{
    CheckinRecord, ExerciseTargets, NaturalKey, PlanDietRecord, PlanSessionRecord,
};
use crate::domain::report::{ExistingKeySet, ImportBatch};
use crate::domain::types::{ApplyMode, ImportSchema};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::health_import_repo::{ImportRepository, WriteKind, WriteOp, WriteResult};
use chrono::Local;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// 照片类型: 进度照
const PHOTO_KIND_PROGRESS: &str = "progress";

// ==========================================
// ImportRepositoryImpl
// ==========================================
pub struct ImportRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRepositoryImpl {
    /// 创建新的 Repository 实例（建表幂等）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_date_keys(conn: &Connection, sql: &str) -> RepositoryResult<HashSet<NaturalKey>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = HashSet::new();
        for row in rows {
            keys.insert(NaturalKey::date(&row?));
        }
        Ok(keys)
    }

    fn query_session_keys(conn: &Connection) -> RepositoryResult<HashSet<NaturalKey>> {
        let mut stmt =
            conn.prepare("SELECT log_date, plan_session_id FROM plan_day_workout_session")?;
        let rows = stmt.query_map([], |row| {
            Ok(NaturalKey::Session {
                log_date: row.get(0)?,
                plan_session_id: row.get(1)?,
            })
        })?;
        let mut keys = HashSet::new();
        for row in rows {
            keys.insert(row?);
        }
        Ok(keys)
    }

    fn query_exercise_keys(conn: &Connection) -> RepositoryResult<HashSet<NaturalKey>> {
        let mut stmt = conn.prepare(
            "SELECT log_date, plan_session_id, exercise_order FROM plan_day_workout_exercise",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(NaturalKey::Exercise {
                log_date: row.get(0)?,
                plan_session_id: row.get(1)?,
                exercise_order: row.get(2)?,
            })
        })?;
        let mut keys = HashSet::new();
        for row in rows {
            keys.insert(row?);
        }
        Ok(keys)
    }

    // ===== 单个写操作 =====

    fn execute_op(
        conn: &Connection,
        op: &WriteOp,
        source_tag: &str,
        now: &str,
    ) -> RepositoryResult<()> {
        match &op.kind {
            WriteKind::InsertCheckin(record) => Self::insert_checkin(conn, record),
            WriteKind::UpsertPlanDiet(record) => {
                Self::upsert_plan_diet(conn, record, source_tag, now)
            }
            WriteKind::UpsertSession { session, exercises } => {
                Self::upsert_session(conn, session, source_tag, now)?;
                if let Some(exercises) = exercises {
                    Self::delete_exercises(conn, &session.log_date, &session.plan_session_id)?;
                    for slot in exercises {
                        Self::insert_exercise(
                            conn,
                            &session.log_date,
                            &session.plan_session_id,
                            slot.exercise_order,
                            &slot.targets,
                            now,
                        )?;
                    }
                }
                Ok(())
            }
            WriteKind::ReplaceExercises { parent, exercises } => {
                let (log_date, plan_session_id) = match parent {
                    NaturalKey::Session {
                        log_date,
                        plan_session_id,
                    } => (log_date, plan_session_id),
                    other => {
                        return Err(RepositoryError::InternalError(format!(
                            "动作父键必须是训练课键: {:?}",
                            other
                        )))
                    }
                };
                Self::delete_exercises(conn, log_date, plan_session_id)?;
                for exercise in exercises {
                    let order = exercise.exercise_order.ok_or_else(|| {
                        RepositoryError::FieldValueError {
                            field: "exercise_order".to_string(),
                            message: "缺失".to_string(),
                        }
                    })?;
                    Self::insert_exercise(
                        conn,
                        log_date,
                        plan_session_id,
                        order,
                        &exercise.targets,
                        now,
                    )?;
                }
                Ok(())
            }
        }
    }

    fn insert_checkin(conn: &Connection, r: &CheckinRecord) -> RepositoryResult<()> {
        let mut stmt = conn.prepare_cached(
            r#"
            INSERT INTO checkin_log (
                log_date, sleep_hours, sleep_quality, steps, weight_kg,
                waist_cm, hip_cm, alcohol_units, creatine_yn, photo_yn
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )?;
        stmt.execute(params![
            r.log_date,
            r.sleep_hours,
            r.sleep_quality,
            r.steps,
            r.weight_kg,
            r.waist_cm,
            r.hip_cm,
            r.alcohol_units,
            yn(r.creatine),
            yn(r.photo),
        ])?;

        if let Some(path) = &r.photo_path {
            conn.execute(
                r#"
                INSERT INTO photo_log (log_date, kind, path)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(log_date, kind) DO UPDATE SET
                    path = excluded.path,
                    created_at = datetime('now')
                "#,
                params![r.log_date, PHOTO_KIND_PROGRESS, path],
            )?;
        }
        Ok(())
    }

    fn upsert_plan_diet(
        conn: &Connection,
        r: &PlanDietRecord,
        source_tag: &str,
        now: &str,
    ) -> RepositoryResult<()> {
        let mut stmt = conn.prepare_cached(
            r#"
            INSERT INTO plan_day_diet (
                log_date, calories_target_kcal, protein_target_g, carbs_target_g, fat_target_g,
                breakfast, snack_1, lunch, snack_2, dinner, notes, source_tag,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            ON CONFLICT(log_date) DO UPDATE SET
                calories_target_kcal = excluded.calories_target_kcal,
                protein_target_g = excluded.protein_target_g,
                carbs_target_g = excluded.carbs_target_g,
                fat_target_g = excluded.fat_target_g,
                breakfast = excluded.breakfast,
                snack_1 = excluded.snack_1,
                lunch = excluded.lunch,
                snack_2 = excluded.snack_2,
                dinner = excluded.dinner,
                notes = excluded.notes,
                source_tag = excluded.source_tag,
                updated_at = excluded.updated_at
            "#,
        )?;
        stmt.execute(params![
            r.log_date,
            r.calories_target_kcal,
            r.protein_target_g,
            r.carbs_target_g,
            r.fat_target_g,
            r.breakfast,
            r.snack_1,
            r.lunch,
            r.snack_2,
            r.dinner,
            non_empty(&r.notes),
            source_tag,
            now,
        ])?;
        Ok(())
    }

    /// 训练课 upsert（ON CONFLICT DO UPDATE,不触发外键级联删除）
    fn upsert_session(
        conn: &Connection,
        r: &PlanSessionRecord,
        source_tag: &str,
        now: &str,
    ) -> RepositoryResult<()> {
        let session_type = r
            .session_type
            .ok_or_else(|| RepositoryError::FieldValueError {
                field: "session_type".to_string(),
                message: "缺失".to_string(),
            })?;

        let mut stmt = conn.prepare_cached(
            r#"
            INSERT INTO plan_day_workout_session (
                log_date, plan_session_id, session_type, warmup, class_sessions, cardio,
                mobility_cooldown, additional_exercises, notes, source_tag,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            ON CONFLICT(log_date, plan_session_id) DO UPDATE SET
                session_type = excluded.session_type,
                warmup = excluded.warmup,
                class_sessions = excluded.class_sessions,
                cardio = excluded.cardio,
                mobility_cooldown = excluded.mobility_cooldown,
                additional_exercises = excluded.additional_exercises,
                notes = excluded.notes,
                source_tag = excluded.source_tag,
                updated_at = excluded.updated_at
            "#,
        )?;
        stmt.execute(params![
            r.log_date,
            r.plan_session_id,
            session_type.as_str(),
            non_empty(&r.warmup),
            non_empty(&r.class_sessions),
            non_empty(&r.cardio),
            non_empty(&r.mobility_cooldown),
            non_empty(&r.additional_exercises),
            non_empty(&r.notes),
            source_tag,
            now,
        ])?;
        Ok(())
    }

    fn delete_exercises(
        conn: &Connection,
        log_date: &str,
        plan_session_id: &str,
    ) -> RepositoryResult<usize> {
        let deleted = conn.execute(
            "DELETE FROM plan_day_workout_exercise WHERE log_date = ?1 AND plan_session_id = ?2",
            params![log_date, plan_session_id],
        )?;
        Ok(deleted)
    }

    fn insert_exercise(
        conn: &Connection,
        log_date: &str,
        plan_session_id: &str,
        exercise_order: i64,
        t: &ExerciseTargets,
        now: &str,
    ) -> RepositoryResult<()> {
        let mut stmt = conn.prepare_cached(
            r#"
            INSERT INTO plan_day_workout_exercise (
                log_date, plan_session_id, exercise_order, exercise_name,
                target_sets, target_reps_min, target_reps_max, target_weight_kg, target_rpe,
                intensity_target, progression_weight_rule, progression_reps_rule,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            "#,
        )?;
        stmt.execute(params![
            log_date,
            plan_session_id,
            exercise_order,
            t.exercise_name,
            t.target_sets,
            t.target_reps_min,
            t.target_reps_max,
            t.target_weight_kg,
            t.target_rpe,
            non_empty(&t.intensity_target),
            non_empty(&t.progression_weight_rule),
            non_empty(&t.progression_reps_rule),
            now,
        ])?;
        Ok(())
    }
}

impl ImportRepository for ImportRepositoryImpl {
    fn existing_keys(&self, schema: ImportSchema) -> RepositoryResult<ExistingKeySet> {
        let conn = self.lock()?;

        let existing = match schema {
            ImportSchema::Checkin => ExistingKeySet {
                keys: Self::query_date_keys(&conn, "SELECT log_date FROM checkin_log")?,
                parent_keys: HashSet::new(),
            },
            ImportSchema::PlanDiet => ExistingKeySet {
                keys: Self::query_date_keys(&conn, "SELECT log_date FROM plan_day_diet")?,
                parent_keys: HashSet::new(),
            },
            ImportSchema::PlanSession | ImportSchema::PlanWorkoutCombined => ExistingKeySet {
                keys: Self::query_session_keys(&conn)?,
                parent_keys: HashSet::new(),
            },
            ImportSchema::PlanExercise => ExistingKeySet {
                keys: Self::query_exercise_keys(&conn)?,
                parent_keys: Self::query_session_keys(&conn)?,
            },
        };

        debug!(
            schema = %schema,
            keys = existing.keys.len(),
            parent_keys = existing.parent_keys.len(),
            "已存在键快照"
        );
        Ok(existing)
    }

    fn apply_writes(
        &self,
        ops: &[WriteOp],
        mode: ApplyMode,
        source_tag: &str,
    ) -> RepositoryResult<Vec<WriteResult>> {
        let mut conn = self.lock()?;
        let mut tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let now = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();

        let mut results: Vec<WriteResult> = Vec::with_capacity(ops.len());
        let mut abort_reason: Option<String> = None;

        for op in ops {
            let sp = tx.savepoint()?;
            let outcome = Self::execute_op(&sp, op, source_tag, &now);
            match outcome {
                Ok(()) => {
                    sp.commit()?;
                    results.push(WriteResult::Written);
                }
                Err(e) => {
                    // 丢弃 savepoint 即回滚本操作
                    drop(sp);
                    if e.is_unique_violation() && matches!(op.kind, WriteKind::InsertCheckin(_)) {
                        results.push(WriteResult::Conflict);
                        continue;
                    }
                    let message = e.to_string();
                    warn!(rows = ?op.rows, error = %message, "写操作失败");
                    results.push(WriteResult::Failed(message.clone()));
                    if mode == ApplyMode::Atomic {
                        abort_reason = Some(message);
                        break;
                    }
                }
            }
        }

        if let Some(reason) = abort_reason {
            tx.rollback()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            warn!(ops = ops.len(), "整批回滚");

            // 已写入与未执行的操作都视为被回滚
            let results = (0..ops.len())
                .map(|idx| match results.get(idx) {
                    Some(WriteResult::Written) | None => WriteResult::RolledBack(reason.clone()),
                    Some(other) => other.clone(),
                })
                .collect();
            return Ok(results);
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(results)
    }

    fn record_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, schema_name, source_tag, total_rows, imported_rows,
                conflict_rows, invalid_rows, warned_rows, imported_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                batch.batch_id,
                batch.schema.as_str(),
                batch.source_tag,
                batch.total as i64,
                batch.imported as i64,
                batch.conflict as i64,
                batch.invalid as i64,
                batch.warned as i64,
                batch.imported_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
                batch.elapsed_ms,
            ],
        )?;
        Ok(())
    }
}

fn yn(flag: Option<bool>) -> Option<&'static str> {
    flag.map(|f| if f { "Y" } else { "N" })
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
