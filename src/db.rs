// ==========================================
// 健康追踪系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 建表（幂等）与 schema_version 记录
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "HEALTH_TRACKER_DB_PATH";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS checkin_log (
    log_date TEXT PRIMARY KEY,
    sleep_hours REAL,
    sleep_quality INTEGER,
    steps INTEGER,
    weight_kg REAL,
    waist_cm REAL,
    hip_cm REAL,
    alcohol_units INTEGER NOT NULL DEFAULT 0,
    creatine_yn TEXT,
    photo_yn TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS photo_log (
    log_date TEXT NOT NULL,
    kind TEXT NOT NULL,
    path TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (log_date, kind)
);

CREATE TABLE IF NOT EXISTS plan_day_diet (
    log_date TEXT PRIMARY KEY,
    calories_target_kcal REAL NOT NULL,
    protein_target_g REAL NOT NULL,
    carbs_target_g REAL NOT NULL,
    fat_target_g REAL NOT NULL,
    breakfast TEXT NOT NULL,
    snack_1 TEXT NOT NULL,
    lunch TEXT NOT NULL,
    snack_2 TEXT NOT NULL,
    dinner TEXT NOT NULL,
    notes TEXT,
    source_tag TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS plan_day_workout_session (
    log_date TEXT NOT NULL,
    plan_session_id TEXT NOT NULL,
    session_type TEXT NOT NULL,
    warmup TEXT,
    class_sessions TEXT,
    cardio TEXT,
    mobility_cooldown TEXT,
    additional_exercises TEXT,
    notes TEXT,
    source_tag TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (log_date, plan_session_id)
);

CREATE TABLE IF NOT EXISTS plan_day_workout_exercise (
    log_date TEXT NOT NULL,
    plan_session_id TEXT NOT NULL,
    exercise_order INTEGER NOT NULL,
    exercise_name TEXT NOT NULL,
    target_sets INTEGER,
    target_reps_min INTEGER,
    target_reps_max INTEGER,
    target_weight_kg REAL,
    target_rpe REAL,
    intensity_target TEXT,
    progression_weight_rule TEXT,
    progression_reps_rule TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (log_date, plan_session_id, exercise_order),
    FOREIGN KEY (log_date, plan_session_id)
        REFERENCES plan_day_workout_session (log_date, plan_session_id)
        ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id TEXT PRIMARY KEY,
    schema_name TEXT NOT NULL,
    source_tag TEXT NOT NULL,
    total_rows INTEGER NOT NULL,
    imported_rows INTEGER NOT NULL,
    conflict_rows INTEGER NOT NULL,
    invalid_rows INTEGER NOT NULL,
    warned_rows INTEGER NOT NULL,
    imported_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_photo_log_date ON photo_log (log_date);
CREATE INDEX IF NOT EXISTS idx_import_batch_schema ON import_batch (schema_name, imported_at);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）并写入当前 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    match read_schema_version(conn)? {
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            warn!(db_version = v, expected = CURRENT_SCHEMA_VERSION, "数据库版本高于当前程序");
        }
        v => info!(version = ?v, "数据库 schema 就绪"),
    }
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// 优先读取环境变量 `HEALTH_TRACKER_DB_PATH`,否则放在用户数据目录下。
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./health_tracker.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("health-tracker");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("health_tracker.db");
        }
    }
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_exercise_cascade_on_session_delete() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();

        conn.execute_batch(
            r#"
            INSERT INTO plan_day_workout_session
                (log_date, plan_session_id, session_type, created_at, updated_at)
            VALUES ('2026-03-01', 'A', 'pesas', 'x', 'x');
            INSERT INTO plan_day_workout_exercise
                (log_date, plan_session_id, exercise_order, exercise_name, created_at, updated_at)
            VALUES ('2026-03-01', 'A', 1, 'Remo', 'x', 'x');
            DELETE FROM plan_day_workout_session WHERE plan_session_id = 'A';
            "#,
        )
        .unwrap();

        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM plan_day_workout_exercise", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }
}
