// ==========================================
// 医院排班预约系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，并发写入时由 SQLite 排队而不是立即失败
// - 预约表的部分唯一索引作为“不重复预约”的存储层兜底
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库时间戳格式（本地时间，字典序即时间序）
pub const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
/// - WAL 模式下读不阻塞写，对文件库生效，内存库会忽略
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建库（幂等）
///
/// 表:
/// - schema_version / config_kv: 与配置层共用
/// - resource: 资源目录（医生 / 手术室 / 床位）
/// - reservation: 预约（门诊预约 / 手术排期 / 住院）
/// - reservation_transition: 状态流转记录
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
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

        CREATE TABLE IF NOT EXISTS resource (
            resource_id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            display_name TEXT NOT NULL,
            eligibility_tag TEXT,
            group_tag TEXT,
            gender_tag TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            occupancy TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_resource_kind_tag
            ON resource(kind, eligibility_tag, active);

        CREATE TABLE IF NOT EXISTS reservation (
            reservation_id TEXT PRIMARY KEY,
            resource_id TEXT NOT NULL REFERENCES resource(resource_id),
            resource_kind TEXT NOT NULL,
            requester_id TEXT NOT NULL,
            attending_id TEXT,
            start_ts TEXT NOT NULL,
            end_ts TEXT,
            status TEXT NOT NULL,
            origin TEXT NOT NULL,
            urgency TEXT,
            reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            closed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_reservation_resource_start
            ON reservation(resource_id, start_ts);

        -- 同一医生同一时刻只允许一个未取消预约
        CREATE UNIQUE INDEX IF NOT EXISTS ux_reservation_slot
            ON reservation(resource_id, start_ts)
            WHERE resource_kind = 'PRACTITIONER' AND status <> 'CANCELLED';

        -- 同一床位同时只允许一个在院记录
        CREATE UNIQUE INDEX IF NOT EXISTS ux_reservation_admitted
            ON reservation(resource_id)
            WHERE status = 'ADMITTED';

        CREATE TABLE IF NOT EXISTS reservation_transition (
            transition_id TEXT PRIMARY KEY,
            reservation_id TEXT NOT NULL REFERENCES reservation(reservation_id),
            from_status TEXT,
            to_status TEXT NOT NULL,
            actor TEXT NOT NULL,
            transition_ts TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transition_reservation
            ON reservation_transition(reservation_id, transition_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
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
