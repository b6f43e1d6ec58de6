// ==========================================
// 工程项目管理核心 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 启动时幂等地应用 schema
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version（与 `migrations/v0.*.sql` 对齐）
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 库内统一的时间戳存储格式
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CORE_SCHEMA_SQL: &str = include_str!("../migrations/v0.1_core_schema.sql");

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
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

/// 应用核心 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CORE_SCHEMA_SQL)?;
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

/// 当前本地时间（秒精度，与存储格式一致）
pub fn now_ts() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    parse_ts(&format_ts(&now)).unwrap_or(now)
}

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn parse_ts(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT).ok()
}

/// 行映射时解析时间戳列，失败转为 FromSqlConversionFailure
pub(crate) fn ts_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn opt_ts_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => NaiveDateTime::parse_from_str(&raw, TS_FORMAT)
            .map(Some)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
            }),
        None => Ok(None),
    }
}
