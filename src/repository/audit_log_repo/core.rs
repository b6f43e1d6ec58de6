use crate::db::format_ts;
use crate::domain::audit_log::AuditLogEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AuditLogRepository - 审计日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    /// 创建新的审计日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入审计日志（独立写入）
    ///
    /// # 返回
    /// - `Ok(log_id)`: 成功插入
    pub fn insert(&self, entry: &AuditLogEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, entry)?;
        Ok(entry.log_id.clone())
    }

    /// 在调用方事务中插入审计日志
    pub fn insert_tx(conn: &Connection, entry: &AuditLogEntry) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO audit_log (
                log_id, project_id, actor_id, actor_role, action,
                entity_type, entity_id, before_json, after_json, note, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.log_id,
                entry.project_id,
                entry.actor_id,
                entry.actor_role.to_db_str(),
                entry.action.to_db_str(),
                entry.entity_type.to_db_str(),
                entry.entity_id,
                entry.before_json.as_ref().map(|v| v.to_string()),
                entry.after_json.as_ref().map(|v| v.to_string()),
                entry.note,
                format_ts(&entry.created_at),
            ],
        )?;

        Ok(())
    }
}
