use super::core::AuditLogRepository;
use crate::db::{format_ts, ts_column};
use crate::domain::audit_log::{AuditLogEntry, AuditLogFilter};
use crate::domain::types::{AuditAction, EntityType, Role};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{Days, NaiveTime};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Row};

const AUDIT_COLUMNS: &str = r#"log_id, project_id, actor_id, actor_role, action,
    entity_type, entity_id, before_json, after_json, note, created_at"#;

impl AuditLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 log_id 查询单个日志
    pub fn find_by_id(&self, log_id: &str) -> RepositoryResult<Option<AuditLogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM audit_log WHERE log_id = ?", AUDIT_COLUMNS);

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![log_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::map_row(row)?)),
            None => Ok(None),
        }
    }

    /// 查询某实体的全部日志（按时间倒序）
    pub fn find_by_entity(&self, entity_type: EntityType, entity_id: &str) -> RepositoryResult<Vec<AuditLogEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM audit_log WHERE entity_type = ? AND entity_id = ? ORDER BY created_at DESC, rowid DESC",
            AUDIT_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![entity_type.to_db_str(), entity_id])?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next()? {
            logs.push(Self::map_row(row)?);
        }
        Ok(logs)
    }

    /// 按项目与过滤条件分页查询
    ///
    /// # 返回
    /// - (logs, total): 当前页日志 + 满足条件的总数
    pub fn query(
        &self,
        project_id: &str,
        filter: &AuditLogFilter,
        limit: u32,
        offset: u32,
    ) -> RepositoryResult<(Vec<AuditLogEntry>, i64)> {
        let conn = self.get_conn()?;
        Self::query_in(&conn, project_id, filter, limit, offset)
    }

    pub fn query_in(
        conn: &Connection,
        project_id: &str,
        filter: &AuditLogFilter,
        limit: u32,
        offset: u32,
    ) -> RepositoryResult<(Vec<AuditLogEntry>, i64)> {
        let (where_sql, args) = Self::build_where(project_id, filter)?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_log WHERE {}", where_sql),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let mut page_args = args;
        page_args.push(SqlValue::Integer(i64::from(limit)));
        page_args.push(SqlValue::Integer(i64::from(offset)));

        let sql = format!(
            "SELECT {} FROM audit_log WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            AUDIT_COLUMNS, where_sql
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(page_args.iter()))?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next()? {
            logs.push(Self::map_row(row)?);
        }

        Ok((logs, total))
    }

    /// 组装 WHERE 子句（全部参数化）
    ///
    /// 日期区间两端包含: created_at >= start 00:00:00 且 created_at < (end+1) 00:00:00
    fn build_where(project_id: &str, filter: &AuditLogFilter) -> RepositoryResult<(String, Vec<SqlValue>)> {
        let mut clauses = vec!["project_id = ?".to_string()];
        let mut args = vec![SqlValue::Text(project_id.to_string())];

        if let Some(entity_type) = filter.entity_type {
            clauses.push("entity_type = ?".to_string());
            args.push(SqlValue::Text(entity_type.to_db_str().to_string()));
        }
        if let Some(entity_id) = filter.entity_id.as_deref().filter(|s| !s.is_empty()) {
            clauses.push("entity_id = ?".to_string());
            args.push(SqlValue::Text(entity_id.to_string()));
        }
        if let Some(actor_id) = filter.actor_id.as_deref().filter(|s| !s.is_empty()) {
            clauses.push("actor_id = ?".to_string());
            args.push(SqlValue::Text(actor_id.to_string()));
        }
        if let Some(action) = filter.action {
            clauses.push("action = ?".to_string());
            args.push(SqlValue::Text(action.to_db_str().to_string()));
        }
        if let Some(start) = filter.start_date {
            clauses.push("created_at >= ?".to_string());
            args.push(SqlValue::Text(format_ts(&start.and_time(NaiveTime::MIN))));
        }
        if let Some(end) = filter.end_date {
            let next_day = end.checked_add_days(Days::new(1)).ok_or_else(|| {
                RepositoryError::InternalError(format!("结束日期越界: {}", end))
            })?;
            clauses.push("created_at < ?".to_string());
            args.push(SqlValue::Text(format_ts(&next_day.and_time(NaiveTime::MIN))));
        }

        Ok((clauses.join(" AND "), args))
    }

    /// 映射数据库行到AuditLogEntry对象
    fn map_row(row: &Row) -> RepositoryResult<AuditLogEntry> {
        let role_raw: String = row.get(3)?;
        let action_raw: String = row.get(4)?;
        let entity_raw: String = row.get(5)?;

        let integrity = |field: &str, raw: &str| RepositoryError::DataIntegrityError {
            field: format!("audit_log.{}", field),
            message: format!("未知取值: {}", raw),
        };

        Ok(AuditLogEntry {
            log_id: row.get(0)?,
            project_id: row.get(1)?,
            actor_id: row.get(2)?,
            actor_role: Role::from_db_str(&role_raw).ok_or_else(|| integrity("actor_role", &role_raw))?,
            action: AuditAction::from_db_str(&action_raw).ok_or_else(|| integrity("action", &action_raw))?,
            entity_type: EntityType::from_db_str(&entity_raw)
                .ok_or_else(|| integrity("entity_type", &entity_raw))?,
            entity_id: row.get(6)?,
            before_json: row
                .get::<_, Option<String>>(7)?
                .map(|s| serde_json::from_str(&s))
                .transpose()?,
            after_json: row
                .get::<_, Option<String>>(8)?
                .map(|s| serde_json::from_str(&s))
                .transpose()?,
            note: row.get(9)?,
            created_at: ts_column(row, 10)?,
        })
    }
}
