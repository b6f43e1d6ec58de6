// ==========================================
// 工程项目管理核心 - 审计记录器
// ==========================================
// 红线: 审计写入与主变更处于同一事务，写入失败即整体失败
// 红线: 只追加，不提供更新/删除入口
// 导出: CSV 列顺序固定（AUDIT_CSV_HEADER）
// ==========================================

use crate::db::format_ts;
use crate::domain::audit_log::{AuditLogEntry, AuditLogFilter, AuditLogPage};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{AuditLogRepository, RepositoryError};
use csv::Writer;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// 导出 CSV 表头
pub const AUDIT_CSV_HEADER: &[&str] = &[
    "created_at",
    "log_id",
    "project_id",
    "actor_id",
    "actor_role",
    "action",
    "entity_type",
    "entity_id",
    "note",
    "before_json",
    "after_json",
];

/// 查询分页限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub export_max_rows: u32,
}

impl Default for AuditLimits {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
            export_max_rows: 50_000,
        }
    }
}

impl AuditLimits {
    /// 未指定 → 默认页大小；超过上限 → 截断；0 视为默认
    pub fn effective_limit(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) | None => self.default_page_size,
            Some(n) => n.min(self.max_page_size),
        }
    }
}

// ==========================================
// AuditRecorder - 审计记录器
// ==========================================
pub struct AuditRecorder {
    repo: Arc<AuditLogRepository>,
}

impl AuditRecorder {
    pub fn new(repo: Arc<AuditLogRepository>) -> Self {
        Self { repo }
    }

    /// 在调用方事务内追加一条审计记录
    pub fn record_tx(conn: &Connection, entry: &AuditLogEntry) -> EngineResult<()> {
        AuditLogRepository::insert_tx(conn, entry)?;
        debug!(
            log_id = %entry.log_id,
            action = %entry.action,
            entity_id = %entry.entity_id,
            "审计记录已写入"
        );
        Ok(())
    }

    /// 按项目过滤分页查询
    #[instrument(skip(self, filter, limits))]
    pub fn query(&self, project_id: &str, filter: &AuditLogFilter, limits: &AuditLimits) -> EngineResult<AuditLogPage> {
        Self::validate_filter(filter)?;

        let limit = limits.effective_limit(filter.limit);
        let offset = filter.offset.unwrap_or(0);
        let (logs, total) = self.repo.query(project_id, filter, limit, offset)?;

        debug!(returned = logs.len(), total, limit, offset, "审计日志查询完成");
        Ok(AuditLogPage {
            logs,
            total,
            limit,
            offset,
        })
    }

    /// 导出过滤结果为 CSV（忽略分页，最多 export_max_rows 行）
    #[instrument(skip(self, filter, limits))]
    pub fn export_csv(&self, project_id: &str, filter: &AuditLogFilter, limits: &AuditLimits) -> EngineResult<String> {
        Self::validate_filter(filter)?;

        let (logs, total) = self.repo.query(project_id, filter, limits.export_max_rows, 0)?;
        let csv = render_csv(&logs)?;

        info!(rows = logs.len(), total, "审计日志已导出");
        Ok(csv)
    }

    fn validate_filter(filter: &AuditLogFilter) -> EngineResult<()> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(EngineError::InvalidInput(format!(
                    "start_date({}) 晚于 end_date({})",
                    start, end
                )));
            }
        }
        Ok(())
    }
}

/// 渲染 CSV（转义逗号、引号、换行由 csv 写入器负责）
pub fn render_csv(logs: &[AuditLogEntry]) -> EngineResult<String> {
    let mut wtr = Writer::from_writer(Vec::new());
    wtr.write_record(AUDIT_CSV_HEADER).map_err(export_error)?;

    for entry in logs {
        let before = entry.before_json.as_ref().map(|v| v.to_string()).unwrap_or_default();
        let after = entry.after_json.as_ref().map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([
            format_ts(&entry.created_at).as_str(),
            entry.log_id.as_str(),
            entry.project_id.as_str(),
            entry.actor_id.as_str(),
            entry.actor_role.to_db_str(),
            entry.action.to_db_str(),
            entry.entity_type.to_db_str(),
            entry.entity_id.as_str(),
            entry.note.as_deref().unwrap_or(""),
            before.as_str(),
            after.as_str(),
        ])
        .map_err(export_error)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| export_error(e.to_string()))?;
    String::from_utf8(bytes).map_err(export_error)
}

fn export_error(err: impl ToString) -> EngineError {
    EngineError::Repository(RepositoryError::SerializationError(format!(
        "CSV 导出失败: {}",
        err.to_string()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::principal::Principal;
    use crate::domain::types::{AuditAction, EntityType, Role};
    use serde_json::json;

    #[test]
    fn test_effective_limit_defaults_and_clamps() {
        let limits = AuditLimits::default();
        assert_eq!(limits.effective_limit(None), 100);
        assert_eq!(limits.effective_limit(Some(0)), 100);
        assert_eq!(limits.effective_limit(Some(25)), 25);
        assert_eq!(limits.effective_limit(Some(5000)), 1000);
    }

    #[test]
    fn test_render_csv_escapes_free_text() {
        let actor = Principal::new("p1", "u1", Role::Owner);
        let entry = AuditLogEntry::new("p1", &actor, AuditAction::BoqRevised, EntityType::Boq, "b1")
            .with_before(json!({"revision_no": 1}))
            .with_after(json!({"revision_no": 2}))
            .with_note(Some("scope change, \"phase 2\"\nsecond line".to_string()));

        let csv = render_csv(&[entry]).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), AUDIT_CSV_HEADER.to_vec());

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][8], "scope change, \"phase 2\"\nsecond line");
        assert_eq!(&records[0][5], "BOQ_REVISED");
        assert_eq!(&records[0][9], r#"{"revision_no":1}"#);
    }

    #[test]
    fn test_render_csv_empty_has_header_only() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("created_at,log_id,"));
    }
}
