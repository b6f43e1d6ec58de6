// ==========================================
// 工程项目管理核心 - 审计日志领域模型
// ==========================================
// 红线: 所有核心写入必须记录；只追加，不更新不删除
// 用途: 变更前后快照，审计追踪与导出
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::principal::Principal;
use crate::domain::types::{AuditAction, EntityType, Role};

// ==========================================
// AuditLogEntry - 审计日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub log_id: String,
    pub project_id: String,
    pub actor_id: String,
    pub actor_role: Role,
    pub action: AuditAction,
    pub entity_type: EntityType,
    pub entity_id: String,

    // ===== 变更快照 =====
    pub before_json: Option<JsonValue>,
    pub after_json: Option<JsonValue>,

    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

impl AuditLogEntry {
    /// 以操作人身份创建一条审计记录（快照与备注通过链式方法补充）
    pub fn new(
        project_id: &str,
        actor: &Principal,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            actor_id: actor.user_id.clone(),
            actor_role: actor.role,
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            before_json: None,
            after_json: None,
            note: None,
            created_at: crate::db::now_ts(),
        }
    }

    pub fn with_before(mut self, before: JsonValue) -> Self {
        self.before_json = Some(before);
        self
    }

    pub fn with_after(mut self, after: JsonValue) -> Self {
        self.after_json = Some(after);
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }
}

// ==========================================
// AuditLogFilter - 查询条件
// ==========================================
// 日期区间 [start_date, end_date] 两端均包含
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLogFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// 分页查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogPage {
    pub logs: Vec<AuditLogEntry>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}
