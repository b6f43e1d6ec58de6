// ==========================================
// 工程项目管理核心 - 项目与成员登记
// ==========================================
// 项目创建者自动登记为 OWNER；角色只在项目内有效
// ==========================================

use crate::domain::audit_log::AuditLogEntry;
use crate::domain::principal::Principal;
use crate::domain::project::{Project, ProjectMember};
use crate::domain::types::{AuditAction, EntityType, ProjectStatus, Role};
use crate::engine::audit::AuditRecorder;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lock_conn;
use crate::engine::role_guard::{RoleGuard, OWNER_ONLY};
use crate::repository::ProjectRepository;
use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

pub struct ProjectRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRegistry {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 创建项目并登记创建者为 OWNER
    ///
    /// # 返回
    /// - (Project, Principal): 新项目 + 创建者在该项目内的主体
    #[instrument(skip(self))]
    pub fn create_project(
        &self,
        owner_user_id: &str,
        name: &str,
        status: ProjectStatus,
        is_example: bool,
    ) -> EngineResult<(Project, Principal)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput("项目名称不能为空".to_string()));
        }
        if owner_user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("owner_user_id 不能为空".to_string()));
        }

        let now = crate::db::now_ts();
        let project = Project {
            project_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            status,
            is_example,
            created_by: owner_user_id.to_string(),
            created_at: now,
        };
        let owner = ProjectMember {
            project_id: project.project_id.clone(),
            user_id: owner_user_id.to_string(),
            role: Role::Owner,
            joined_at: now,
        };
        let principal = Principal::new(&project.project_id, owner_user_id, Role::Owner);

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ProjectRepository::insert_tx(&tx, &project)?;
        ProjectRepository::upsert_member_tx(&tx, &owner)?;

        let entry = AuditLogEntry::new(
            &project.project_id,
            &principal,
            AuditAction::ProjectCreated,
            EntityType::Project,
            &project.project_id,
        )
        .with_after(json!({
            "name": project.name,
            "status": project.status,
            "is_example": project.is_example,
            "owner": owner_user_id,
        }));
        AuditRecorder::record_tx(&tx, &entry)?;

        tx.commit()?;

        info!(project_id = %project.project_id, "项目已创建");
        Ok((project, principal))
    }

    /// 添加成员或调整角色（仅 OWNER）
    #[instrument(skip(self, principal), fields(actor = %principal.user_id))]
    pub fn add_member(&self, principal: &Principal, user_id: &str, role: Role) -> EngineResult<ProjectMember> {
        RoleGuard::require_role(principal, OWNER_ONLY)?;

        if user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("user_id 不能为空".to_string()));
        }

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let project_id = principal.project_id.as_str();
        if ProjectRepository::find_by_id_in(&tx, project_id)?.is_none() {
            return Err(EngineError::not_found("Project", project_id));
        }

        let previous = ProjectRepository::find_member_in(&tx, project_id, user_id)?;
        let member = ProjectMember {
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: previous
                .as_ref()
                .map(|m| m.joined_at)
                .unwrap_or_else(crate::db::now_ts),
        };
        ProjectRepository::upsert_member_tx(&tx, &member)?;

        let mut entry = AuditLogEntry::new(
            project_id,
            principal,
            AuditAction::MemberAdded,
            EntityType::ProjectMember,
            user_id,
        )
        .with_after(json!({ "role": role }));
        if let Some(prev) = &previous {
            entry = entry.with_before(json!({ "role": prev.role }));
        }
        AuditRecorder::record_tx(&tx, &entry)?;

        tx.commit()?;

        info!(project_id, user_id, role = %role, "项目成员已登记");
        Ok(member)
    }

    /// 解析用户在项目内的主体（非成员返回 None）
    pub fn resolve_principal(&self, project_id: &str, user_id: &str) -> EngineResult<Option<Principal>> {
        let conn = lock_conn(&self.conn)?;
        let member = ProjectRepository::find_member_in(&conn, project_id, user_id)?;
        Ok(member.map(|m| Principal::new(m.project_id, m.user_id, m.role)))
    }
}
