// ==========================================
// 工程项目管理核心 - 里程碑状态机
// ==========================================
// 职责: 校验转换边与前置条件 → CAS 写入状态 → 审计 → 重算付款资格
// 红线: 状态写入、审计记录、资格判定处于同一 IMMEDIATE 事务
// 红线: 任何校验失败均发生在写入之前（不写状态、不写审计、不重算）
// ==========================================

mod rules;

pub use rules::{TransitionRules, ALLOWED_EDGES};

use crate::domain::audit_log::AuditLogEntry;
use crate::domain::milestone::{
    Evidence, EvidenceFile, Milestone, MilestoneDetail, NewEvidenceFile, NewMilestone, TransitionOutcome,
};
use crate::domain::principal::Principal;
use crate::domain::types::{AuditAction, EntityType, MilestoneState};
use crate::engine::audit::AuditRecorder;
use crate::engine::eligibility::PaymentEligibilityEngine;
use crate::engine::eligibility_core::EligibilityCore;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lock_conn;
use crate::engine::role_guard::{
    RoleGuard, BOQ_EDITORS, EVIDENCE_SUBMITTERS, MILESTONE_ACTORS, OWNER_ONLY, READERS, VERIFIERS,
};
use crate::repository::{
    BoqRepository, EligibilityRepository, MilestoneRepository, ProjectRepository,
};
use rusqlite::{Connection, TransactionBehavior};
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

// ==========================================
// MilestoneStateMachine - 里程碑状态机
// ==========================================
pub struct MilestoneStateMachine {
    conn: Arc<Mutex<Connection>>,
}

impl MilestoneStateMachine {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    // ==========================================
    // 状态转换
    // ==========================================

    /// 执行状态转换
    ///
    /// # 校验顺序
    /// 1. 角色 ∈ {OWNER, PMC, VENDOR}
    /// 2. 里程碑存在且属于主体项目
    /// 3. expected_revision（若提供）与当前修订号一致
    /// 4. 边在转换图内
    /// 5. 边前置条件（VERIFIED 需核验角色；SUBMITTED 需证据；CLOSED 需付款资格）
    ///
    /// # 错误
    /// - `Forbidden` / `NotFound` / `Conflict` / `InvalidTransition` / `PreconditionFailed`
    #[instrument(skip(self, principal, reason), fields(user_id = %principal.user_id, role = %principal.role))]
    pub fn transition(
        &self,
        principal: &Principal,
        milestone_id: &str,
        to_state: MilestoneState,
        reason: Option<String>,
        expected_revision: Option<i32>,
    ) -> EngineResult<TransitionOutcome> {
        let result = self.transition_inner(principal, milestone_id, to_state, reason, expected_revision);
        if let Err(e) = &result {
            warn!(milestone_id, to = %to_state, error = %e, "里程碑状态转换被拒绝");
        }
        result
    }

    fn transition_inner(
        &self,
        principal: &Principal,
        milestone_id: &str,
        to_state: MilestoneState,
        reason: Option<String>,
        expected_revision: Option<i32>,
    ) -> EngineResult<TransitionOutcome> {
        RoleGuard::require_role(principal, MILESTONE_ACTORS)?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = load_scoped(&tx, principal, milestone_id)?;
        check_expected_revision(&before, expected_revision)?;

        if !TransitionRules::is_allowed(before.state, to_state) {
            return Err(EngineError::InvalidTransition {
                from: before.state,
                to: to_state,
            });
        }
        Self::check_preconditions(&tx, principal, &before, to_state)?;

        let now = crate::db::now_ts();
        let new_revision = MilestoneRepository::update_state_tx(
            &tx,
            milestone_id,
            before.state,
            before.revision,
            to_state,
            &now,
        )?;

        let mut after = before.clone();
        after.state = to_state;
        after.revision = new_revision;
        after.updated_at = now;

        let entry = AuditLogEntry::new(
            &after.project_id,
            principal,
            AuditAction::MilestoneTransitioned,
            EntityType::Milestone,
            milestone_id,
        )
        .with_before(snapshot(&before))
        .with_after(snapshot(&after))
        .with_note(reason);
        AuditRecorder::record_tx(&tx, &entry)?;

        let eligibility = PaymentEligibilityEngine::recalculate_tx(&tx, &after)?;
        tx.commit()?;

        info!(
            milestone_id,
            from = %before.state,
            to = %after.state,
            revision = after.revision,
            eligible = eligibility.eligible,
            "里程碑状态转换完成"
        );
        Ok(TransitionOutcome {
            milestone: after,
            eligibility,
        })
    }

    /// 边前置条件
    fn check_preconditions(
        conn: &Connection,
        principal: &Principal,
        milestone: &Milestone,
        to_state: MilestoneState,
    ) -> EngineResult<()> {
        match to_state {
            MilestoneState::Verified => RoleGuard::require_role(principal, VERIFIERS),
            MilestoneState::Submitted => {
                let evidence_count = MilestoneRepository::count_evidence_in(conn, &milestone.milestone_id)?;
                if evidence_count == 0 {
                    return Err(EngineError::PreconditionFailed(
                        "提交前至少需要一条证据".to_string(),
                    ));
                }
                Ok(())
            }
            MilestoneState::Closed => {
                let inputs = PaymentEligibilityEngine::inputs_in(conn, milestone)?;
                match EligibilityCore::evaluate(&inputs) {
                    Ok(()) => Ok(()),
                    Err(reason) => Err(EngineError::PreconditionFailed(format!(
                        "关闭前需具备付款资格: {}",
                        reason
                    ))),
                }
            }
            MilestoneState::Draft | MilestoneState::InProgress => Ok(()),
        }
    }

    // ==========================================
    // 额外工作审批
    // ==========================================

    /// 审批额外工作（仅 OWNER，只允许一次）
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub fn approve_extra(&self, principal: &Principal, milestone_id: &str) -> EngineResult<TransitionOutcome> {
        RoleGuard::require_role(principal, OWNER_ONLY)?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = load_scoped(&tx, principal, milestone_id)?;
        if !before.is_extra {
            return Err(EngineError::PreconditionFailed(format!(
                "里程碑 {} 不是额外工作",
                milestone_id
            )));
        }
        if before.is_extra_approved() {
            warn!(milestone_id, "额外工作已审批，拒绝重复审批");
            return Err(EngineError::Conflict(format!(
                "里程碑 {} 的额外工作已审批",
                milestone_id
            )));
        }

        let now = crate::db::now_ts();
        let new_revision =
            MilestoneRepository::set_extra_approval_tx(&tx, milestone_id, before.revision, &principal.user_id, &now)?;

        let mut after = before.clone();
        after.extra_approved_at = Some(now);
        after.extra_approved_by = Some(principal.user_id.clone());
        after.revision = new_revision;
        after.updated_at = now;

        let entry = AuditLogEntry::new(
            &after.project_id,
            principal,
            AuditAction::ExtraApproved,
            EntityType::Milestone,
            milestone_id,
        )
        .with_before(snapshot(&before))
        .with_after(snapshot(&after));
        AuditRecorder::record_tx(&tx, &entry)?;

        let eligibility = PaymentEligibilityEngine::recalculate_tx(&tx, &after)?;
        tx.commit()?;

        info!(milestone_id, eligible = eligibility.eligible, "额外工作审批完成");
        Ok(TransitionOutcome {
            milestone: after,
            eligibility,
        })
    }

    // ==========================================
    // 创建 / 证据
    // ==========================================

    /// 创建里程碑（初始 DRAFT，同时写入初始付款资格）
    #[instrument(skip(self, principal, request), fields(user_id = %principal.user_id))]
    pub fn create_milestone(
        &self,
        principal: &Principal,
        project_id: &str,
        request: NewMilestone,
    ) -> EngineResult<Milestone> {
        RoleGuard::require_role(principal, BOQ_EDITORS)?;

        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(EngineError::InvalidInput("里程碑标题不能为空".to_string()));
        }
        if request.boq_id.is_none() && !request.linked_item_ids.is_empty() {
            return Err(EngineError::InvalidInput(
                "关联清单条目时必须指定 boq_id".to_string(),
            ));
        }

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !principal.in_scope(project_id) || ProjectRepository::find_by_id_in(&tx, project_id)?.is_none() {
            return Err(EngineError::not_found("Project", project_id));
        }

        let mut linked_item_ids = request.linked_item_ids.clone();
        linked_item_ids.sort();
        linked_item_ids.dedup();

        if let Some(boq_id) = request.boq_id.as_deref() {
            let boq = BoqRepository::find_by_id_in(&tx, boq_id)?
                .filter(|b| b.project_id == project_id)
                .ok_or_else(|| EngineError::not_found("Boq", boq_id))?;
            let current: HashSet<String> = BoqRepository::find_items_in(&tx, boq_id, boq.revision_no)?
                .into_iter()
                .map(|i| i.item_id)
                .collect();
            if let Some(missing) = linked_item_ids.iter().find(|id| !current.contains(*id)) {
                return Err(EngineError::not_found("BoqItem", missing));
            }
        }

        let now = crate::db::now_ts();
        let milestone = Milestone {
            milestone_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            boq_id: request.boq_id.clone(),
            title,
            state: MilestoneState::Draft,
            is_extra: request.is_extra,
            extra_approved_at: None,
            extra_approved_by: None,
            revision: 1,
            created_by: principal.user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        MilestoneRepository::insert_tx(&tx, &milestone)?;
        MilestoneRepository::link_items_tx(&tx, &milestone.milestone_id, &linked_item_ids)?;

        let entry = AuditLogEntry::new(
            project_id,
            principal,
            AuditAction::MilestoneCreated,
            EntityType::Milestone,
            &milestone.milestone_id,
        )
        .with_after(json!({
            "title": milestone.title,
            "boq_id": milestone.boq_id,
            "linked_item_ids": linked_item_ids,
            "state": milestone.state,
            "is_extra": milestone.is_extra,
        }));
        AuditRecorder::record_tx(&tx, &entry)?;

        PaymentEligibilityEngine::recalculate_tx(&tx, &milestone)?;
        tx.commit()?;

        info!(milestone_id = %milestone.milestone_id, is_extra = milestone.is_extra, "里程碑已创建");
        Ok(milestone)
    }

    /// 提交证据（CLOSED 里程碑不再接收）
    #[instrument(skip(self, principal, note, files), fields(user_id = %principal.user_id))]
    pub fn submit_evidence(
        &self,
        principal: &Principal,
        milestone_id: &str,
        note: Option<String>,
        files: Vec<NewEvidenceFile>,
    ) -> EngineResult<Evidence> {
        RoleGuard::require_role(principal, EVIDENCE_SUBMITTERS)?;

        for (idx, file) in files.iter().enumerate() {
            if file.file_name.trim().is_empty() || file.storage_key.trim().is_empty() {
                return Err(EngineError::InvalidInput(format!(
                    "files[{}]: file_name 与 storage_key 不能为空",
                    idx
                )));
            }
            if matches!(file.size_bytes, Some(size) if size < 0) {
                return Err(EngineError::InvalidInput(format!("files[{}]: size_bytes 不能为负", idx)));
            }
        }

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let milestone = load_scoped(&tx, principal, milestone_id)?;
        if milestone.state.is_terminal() {
            return Err(EngineError::PreconditionFailed(format!(
                "里程碑 {} 已关闭，不能再提交证据",
                milestone_id
            )));
        }

        let evidence = Evidence {
            evidence_id: uuid::Uuid::new_v4().to_string(),
            milestone_id: milestone_id.to_string(),
            submitted_by: principal.user_id.clone(),
            note: note.filter(|n| !n.trim().is_empty()),
            submitted_at: crate::db::now_ts(),
            files: files
                .into_iter()
                .map(|f| EvidenceFile {
                    file_id: uuid::Uuid::new_v4().to_string(),
                    file_name: f.file_name,
                    storage_key: f.storage_key,
                    content_type: f.content_type,
                    size_bytes: f.size_bytes,
                })
                .collect(),
        };
        MilestoneRepository::insert_evidence_tx(&tx, &evidence)?;

        let entry = AuditLogEntry::new(
            &milestone.project_id,
            principal,
            AuditAction::EvidenceSubmitted,
            EntityType::Evidence,
            &evidence.evidence_id,
        )
        .with_after(json!({
            "milestone_id": milestone_id,
            "file_count": evidence.files.len(),
        }))
        .with_note(evidence.note.clone());
        AuditRecorder::record_tx(&tx, &entry)?;

        tx.commit()?;

        info!(milestone_id, evidence_id = %evidence.evidence_id, files = evidence.files.len(), "证据已提交");
        Ok(evidence)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_milestone(&self, principal: &Principal, milestone_id: &str) -> EngineResult<MilestoneDetail> {
        RoleGuard::require_role(principal, READERS)?;

        let conn = lock_conn(&self.conn)?;
        let milestone = load_scoped(&conn, principal, milestone_id)?;

        Ok(MilestoneDetail {
            linked_item_ids: MilestoneRepository::linked_item_ids_in(&conn, milestone_id)?,
            evidence_count: MilestoneRepository::count_evidence_in(&conn, milestone_id)?,
            eligibility: EligibilityRepository::find_by_milestone_in(&conn, milestone_id)?,
            milestone,
        })
    }

    pub fn list_evidence(&self, principal: &Principal, milestone_id: &str) -> EngineResult<Vec<Evidence>> {
        RoleGuard::require_role(principal, READERS)?;

        let conn = lock_conn(&self.conn)?;
        load_scoped(&conn, principal, milestone_id)?;
        Ok(MilestoneRepository::find_evidence_in(&conn, milestone_id)?)
    }
}

/// 读取里程碑（项目外的实体一律视为不存在）
fn load_scoped(conn: &Connection, principal: &Principal, milestone_id: &str) -> EngineResult<Milestone> {
    MilestoneRepository::find_by_id_in(conn, milestone_id)?
        .filter(|m| principal.in_scope(&m.project_id))
        .ok_or_else(|| EngineError::not_found("Milestone", milestone_id))
}

fn check_expected_revision(milestone: &Milestone, expected: Option<i32>) -> EngineResult<()> {
    match expected {
        Some(expected) if expected != milestone.revision => Err(EngineError::Conflict(format!(
            "里程碑 {} 已被其他请求修改（期望修订号={}，当前={}）",
            milestone.milestone_id, expected, milestone.revision
        ))),
        _ => Ok(()),
    }
}

/// 审计快照
fn snapshot(milestone: &Milestone) -> JsonValue {
    json!({
        "state": milestone.state,
        "revision": milestone.revision,
        "is_extra": milestone.is_extra,
        "extra_approved_at": milestone.extra_approved_at.as_ref().map(crate::db::format_ts),
        "extra_approved_by": milestone.extra_approved_by,
    })
}
