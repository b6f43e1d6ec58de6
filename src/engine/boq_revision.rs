// ==========================================
// 工程项目管理核心 - BOQ 修订引擎
// ==========================================
// 职责: 版本化维护工程量清单（每次修订生成不可变快照 N+1）
// 红线: 校验全部通过前不写入；修订号只增不减
// 红线: 修订号 CAS、条目快照、审计记录、付款资格重算处于同一事务
// 约定: 修订后 BOQ 回到 DRAFT，需重新审批
// ==========================================

mod materializer;

pub use materializer::RevisionMaterializer;

use crate::domain::audit_log::AuditLogEntry;
use crate::domain::boq::{
    Boq, BoqChanges, BoqDetail, BoqItemProgress, BoqRevision, NewBoqItem, NewProgress, ReviseOutcome,
    RevisionSummary,
};
use crate::domain::principal::Principal;
use crate::domain::types::{AuditAction, BoqStatus, EntityType};
use crate::engine::audit::AuditRecorder;
use crate::engine::eligibility::PaymentEligibilityEngine;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lock_conn;
use crate::engine::role_guard::{RoleGuard, BOQ_EDITORS, OWNER_ONLY, READERS};
use crate::repository::{BoqRepository, MilestoneRepository, ProjectRepository};
use rusqlite::{Connection, TransactionBehavior};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// 初始修订的原因文本
pub const INITIAL_REVISION_REASON: &str = "initial revision";

// ==========================================
// BoqRevisionEngine - BOQ 修订引擎
// ==========================================
pub struct BoqRevisionEngine {
    conn: Arc<Mutex<Connection>>,
}

impl BoqRevisionEngine {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建 BOQ（修订 1，DRAFT）
    #[instrument(skip(self, principal, items), fields(user_id = %principal.user_id, items = items.len()))]
    pub fn create_boq(
        &self,
        principal: &Principal,
        project_id: &str,
        title: &str,
        items: Vec<NewBoqItem>,
    ) -> EngineResult<BoqDetail> {
        RoleGuard::require_role(principal, BOQ_EDITORS)?;

        let title = title.trim();
        if title.is_empty() {
            return Err(EngineError::InvalidInput("BOQ 标题不能为空".to_string()));
        }
        for (idx, item) in items.iter().enumerate() {
            RevisionMaterializer::validate_new_item(item, &format!("items[{}]", idx))?;
        }

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !principal.in_scope(project_id) || ProjectRepository::find_by_id_in(&tx, project_id)?.is_none() {
            return Err(EngineError::not_found("Project", project_id));
        }

        let now = crate::db::now_ts();
        let boq = Boq {
            boq_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            status: BoqStatus::Draft,
            revision_no: 1,
            approved_at: None,
            approved_by: None,
            created_by: principal.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        let items = RevisionMaterializer::initial_items(&items);
        let summary = RevisionSummary::of(1, BoqStatus::Draft, &items);
        let revision = BoqRevision {
            boq_id: boq.boq_id.clone(),
            revision_no: 1,
            reason: INITIAL_REVISION_REASON.to_string(),
            item_count: items.len() as i32,
            total_amount: summary.total_amount,
            created_by: principal.user_id.clone(),
            created_at: now,
        };

        BoqRepository::insert_tx(&tx, &boq)?;
        BoqRepository::insert_revision_tx(&tx, &revision)?;
        BoqRepository::insert_items_tx(&tx, &boq.boq_id, 1, &items)?;

        let entry = AuditLogEntry::new(project_id, principal, AuditAction::BoqCreated, EntityType::Boq, &boq.boq_id)
            .with_after(json!({ "title": boq.title, "revision": summary }));
        AuditRecorder::record_tx(&tx, &entry)?;

        tx.commit()?;

        info!(boq_id = %boq.boq_id, items = items.len(), "BOQ 已创建");
        Ok(BoqDetail {
            revision_no: 1,
            items,
            revisions: vec![revision],
            boq,
        })
    }

    // ==========================================
    // 修订
    // ==========================================

    /// 修订 BOQ，生成修订 N+1
    ///
    /// # 校验顺序
    /// 1. 原因非空 → INVALID_INPUT
    /// 2. 新增条目数量/单价为正 → INVALID_INPUT
    /// 3. update/remove 引用的条目存在于修订 N → NOT_FOUND
    /// 4. 删除的条目无进度/付款记录 → CONFLICT
    /// 5. 物化修订 N+1 并以 CAS 推进修订号
    #[instrument(skip(self, principal, reason, changes), fields(user_id = %principal.user_id))]
    pub fn revise(
        &self,
        principal: &Principal,
        boq_id: &str,
        reason: &str,
        changes: &BoqChanges,
        expected_revision: Option<i32>,
    ) -> EngineResult<ReviseOutcome> {
        let result = self.revise_inner(principal, boq_id, reason, changes, expected_revision);
        if let Err(e) = &result {
            warn!(boq_id, error = %e, "BOQ 修订被拒绝");
        }
        result
    }

    fn revise_inner(
        &self,
        principal: &Principal,
        boq_id: &str,
        reason: &str,
        changes: &BoqChanges,
        expected_revision: Option<i32>,
    ) -> EngineResult<ReviseOutcome> {
        RoleGuard::require_role(principal, BOQ_EDITORS)?;

        let reason = RevisionMaterializer::validate_reason(reason)?;
        RevisionMaterializer::validate_shape(changes)?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let boq = load_scoped(&tx, principal, boq_id)?;
        if let Some(expected) = expected_revision {
            if expected != boq.revision_no {
                return Err(EngineError::Conflict(format!(
                    "BOQ {} 已被其他请求修订（期望修订号={}，当前={}）",
                    boq_id, expected, boq.revision_no
                )));
            }
        }

        let current = BoqRepository::find_items_in(&tx, boq_id, boq.revision_no)?;
        RevisionMaterializer::check_references(&current, changes)?;

        let with_progress = BoqRepository::item_ids_with_progress_in(&tx, boq_id, &changes.remove_item_ids)?;
        RevisionMaterializer::check_removals(changes, &with_progress)?;

        let next_items = RevisionMaterializer::materialize(&current, changes);

        let now = crate::db::now_ts();
        let next_no = BoqRepository::advance_revision_tx(&tx, boq_id, boq.revision_no, &now)?;

        let before = RevisionSummary::of(boq.revision_no, boq.status, &current);
        let after = RevisionSummary::of(next_no, BoqStatus::Draft, &next_items);

        BoqRepository::insert_revision_tx(
            &tx,
            &BoqRevision {
                boq_id: boq_id.to_string(),
                revision_no: next_no,
                reason: reason.clone(),
                item_count: next_items.len() as i32,
                total_amount: after.total_amount,
                created_by: principal.user_id.clone(),
                created_at: now,
            },
        )?;
        BoqRepository::insert_items_tx(&tx, boq_id, next_no, &next_items)?;

        let entry = AuditLogEntry::new(&boq.project_id, principal, AuditAction::BoqRevised, EntityType::Boq, boq_id)
            .with_before(serde_json::to_value(&before)?)
            .with_after(serde_json::to_value(&after)?)
            .with_note(Some(reason));
        AuditRecorder::record_tx(&tx, &entry)?;

        PaymentEligibilityEngine::recalculate_for_boq_tx(&tx, boq_id)?;
        tx.commit()?;

        info!(
            boq_id,
            from = boq.revision_no,
            to = next_no,
            added = changes.add_items.len(),
            updated = changes.update_items.len(),
            removed = changes.remove_item_ids.len(),
            "BOQ 修订完成"
        );
        Ok(ReviseOutcome {
            boq_id: boq_id.to_string(),
            revision_number: next_no,
        })
    }

    // ==========================================
    // 审批
    // ==========================================

    /// 审批当前修订（DRAFT → APPROVED，仅 OWNER）
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub fn approve(&self, principal: &Principal, boq_id: &str) -> EngineResult<Boq> {
        RoleGuard::require_role(principal, OWNER_ONLY)?;

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = load_scoped(&tx, principal, boq_id)?;
        if before.is_approved() {
            warn!(boq_id, revision_no = before.revision_no, "BOQ 已审批，拒绝重复审批");
            return Err(EngineError::Conflict(format!(
                "BOQ {} 修订 {} 已审批",
                boq_id, before.revision_no
            )));
        }

        let now = crate::db::now_ts();
        BoqRepository::approve_tx(&tx, boq_id, before.revision_no, &principal.user_id, &now)?;

        let mut after = before.clone();
        after.status = BoqStatus::Approved;
        after.approved_at = Some(now);
        after.approved_by = Some(principal.user_id.clone());
        after.updated_at = now;

        let entry = AuditLogEntry::new(&after.project_id, principal, AuditAction::BoqApproved, EntityType::Boq, boq_id)
            .with_before(json!({ "status": before.status, "revision_no": before.revision_no }))
            .with_after(json!({ "status": after.status, "revision_no": after.revision_no }));
        AuditRecorder::record_tx(&tx, &entry)?;

        let verdicts = PaymentEligibilityEngine::recalculate_for_boq_tx(&tx, boq_id)?;
        tx.commit()?;

        info!(boq_id, revision_no = after.revision_no, milestones = verdicts.len(), "BOQ 审批完成");
        Ok(after)
    }

    // ==========================================
    // 进度/付款记录
    // ==========================================

    /// 记录条目进度（此后该条目不可在修订中删除）
    #[instrument(skip(self, principal, progress), fields(user_id = %principal.user_id, item_id = %progress.item_id))]
    pub fn record_progress(
        &self,
        principal: &Principal,
        boq_id: &str,
        progress: NewProgress,
    ) -> EngineResult<BoqItemProgress> {
        RoleGuard::require_role(principal, BOQ_EDITORS)?;

        if !(progress.quantity.is_finite() && progress.quantity > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "quantity 必须为正数: {}",
                progress.quantity
            )));
        }
        if !(progress.amount.is_finite() && progress.amount >= 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "amount 不能为负: {}",
                progress.amount
            )));
        }

        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let boq = load_scoped(&tx, principal, boq_id)?;
        let current = BoqRepository::find_items_in(&tx, boq_id, boq.revision_no)?;
        if !current.iter().any(|i| i.item_id == progress.item_id) {
            return Err(EngineError::not_found("BoqItem", &progress.item_id));
        }
        if let Some(milestone_id) = progress.milestone_id.as_deref() {
            MilestoneRepository::find_by_id_in(&tx, milestone_id)?
                .filter(|m| m.project_id == boq.project_id)
                .ok_or_else(|| EngineError::not_found("Milestone", milestone_id))?;
        }

        let record = BoqItemProgress {
            progress_id: uuid::Uuid::new_v4().to_string(),
            boq_id: boq_id.to_string(),
            item_id: progress.item_id,
            milestone_id: progress.milestone_id,
            quantity: progress.quantity,
            amount: progress.amount,
            recorded_by: principal.user_id.clone(),
            recorded_at: crate::db::now_ts(),
        };
        BoqRepository::insert_progress_tx(&tx, &record)?;

        let entry = AuditLogEntry::new(
            &boq.project_id,
            principal,
            AuditAction::ProgressRecorded,
            EntityType::BoqItemProgress,
            &record.progress_id,
        )
        .with_after(json!({
            "boq_id": record.boq_id,
            "item_id": record.item_id,
            "milestone_id": record.milestone_id,
            "quantity": record.quantity,
            "amount": record.amount,
        }));
        AuditRecorder::record_tx(&tx, &entry)?;

        tx.commit()?;

        info!(boq_id, progress_id = %record.progress_id, "进度已记录");
        Ok(record)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// BOQ 详情（revision 缺省为当前修订）
    pub fn get_detail(&self, principal: &Principal, boq_id: &str, revision: Option<i32>) -> EngineResult<BoqDetail> {
        RoleGuard::require_role(principal, READERS)?;

        let conn = lock_conn(&self.conn)?;
        let boq = load_scoped(&conn, principal, boq_id)?;

        let revision_no = revision.unwrap_or(boq.revision_no);
        if revision_no < 1 || revision_no > boq.revision_no {
            return Err(EngineError::not_found(
                "BoqRevision",
                &format!("{}@{}", boq_id, revision_no),
            ));
        }

        Ok(BoqDetail {
            items: BoqRepository::find_items_in(&conn, boq_id, revision_no)?,
            revisions: BoqRepository::list_revisions_in(&conn, boq_id)?,
            revision_no,
            boq,
        })
    }

    /// 条目的进度/付款历史
    pub fn item_progress(&self, principal: &Principal, boq_id: &str, item_id: &str) -> EngineResult<Vec<BoqItemProgress>> {
        RoleGuard::require_role(principal, READERS)?;

        let conn = lock_conn(&self.conn)?;
        load_scoped(&conn, principal, boq_id)?;
        Ok(BoqRepository::find_progress_by_item_in(&conn, boq_id, item_id)?)
    }
}

/// 读取 BOQ（项目外的实体一律视为不存在）
fn load_scoped(conn: &Connection, principal: &Principal, boq_id: &str) -> EngineResult<Boq> {
    BoqRepository::find_by_id_in(conn, boq_id)?
        .filter(|b| principal.in_scope(&b.project_id))
        .ok_or_else(|| EngineError::not_found("Boq", boq_id))
}
