// ==========================================
// 工程项目管理核心 - 付款资格引擎
// ==========================================
// 输入: milestone (state, is_extra, extra_approved_at) + boq.status
// 输出: payment_eligibility (同事务覆盖写入)
// 红线: 只记录派生判定，不修改里程碑状态
// 红线: 判定结论不变时不重写（computed_at 保持原值）
// ==========================================

use crate::domain::eligibility::{EligibilityInputs, EligibilityVerdict};
use crate::domain::milestone::Milestone;
use crate::engine::eligibility_core::EligibilityCore;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::lock_conn;
use crate::repository::{BoqRepository, EligibilityRepository, MilestoneRepository};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

// ==========================================
// PaymentEligibilityEngine - 付款资格引擎
// ==========================================
pub struct PaymentEligibilityEngine {
    conn: Arc<Mutex<Connection>>,
}

impl PaymentEligibilityEngine {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 独立重算单个里程碑（自带事务）
    #[instrument(skip(self))]
    pub fn recalculate(&self, milestone_id: &str) -> EngineResult<EligibilityVerdict> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let milestone = MilestoneRepository::find_by_id_in(&tx, milestone_id)?
            .ok_or_else(|| EngineError::not_found("Milestone", milestone_id))?;
        let verdict = Self::recalculate_tx(&tx, &milestone)?;

        tx.commit()?;
        Ok(verdict)
    }

    /// 读取判定输入（无 BOQ 视为未审批）
    pub fn inputs_in(conn: &Connection, milestone: &Milestone) -> EngineResult<EligibilityInputs> {
        let boq_approved = match milestone.boq_id.as_deref() {
            Some(boq_id) => BoqRepository::find_by_id_in(conn, boq_id)?
                .map(|boq| boq.is_approved())
                .unwrap_or(false),
            None => false,
        };

        Ok(EligibilityInputs {
            state: milestone.state,
            boq_approved,
            is_extra: milestone.is_extra,
            extra_approved: milestone.is_extra_approved(),
        })
    }

    /// 在调用方事务内重算并记录判定
    pub fn recalculate_tx(conn: &Connection, milestone: &Milestone) -> EngineResult<EligibilityVerdict> {
        let inputs = Self::inputs_in(conn, milestone)?;
        let fresh = EligibilityCore::verdict(&milestone.milestone_id, &inputs, crate::db::now_ts());

        if let Some(stored) = EligibilityRepository::find_by_milestone_in(conn, &milestone.milestone_id)? {
            if stored.same_outcome(&fresh) {
                debug!(milestone_id = %milestone.milestone_id, eligible = stored.eligible, "付款资格未变化");
                return Ok(stored);
            }
        }

        EligibilityRepository::upsert_tx(conn, &fresh)?;
        debug!(
            milestone_id = %milestone.milestone_id,
            eligible = fresh.eligible,
            reason = ?fresh.reason_code,
            "付款资格已重算"
        );
        Ok(fresh)
    }

    /// 重算挂在某个 BOQ 上的全部里程碑（BOQ 审批/修订后调用）
    pub fn recalculate_for_boq_tx(conn: &Connection, boq_id: &str) -> EngineResult<Vec<EligibilityVerdict>> {
        MilestoneRepository::find_by_boq_in(conn, boq_id)?
            .iter()
            .map(|milestone| Self::recalculate_tx(conn, milestone))
            .collect()
    }
}
