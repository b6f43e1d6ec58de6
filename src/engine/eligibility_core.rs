// ==========================================
// 工程项目管理核心 - 付款资格判定纯函数
// ==========================================
// 职责: 由里程碑状态、BOQ 审批、额外工作审批推导付款资格
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::domain::eligibility::{EligibilityInputs, EligibilityVerdict, IneligibleReason};
use chrono::NaiveDateTime;

// ==========================================
// EligibilityCore - 判定表
// ==========================================
pub struct EligibilityCore;

impl EligibilityCore {
    /// 判定是否可付款
    ///
    /// # 规则（自上而下）
    /// 1. 状态不在 VERIFIED/CLOSED → milestone not verified
    /// 2. 额外工作: 已审批 → 可付款（不看 BOQ）；未审批 → extra pending approval
    /// 3. 非额外工作: BOQ 已审批 → 可付款；否则 → BOQ not approved
    pub fn evaluate(inputs: &EligibilityInputs) -> Result<(), IneligibleReason> {
        if !inputs.state.is_verified_or_closed() {
            return Err(IneligibleReason::MilestoneNotVerified);
        }

        if inputs.is_extra {
            return if inputs.extra_approved {
                Ok(())
            } else {
                Err(IneligibleReason::ExtraPendingApproval)
            };
        }

        if inputs.boq_approved {
            Ok(())
        } else {
            Err(IneligibleReason::BoqNotApproved)
        }
    }

    /// 生成带时间戳的判定结论
    pub fn verdict(milestone_id: &str, inputs: &EligibilityInputs, computed_at: NaiveDateTime) -> EligibilityVerdict {
        let outcome = Self::evaluate(inputs);
        EligibilityVerdict {
            milestone_id: milestone_id.to_string(),
            eligible: outcome.is_ok(),
            reason_code: outcome.err(),
            reason: outcome.err().map(|r| r.message().to_string()),
            computed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MilestoneState;

    fn inputs(state: MilestoneState, boq_approved: bool, is_extra: bool, extra_approved: bool) -> EligibilityInputs {
        EligibilityInputs {
            state,
            boq_approved,
            is_extra,
            extra_approved,
        }
    }

    #[test]
    fn test_verified_with_approved_boq_is_eligible() {
        for state in [MilestoneState::Verified, MilestoneState::Closed] {
            assert_eq!(EligibilityCore::evaluate(&inputs(state, true, false, false)), Ok(()));
        }
    }

    #[test]
    fn test_approved_extra_is_eligible_regardless_of_boq() {
        for boq_approved in [true, false] {
            assert_eq!(
                EligibilityCore::evaluate(&inputs(MilestoneState::Verified, boq_approved, true, true)),
                Ok(())
            );
        }
    }

    #[test]
    fn test_unapproved_extra_is_pending() {
        for boq_approved in [true, false] {
            assert_eq!(
                EligibilityCore::evaluate(&inputs(MilestoneState::Closed, boq_approved, true, false)),
                Err(IneligibleReason::ExtraPendingApproval)
            );
        }
    }

    #[test]
    fn test_unapproved_boq_blocks_regular_milestone() {
        assert_eq!(
            EligibilityCore::evaluate(&inputs(MilestoneState::Verified, false, false, false)),
            Err(IneligibleReason::BoqNotApproved)
        );
    }

    #[test]
    fn test_pre_verification_states_are_never_eligible() {
        for state in [MilestoneState::Draft, MilestoneState::InProgress, MilestoneState::Submitted] {
            for flags in [(true, false, false), (true, true, true), (false, true, false)] {
                assert_eq!(
                    EligibilityCore::evaluate(&inputs(state, flags.0, flags.1, flags.2)),
                    Err(IneligibleReason::MilestoneNotVerified)
                );
            }
        }
    }

    #[test]
    fn test_verdict_is_idempotent() {
        let at = crate::db::now_ts();
        let i = inputs(MilestoneState::Verified, true, true, false);
        let first = EligibilityCore::verdict("m1", &i, at);
        let second = EligibilityCore::verdict("m1", &i, at);
        assert_eq!(first, second);
        assert!(!first.eligible);
        assert_eq!(first.reason.as_deref(), Some("extra pending approval"));
    }
}
