// ==========================================
// 工程项目管理核心 - 付款资格领域模型
// ==========================================
// 派生值: 只能由引擎重算，不可手工编辑
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 不具备付款资格的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IneligibleReason {
    MilestoneNotVerified,
    BoqNotApproved,
    ExtraPendingApproval,
}

impl IneligibleReason {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "MILESTONE_NOT_VERIFIED" => Some(IneligibleReason::MilestoneNotVerified),
            "BOQ_NOT_APPROVED" => Some(IneligibleReason::BoqNotApproved),
            "EXTRA_PENDING_APPROVAL" => Some(IneligibleReason::ExtraPendingApproval),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            IneligibleReason::MilestoneNotVerified => "MILESTONE_NOT_VERIFIED",
            IneligibleReason::BoqNotApproved => "BOQ_NOT_APPROVED",
            IneligibleReason::ExtraPendingApproval => "EXTRA_PENDING_APPROVAL",
        }
    }

    /// 对外展示的原因文本
    pub fn message(&self) -> &'static str {
        match self {
            IneligibleReason::MilestoneNotVerified => "milestone not verified",
            IneligibleReason::BoqNotApproved => "BOQ not approved",
            IneligibleReason::ExtraPendingApproval => "extra pending approval",
        }
    }
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

// ==========================================
// EligibilityInputs - 判定输入
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityInputs {
    pub state: crate::domain::types::MilestoneState,
    pub boq_approved: bool,
    pub is_extra: bool,
    pub extra_approved: bool,
}

// ==========================================
// EligibilityVerdict - 付款资格判定
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub milestone_id: String,
    pub eligible: bool,
    pub reason_code: Option<IneligibleReason>,
    pub reason: Option<String>,
    pub computed_at: NaiveDateTime,
}

impl EligibilityVerdict {
    /// 判定结论是否一致（忽略计算时间）
    pub fn same_outcome(&self, other: &EligibilityVerdict) -> bool {
        self.milestone_id == other.milestone_id
            && self.eligible == other.eligible
            && self.reason_code == other.reason_code
    }
}
