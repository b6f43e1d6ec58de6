// ==========================================
// 工程项目管理核心 - 里程碑领域模型
// ==========================================
// 红线: extra_approved_at 仅当 is_extra=true 时可非空，且只能设置一次
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::eligibility::EligibilityVerdict;
use crate::domain::types::MilestoneState;

// ==========================================
// Milestone - 里程碑
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub milestone_id: String,
    pub project_id: String,
    pub boq_id: Option<String>, // 关联 BOQ（可选）
    pub title: String,
    pub state: MilestoneState,
    pub is_extra: bool, // BOQ 外的额外工作
    pub extra_approved_at: Option<NaiveDateTime>,
    pub extra_approved_by: Option<String>,
    pub revision: i32, // 乐观锁：修订号
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Milestone {
    pub fn is_extra_approved(&self) -> bool {
        self.is_extra && self.extra_approved_at.is_some()
    }
}

/// 创建里程碑请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMilestone {
    pub title: String,
    pub boq_id: Option<String>,
    #[serde(default)]
    pub linked_item_ids: Vec<String>,
    #[serde(default)]
    pub is_extra: bool,
}

// ==========================================
// Evidence - 证据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub evidence_id: String,
    pub milestone_id: String,
    pub submitted_by: String,
    pub note: Option<String>,
    pub submitted_at: NaiveDateTime,
    pub files: Vec<EvidenceFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceFile {
    pub file_id: String,
    pub file_name: String,
    pub storage_key: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

/// 提交证据时的附件描述
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvidenceFile {
    pub file_name: String,
    pub storage_key: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

/// 状态转换结果：新的里程碑 + 同事务内重算的付款资格
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub milestone: Milestone,
    pub eligibility: EligibilityVerdict,
}

/// 里程碑详情视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneDetail {
    pub milestone: Milestone,
    pub linked_item_ids: Vec<String>,
    pub evidence_count: i64,
    pub eligibility: Option<EligibilityVerdict>,
}
