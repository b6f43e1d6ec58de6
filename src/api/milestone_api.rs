// ==========================================
// 工程项目管理核心 - 里程碑API
// ==========================================
// 职责: 里程碑创建、状态转换、证据、额外工作审批
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::validator::parse_milestone_state;
use crate::domain::milestone::{
    Evidence, Milestone, MilestoneDetail, NewEvidenceFile, NewMilestone, TransitionOutcome,
};
use crate::domain::principal::Principal;
use crate::engine::MilestoneStateMachine;

/// 状态转换请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub to_state: String,
    pub reason: Option<String>,
    pub expected_revision: Option<i32>,
}

/// 提交证据请求体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEvidenceRequest {
    pub note: Option<String>,
    #[serde(default)]
    pub files: Vec<NewEvidenceFile>,
}

/// 里程碑API
pub struct MilestoneApi {
    state_machine: Arc<MilestoneStateMachine>,
}

impl MilestoneApi {
    pub fn new(state_machine: Arc<MilestoneStateMachine>) -> Self {
        Self { state_machine }
    }

    pub fn create_milestone(&self, principal: &Principal, project_id: &str, request: NewMilestone) -> ApiResult<Milestone> {
        Ok(self.state_machine.create_milestone(principal, project_id, request)?)
    }

    pub fn get_milestone(&self, principal: &Principal, milestone_id: &str) -> ApiResult<MilestoneDetail> {
        Ok(self.state_machine.get_milestone(principal, milestone_id)?)
    }

    /// POST {milestone}/transition
    pub fn transition(
        &self,
        principal: &Principal,
        milestone_id: &str,
        request: TransitionRequest,
    ) -> ApiResult<TransitionOutcome> {
        let to_state = parse_milestone_state(&request.to_state)?;
        Ok(self.state_machine.transition(
            principal,
            milestone_id,
            to_state,
            request.reason,
            request.expected_revision,
        )?)
    }

    /// POST {milestone}/approve-extra
    pub fn approve_extra(&self, principal: &Principal, milestone_id: &str) -> ApiResult<TransitionOutcome> {
        Ok(self.state_machine.approve_extra(principal, milestone_id)?)
    }

    pub fn submit_evidence(
        &self,
        principal: &Principal,
        milestone_id: &str,
        request: SubmitEvidenceRequest,
    ) -> ApiResult<Evidence> {
        Ok(self
            .state_machine
            .submit_evidence(principal, milestone_id, request.note, request.files)?)
    }

    pub fn list_evidence(&self, principal: &Principal, milestone_id: &str) -> ApiResult<Vec<Evidence>> {
        Ok(self.state_machine.list_evidence(principal, milestone_id)?)
    }
}
