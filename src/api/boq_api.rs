// ==========================================
// 工程项目管理核心 - BOQ API
// ==========================================
// 职责: BOQ 查询、修订、审批、进度记录
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::domain::boq::{Boq, BoqChanges, BoqDetail, BoqItemProgress, NewBoqItem, NewProgress, ReviseOutcome};
use crate::domain::principal::Principal;
use crate::engine::BoqRevisionEngine;

/// 修订请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviseRequest {
    pub reason: String,
    #[serde(default)]
    pub changes: BoqChanges,
    /// 调用方读到的修订号（可选，不一致即 CONFLICT）
    pub expected_revision: Option<i32>,
}

/// 创建请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoqRequest {
    pub title: String,
    #[serde(default)]
    pub items: Vec<NewBoqItem>,
}

/// BOQ API
pub struct BoqApi {
    engine: Arc<BoqRevisionEngine>,
}

impl BoqApi {
    pub fn new(engine: Arc<BoqRevisionEngine>) -> Self {
        Self { engine }
    }

    pub fn create_boq(&self, principal: &Principal, project_id: &str, request: CreateBoqRequest) -> ApiResult<BoqDetail> {
        Ok(self
            .engine
            .create_boq(principal, project_id, &request.title, request.items)?)
    }

    /// GET {boq}（revision 缺省为当前修订）
    pub fn get_boq(&self, principal: &Principal, boq_id: &str, revision: Option<i32>) -> ApiResult<BoqDetail> {
        Ok(self.engine.get_detail(principal, boq_id, revision)?)
    }

    /// POST {boq}/revise
    pub fn revise(&self, principal: &Principal, boq_id: &str, request: &ReviseRequest) -> ApiResult<ReviseOutcome> {
        Ok(self.engine.revise(
            principal,
            boq_id,
            &request.reason,
            &request.changes,
            request.expected_revision,
        )?)
    }

    /// POST {boq}/approve
    pub fn approve(&self, principal: &Principal, boq_id: &str) -> ApiResult<Boq> {
        Ok(self.engine.approve(principal, boq_id)?)
    }

    pub fn record_progress(&self, principal: &Principal, boq_id: &str, progress: NewProgress) -> ApiResult<BoqItemProgress> {
        Ok(self.engine.record_progress(principal, boq_id, progress)?)
    }

    pub fn item_progress(&self, principal: &Principal, boq_id: &str, item_id: &str) -> ApiResult<Vec<BoqItemProgress>> {
        Ok(self.engine.item_progress(principal, boq_id, item_id)?)
    }
}
