// ==========================================
// 工程项目管理核心 - 项目API
// ==========================================
// 职责: 项目创建、成员登记
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::validator::{parse_project_status, parse_role};
use crate::domain::principal::Principal;
use crate::domain::project::{Project, ProjectMember};
use crate::engine::ProjectRegistry;

/// 项目API
pub struct ProjectApi {
    registry: Arc<ProjectRegistry>,
}

impl ProjectApi {
    pub fn new(registry: Arc<ProjectRegistry>) -> Self {
        Self { registry }
    }

    /// 创建项目（创建者成为 OWNER）
    ///
    /// # 参数
    /// - status: ONGOING / COMPLETED，缺省 ONGOING
    pub fn create_project(
        &self,
        name: &str,
        status: Option<&str>,
        is_example: bool,
        owner_user_id: &str,
    ) -> ApiResult<Project> {
        let status = parse_project_status(status)?;
        let (project, _owner) = self.registry.create_project(owner_user_id, name, status, is_example)?;
        Ok(project)
    }

    /// 添加成员或调整角色（仅 OWNER）
    pub fn add_member(&self, principal: &Principal, user_id: &str, role: &str) -> ApiResult<ProjectMember> {
        let role = parse_role(role)?;
        Ok(self.registry.add_member(principal, user_id, role)?)
    }
}
