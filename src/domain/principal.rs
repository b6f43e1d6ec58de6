// ==========================================
// 工程项目管理核心 - 认证主体
// ==========================================
// 由认证协作方(requireProjectAuth)产出，作用域为单个项目
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::Role;

/// 已认证主体（角色仅在 project_id 内有效）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub project_id: String,
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(project_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: user_id.into(),
            role,
        }
    }

    /// 实体是否属于本主体的项目作用域
    pub fn in_scope(&self, project_id: &str) -> bool {
        self.project_id == project_id
    }
}
