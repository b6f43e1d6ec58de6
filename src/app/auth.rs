// ==========================================
// 工程项目管理核心 - 项目认证
// ==========================================
// requireProjectAuth: 会话 → 项目内主体
// 无会话或非项目成员 → UNAUTHORIZED
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::principal::Principal;
use crate::engine::ProjectRegistry;

/// 调用方会话（由传输层解析后传入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

// ==========================================
// ProjectAuthenticator Trait
// ==========================================
#[async_trait]
pub trait ProjectAuthenticator: Send + Sync {
    async fn require_project_auth(&self, session: Option<&SessionContext>, project_id: &str) -> ApiResult<Principal>;
}

// ==========================================
// MembershipAuthenticator - 基于项目成员表
// ==========================================
pub struct MembershipAuthenticator {
    registry: Arc<ProjectRegistry>,
}

impl MembershipAuthenticator {
    pub fn new(registry: Arc<ProjectRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ProjectAuthenticator for MembershipAuthenticator {
    async fn require_project_auth(&self, session: Option<&SessionContext>, project_id: &str) -> ApiResult<Principal> {
        let user_id = match session.map(|s| s.user_id.trim()) {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ApiError::Unauthorized("缺少有效会话".to_string())),
        };

        match self.registry.resolve_principal(project_id, user_id)? {
            Some(principal) => Ok(principal),
            None => {
                tracing::warn!(project_id, user_id, "非项目成员访问被拒绝");
                Err(ApiError::Unauthorized(format!(
                    "用户 {} 不是项目 {} 的成员",
                    user_id, project_id
                )))
            }
        }
    }
}
