use crate::api::error::ApiError;
use crate::app::auth::SessionContext;
use crate::app::state::AppState;

use super::common::{authenticate, respond, run_blocking, ApiEnvelope};

// ==========================================
// 项目相关命令
// ==========================================

/// 创建项目（会话用户成为 OWNER）
pub async fn create_project(
    state: &AppState,
    session: Option<SessionContext>,
    name: String,
    status: Option<String>,
    is_example: bool,
) -> ApiEnvelope {
    let result = async {
        let owner = session
            .map(|s| s.user_id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("缺少有效会话".to_string()))?;
        let api = state.project_api.clone();
        run_blocking("cmd.create_project", move || {
            api.create_project(&name, status.as_deref(), is_example, &owner)
        })
        .await
    }
    .await;
    respond("create_project", result)
}

/// 添加项目成员（仅 OWNER）
pub async fn add_project_member(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    user_id: String,
    role: String,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.project_api.clone();
        run_blocking("cmd.add_project_member", move || {
            api.add_member(&principal, &user_id, &role)
        })
        .await
    }
    .await;
    respond("add_project_member", result)
}
