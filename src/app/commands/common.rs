use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::app::auth::SessionContext;
use crate::app::state::AppState;
use crate::domain::principal::Principal;

// ==========================================
// 公共工具：响应封装、阻塞执行、认证
// ==========================================

/// 错误响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// 错误种类（UNAUTHORIZED / FORBIDDEN / ...）
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 状态语义
    pub status: u16,
}

/// 统一响应信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ApiEnvelope {
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                success: true,
                data: Some(value),
                error: None,
            },
            Err(e) => Self::from_error(&ApiError::InternalError(format!("序列化失败: {}", e))),
        }
    }

    pub fn from_error(err: &ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: err.code().to_string(),
                message: err.to_string(),
                status: err.http_status(),
            }),
        }
    }

    /// 状态语义（成功为 200）
    pub fn status(&self) -> u16 {
        self.error.as_ref().map(|e| e.status).unwrap_or(200)
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"error":{{"code":"INTERNAL_ERROR","message":"序列化失败: {}","status":500}}}}"#,
                e
            )
        })
    }
}

/// 把 API 结果封装为响应信封
pub(super) fn respond<T: Serialize>(op: &str, result: ApiResult<T>) -> ApiEnvelope {
    match result {
        Ok(data) => ApiEnvelope::ok(&data),
        Err(err) => {
            if err.http_status() >= 500 {
                tracing::error!(op, code = err.code(), error = %err, "命令执行失败");
            } else {
                tracing::warn!(op, code = err.code(), error = %err, "命令被拒绝");
            }
            ApiEnvelope::from_error(&err)
        }
    }
}

/// 在阻塞线程池中执行同步 API 调用
pub(super) async fn run_blocking<T, F>(op: &'static str, f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let _perf = crate::perf::PerfGuard::new(op);
        f()
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("任务执行失败: {}", e)))?
}

/// requireProjectAuth
pub(super) async fn authenticate(
    state: &AppState,
    session: Option<&SessionContext>,
    project_id: &str,
) -> ApiResult<Principal> {
    state.authenticator.require_project_auth(session, project_id).await
}
