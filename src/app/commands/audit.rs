use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AuditQueryParams};
use crate::app::auth::SessionContext;
use crate::app::state::AppState;

use super::common::{authenticate, respond, ApiEnvelope};

// ==========================================
// 审计相关命令
// ==========================================

/// 导出结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    pub file_name: String,
    pub content_type: String,
    pub csv: String,
}

/// GET {project}/audit-log
pub async fn list_audit_logs(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    params: AuditQueryParams,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        state.audit_api.query(&principal, &params).await
    }
    .await;
    respond("list_audit_logs", result)
}

/// GET {project}/audit-log/export
pub async fn export_audit_logs(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    params: AuditQueryParams,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let csv = state.audit_api.export_csv(&principal, &params).await?;
        Ok::<_, ApiError>(AuditExport {
            file_name: format!(
                "audit_log_{}_{}.csv",
                project_id,
                crate::db::now_ts().format("%Y%m%d%H%M%S")
            ),
            content_type: "text/csv".to_string(),
            csv,
        })
    }
    .await;
    respond("export_audit_logs", result)
}
