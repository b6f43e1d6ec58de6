// ==========================================
// 工程项目管理核心 - 审计API
// ==========================================
// 职责: 审计日志过滤查询与 CSV 导出
// 权限: 查询对全部成员开放；导出仅 OWNER/PMC
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{parse_audit_action, parse_date, parse_entity_type};
use crate::config::AuditConfigReader;
use crate::domain::audit_log::{AuditLogFilter, AuditLogPage};
use crate::domain::principal::Principal;
use crate::engine::role_guard::READERS;
use crate::engine::{AuditLimits, AuditRecorder, RoleGuard};

/// 查询参数（全部为字符串形式，由本层解析）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQueryParams {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AuditQueryParams {
    pub fn to_filter(&self) -> ApiResult<AuditLogFilter> {
        Ok(AuditLogFilter {
            entity_type: self.entity_type.as_deref().map(parse_entity_type).transpose()?,
            entity_id: non_blank(&self.entity_id),
            actor_id: non_blank(&self.actor_id),
            action: self.action.as_deref().map(parse_audit_action).transpose()?,
            start_date: self.start_date.as_deref().map(parse_date).transpose()?,
            end_date: self.end_date.as_deref().map(parse_date).transpose()?,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 审计API
pub struct AuditApi<C>
where
    C: AuditConfigReader,
{
    recorder: Arc<AuditRecorder>,
    config: Arc<C>,
}

impl<C> AuditApi<C>
where
    C: AuditConfigReader,
{
    pub fn new(recorder: Arc<AuditRecorder>, config: Arc<C>) -> Self {
        Self { recorder, config }
    }

    async fn limits(&self) -> ApiResult<AuditLimits> {
        let default_page_size = self
            .config
            .get_audit_default_page_size()
            .await
            .map_err(config_error)?;
        let max_page_size = self.config.get_audit_max_page_size().await.map_err(config_error)?;
        let export_max_rows = self.config.get_audit_export_max_rows().await.map_err(config_error)?;

        Ok(AuditLimits {
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
            export_max_rows,
        })
    }

    /// GET {project}/audit-log
    pub async fn query(&self, principal: &Principal, params: &AuditQueryParams) -> ApiResult<AuditLogPage> {
        RoleGuard::require_role(principal, READERS)?;
        let filter = params.to_filter()?;
        let limits = self.limits().await?;
        Ok(self.recorder.query(&principal.project_id, &filter, &limits)?)
    }

    /// GET {project}/audit-log/export
    pub async fn export_csv(&self, principal: &Principal, params: &AuditQueryParams) -> ApiResult<String> {
        if !RoleGuard::can_export_audit_log(principal) {
            return Err(ApiError::Forbidden(format!(
                "role={} 无审计导出权限（需要 OWNER 或 PMC）",
                principal.role
            )));
        }
        let filter = params.to_filter()?;
        let limits = self.limits().await?;
        Ok(self.recorder.export_csv(&principal.project_id, &filter, &limits)?)
    }
}

fn config_error(err: Box<dyn std::error::Error>) -> ApiError {
    ApiError::InternalError(format!("读取审计配置失败: {}", err))
}
