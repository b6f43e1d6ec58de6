// ==========================================
// 工程项目管理核心 - 请求参数校验
// ==========================================
// 职责: 把外部传入的字符串参数解析为封闭枚举/日期
// 红线: 未知取值一律 INVALID_INPUT，不做默认降级
// ==========================================

use chrono::NaiveDate;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::{AuditAction, EntityType, MilestoneState, ProjectStatus, Role};

pub fn parse_role(raw: &str) -> ApiResult<Role> {
    Role::from_db_str(raw).ok_or_else(|| ApiError::InvalidInput(format!("未知角色: {}", raw)))
}

pub fn parse_milestone_state(raw: &str) -> ApiResult<MilestoneState> {
    MilestoneState::from_db_str(raw).ok_or_else(|| ApiError::InvalidInput(format!("未知里程碑状态: {}", raw)))
}

pub fn parse_entity_type(raw: &str) -> ApiResult<EntityType> {
    EntityType::from_db_str(raw).ok_or_else(|| ApiError::InvalidInput(format!("未知实体类型: {}", raw)))
}

pub fn parse_audit_action(raw: &str) -> ApiResult<AuditAction> {
    AuditAction::from_db_str(raw).ok_or_else(|| ApiError::InvalidInput(format!("未知审计动作: {}", raw)))
}

/// 项目状态（缺省 ONGOING）
pub fn parse_project_status(raw: Option<&str>) -> ApiResult<ProjectStatus> {
    match raw.map(|s| s.trim().to_uppercase()) {
        None => Ok(ProjectStatus::Ongoing),
        Some(s) if s.is_empty() || s == "ONGOING" => Ok(ProjectStatus::Ongoing),
        Some(s) if s == "COMPLETED" => Ok(ProjectStatus::Completed),
        Some(s) => Err(ApiError::InvalidInput(format!("未知项目状态: {}", s))),
    }
}

/// 解析日期字符串（YYYY-MM-DD）
pub fn parse_date(date_str: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|e| ApiError::InvalidInput(format!("日期格式错误（应为YYYY-MM-DD）: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_closed_enums() {
        assert_eq!(parse_role("pmc").unwrap(), Role::Pmc);
        assert_eq!(parse_milestone_state("in_progress").unwrap(), MilestoneState::InProgress);
        assert!(matches!(parse_role("ADMIN"), Err(ApiError::InvalidInput(_))));
        assert!(matches!(parse_milestone_state("DONE"), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_project_status() {
        assert_eq!(parse_project_status(None).unwrap(), ProjectStatus::Ongoing);
        assert_eq!(parse_project_status(Some("completed")).unwrap(), ProjectStatus::Completed);
        assert!(parse_project_status(Some("ARCHIVED")).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-03-01").unwrap(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert!(matches!(parse_date("03/01/2026"), Err(ApiError::InvalidInput(_))));
    }
}
