// ==========================================
// 工程项目管理核心 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将引擎/仓储错误转换为对外错误种类
// 约定: code() 给出错误种类，http_status() 给出对应状态语义
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 认证与授权
    // ==========================================
    #[error("未认证: {0}")]
    Unauthorized(String),

    #[error("权限不足: {0}")]
    Forbidden(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("前置条件不满足: {0}")]
    PreconditionFailed(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("冲突: {0}")]
    Conflict(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("导出失败: {0}")]
    Export(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 错误种类
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::InvalidStateTransition { .. } => "INVALID_TRANSITION",
            ApiError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::Export(_) => "EXPORT_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// 状态语义（未归类错误一律 500）
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::InvalidInput(_)
            | ApiError::InvalidStateTransition { .. }
            | ApiError::PreconditionFailed(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::DatabaseError(_)
            | ApiError::Export(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => 500,
        }
    }

    /// 调用方可在重新读取后安全重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Forbidden { role, required } => ApiError::Forbidden(format!(
                "role={}, required={}",
                role,
                required.iter().map(|r| r.to_db_str()).collect::<Vec<_>>().join("|")
            )),
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::InvalidTransition { from, to } => ApiError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            EngineError::PreconditionFailed(msg) => ApiError::PreconditionFailed(msg),
            EngineError::NotFound { entity, id } => ApiError::NotFound(format!("{}(id={})不存在", entity, id)),
            EngineError::Conflict(msg) => ApiError::Conflict(msg),
            EngineError::Repository(e) => e.into(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                entity,
                id,
                expected,
                actual,
            } => ApiError::Conflict(format!(
                "{}(id={})已被其他请求修改（期望={}，实际={}）",
                entity, id, expected, actual
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => ApiError::NotFound(format!("{}(id={})不存在", entity, id)),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ConstraintViolation(msg) => ApiError::DatabaseError(format!("约束违反: {}", msg)),
            RepositoryError::Busy(msg) => ApiError::DatabaseError(format!("数据库繁忙: {}", msg)),
            RepositoryError::LockError(msg) => ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg)),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),

            // 数据质量错误
            RepositoryError::DataIntegrityError { field, message } => {
                ApiError::InternalError(format!("数据完整性错误 (field={}): {}", field, message))
            }
            RepositoryError::SerializationError(msg) => ApiError::Export(msg),

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{MilestoneState, Role};

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, &str, u16)> = vec![
            (ApiError::Unauthorized("no session".into()), "UNAUTHORIZED", 401),
            (ApiError::Forbidden("x".into()), "FORBIDDEN", 403),
            (ApiError::InvalidInput("x".into()), "INVALID_INPUT", 400),
            (
                ApiError::InvalidStateTransition {
                    from: "DRAFT".into(),
                    to: "CLOSED".into(),
                },
                "INVALID_TRANSITION",
                400,
            ),
            (ApiError::PreconditionFailed("x".into()), "PRECONDITION_FAILED", 400),
            (ApiError::NotFound("x".into()), "NOT_FOUND", 404),
            (ApiError::Conflict("x".into()), "CONFLICT", 409),
            (ApiError::DatabaseError("x".into()), "DATABASE_ERROR", 500),
            (ApiError::Other(anyhow::anyhow!("boom")), "OTHER_ERROR", 500),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.http_status(), status, "{}", code);
        }
    }

    #[test]
    fn test_engine_errors_keep_their_kind() {
        let forbidden: ApiError = EngineError::Forbidden {
            role: Role::Viewer,
            required: vec![Role::Owner],
        }
        .into();
        assert_eq!(forbidden.code(), "FORBIDDEN");
        assert!(forbidden.to_string().contains("VIEWER"));

        let transition: ApiError = EngineError::InvalidTransition {
            from: MilestoneState::Draft,
            to: MilestoneState::Verified,
        }
        .into();
        assert_eq!(transition.code(), "INVALID_TRANSITION");

        let conflict: ApiError = RepositoryError::OptimisticLockFailure {
            entity: "Boq".into(),
            id: "b1".into(),
            expected: "1".into(),
            actual: "DRAFT@2".into(),
        }
        .into();
        assert_eq!(conflict.http_status(), 409);
        assert!(conflict.is_retryable());
    }

    #[test]
    fn test_unclassified_store_failure_is_500() {
        let err: ApiError = EngineError::Repository(RepositoryError::DatabaseQueryError("disk I/O".into())).into();
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_rejected_store_write_is_500_and_not_retryable() {
        let err: ApiError = EngineError::Repository(RepositoryError::ConstraintViolation("audit rejected".into())).into();
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert_eq!(err.http_status(), 500);
        assert!(!err.is_retryable());

        let duplicate: ApiError = RepositoryError::UniqueConstraintViolation("dup".into()).into();
        assert_eq!(duplicate.http_status(), 409);
    }
}
