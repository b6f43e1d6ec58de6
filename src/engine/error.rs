// ==========================================
// 工程项目管理核心 - 引擎层错误类型
// ==========================================
// 约定: 校验与业务规则失败一律在写入前识别并以类型化错误返回
// 约定: 仓储层乐观锁冲突在此归类为 Conflict
// ==========================================

use crate::domain::types::{MilestoneState, Role};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("权限不足: role={role}, required={}", format_roles(required))]
    Forbidden { role: Role, required: Vec<Role> },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidTransition {
        from: MilestoneState,
        to: MilestoneState,
    },

    #[error("前置条件不满足: {0}")]
    PreconditionFailed(String),

    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("并发冲突: {0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl EngineError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

fn format_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.to_db_str())
        .collect::<Vec<_>>()
        .join("|")
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                entity,
                id,
                expected,
                actual,
            } => EngineError::Conflict(format!(
                "{}(id={})已被其他请求修改（期望={}，实际={}）",
                entity, id, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Repository(other),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Repository(err.into())
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
