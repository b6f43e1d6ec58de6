// ==========================================
// 工程项目管理核心 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 乐观锁冲突由仓储层识别，业务含义由引擎层决定
// ==========================================

use rusqlite::{ffi, ErrorCode};
use thiserror::Error;

/// 仓储层错误
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 并发 =====
    #[error("乐观锁冲突: {entity}(id={id}) expected={expected}, actual={actual}")]
    OptimisticLockFailure {
        entity: String,
        id: String,
        expected: String,
        actual: String,
    },

    #[error("数据库繁忙: {0}")]
    Busy(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 存取 =====
    #[error("{entity}(id={id}) 不存在")]
    NotFound { entity: String, id: String },

    #[error("SQL 执行失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    /// CHECK / NOT NULL / 外键 / 触发器拒绝
    #[error("约束违反: {0}")]
    ConstraintViolation(String),

    // ===== 数据质量 =====
    #[error("数据完整性错误 (field={field}): {message}")]
    DataIntegrityError { field: String, message: String },

    #[error("序列化失败: {0}")]
    SerializationError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::not_found("row", "?"),
            rusqlite::Error::SqliteFailure(failure, detail) => {
                let message = detail.clone().unwrap_or_else(|| err.to_string());
                match failure.code {
                    ErrorCode::ConstraintViolation
                        if matches!(
                            failure.extended_code,
                            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        ) =>
                    {
                        RepositoryError::UniqueConstraintViolation(message)
                    }
                    ErrorCode::ConstraintViolation => RepositoryError::ConstraintViolation(message),
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => RepositoryError::Busy(message),
                    _ => RepositoryError::DatabaseQueryError(message),
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
