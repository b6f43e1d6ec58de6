// ==========================================
// 工程项目管理核心 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有拒绝必须给出原因
// 约定: 变更类操作在单个 BEGIN IMMEDIATE 事务内组合仓储 `*_tx` 写入
// ==========================================

pub mod audit;
pub mod boq_revision;
pub mod eligibility;
pub mod eligibility_core;
pub mod error;
pub mod milestone_state_machine;
pub mod project_registry;
pub mod role_guard;

// 重导出核心引擎
pub use audit::{AuditLimits, AuditRecorder, AUDIT_CSV_HEADER};
pub use boq_revision::{BoqRevisionEngine, RevisionMaterializer};
pub use eligibility::PaymentEligibilityEngine;
pub use eligibility_core::EligibilityCore;
pub use error::{EngineError, EngineResult};
pub use milestone_state_machine::{MilestoneStateMachine, TransitionRules};
pub use project_registry::ProjectRegistry;
pub use role_guard::RoleGuard;

use crate::repository::RepositoryError;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// 获取共享连接
pub(crate) fn lock_conn(conn: &Arc<Mutex<Connection>>) -> EngineResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| EngineError::Repository(RepositoryError::LockError(e.to_string())))
}
