// ==========================================
// 工程项目管理核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_tx` / `*_in` 关联函数接收 &Connection，
//       供引擎在同一事务内组合多表写入
// ==========================================

pub mod audit_log_repo;
pub mod boq_repo;
pub mod eligibility_repo;
pub mod error;
pub mod milestone_repo;
pub mod project_repo;

// 重导出核心仓储
pub use audit_log_repo::AuditLogRepository;
pub use boq_repo::BoqRepository;
pub use eligibility_repo::EligibilityRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use milestone_repo::MilestoneRepository;
pub use project_repo::ProjectRepository;
