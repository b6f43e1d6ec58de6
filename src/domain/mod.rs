// ==========================================
// 工程项目管理核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod audit_log;
pub mod boq;
pub mod eligibility;
pub mod milestone;
pub mod principal;
pub mod project;
pub mod types;

// 重导出核心类型
pub use audit_log::{AuditLogEntry, AuditLogFilter, AuditLogPage};
pub use boq::{
    Boq, BoqChanges, BoqDetail, BoqItem, BoqItemProgress, BoqItemUpdate, BoqRevision, NewBoqItem,
    NewProgress, ReviseOutcome, RevisionSummary,
};
pub use eligibility::{EligibilityInputs, EligibilityVerdict, IneligibleReason};
pub use milestone::{
    Evidence, EvidenceFile, Milestone, MilestoneDetail, NewEvidenceFile, NewMilestone,
    TransitionOutcome,
};
pub use principal::Principal;
pub use project::{Project, ProjectMember};
pub use types::{AuditAction, BoqStatus, EntityType, MilestoneState, ProjectStatus, Role};
