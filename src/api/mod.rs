// ==========================================
// 工程项目管理核心 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供应用层命令调用
// 约定: 字符串参数在本层解析为领域类型，错误统一转换为 ApiError
// ==========================================

pub mod audit_api;
pub mod boq_api;
pub mod error;
pub mod milestone_api;
pub mod project_api;
pub mod validator;

// 重导出核心类型
pub use audit_api::{AuditApi, AuditQueryParams};
pub use boq_api::{BoqApi, CreateBoqRequest, ReviseRequest};
pub use error::{ApiError, ApiResult};
pub use milestone_api::{MilestoneApi, SubmitEvidenceRequest, TransitionRequest};
pub use project_api::ProjectApi;
