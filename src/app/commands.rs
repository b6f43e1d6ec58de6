// ==========================================
// 工程项目管理核心 - 应用命令（按域拆分）
// ==========================================
// 职责: 认证 → 调用 API（阻塞线程池）→ {success, data|error} 响应
// 约定: 错误种类映射状态语义 401/403/400/404/409/500
// ==========================================

mod audit;
mod boq;
mod common;
mod milestone;
mod project;

pub use audit::*;
pub use boq::*;
pub use common::{ApiEnvelope, ErrorBody};
pub use milestone::*;
pub use project::*;
