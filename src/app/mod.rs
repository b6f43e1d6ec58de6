// ==========================================
// 工程项目管理核心 - 应用层
// ==========================================
// 职责: 装配共享状态，认证后调用 API，输出 {success, data|error} 响应
// ==========================================

pub mod auth;
pub mod commands;
pub mod state;

// 重导出
pub use auth::{MembershipAuthenticator, ProjectAuthenticator, SessionContext};
pub use commands::*;
pub use state::{get_default_db_path, resolve_db_path, AppState};
