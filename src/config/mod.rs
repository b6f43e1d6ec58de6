// ==========================================
// 工程项目管理核心 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod audit_config_trait;
pub mod config_manager;

// 重导出核心配置管理器
pub use audit_config_trait::AuditConfigReader;
pub use config_manager::{config_keys, ConfigManager};
