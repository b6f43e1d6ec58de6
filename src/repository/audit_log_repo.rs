// ==========================================
// 工程项目管理核心 - 审计日志数据仓储
// ==========================================
// 红线: 只追加，不提供更新/删除
// 红线: 写入失败必须向上传播（与主变更同一事务）
// ==========================================

mod core;
mod queries;


pub use core::AuditLogRepository;
