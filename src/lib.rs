// ==========================================
// 工程项目管理核心 - 核心库
// ==========================================
// 范围: BOQ 版本管理 / 里程碑状态机 / 付款资格 / 审计
// 技术栈: Rust + SQLite
// 约定: 所有写入在单个 IMMEDIATE 事务内完成（含审计与资格重算）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 认证与命令
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AuditAction, BoqStatus, EntityType, MilestoneState, ProjectStatus, Role};

// 领域实体
pub use domain::{
    AuditLogEntry, Boq, EligibilityVerdict, IneligibleReason, Milestone, Principal, Project,
};

// 引擎
pub use engine::{
    AuditRecorder, BoqRevisionEngine, EligibilityCore, EngineError, MilestoneStateMachine,
    PaymentEligibilityEngine, ProjectRegistry, RoleGuard,
};

// API
pub use api::{ApiError, AuditApi, BoqApi, MilestoneApi, ProjectApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "工程项目管理核心";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
