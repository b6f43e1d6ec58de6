// ==========================================
// 工程项目管理核心 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{AuditApi, BoqApi, MilestoneApi, ProjectApi};
use crate::app::auth::{MembershipAuthenticator, ProjectAuthenticator};
use crate::config::ConfigManager;
use crate::engine::{AuditRecorder, BoqRevisionEngine, MilestoneStateMachine, ProjectRegistry};
use crate::repository::AuditLogRepository;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "CPM_DB_PATH";

/// 应用状态
///
/// 所有 API 共享同一个连接；跨进程并发由 SQLite 事务与 CAS 保证
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 项目认证
    pub authenticator: Arc<dyn ProjectAuthenticator>,

    /// 项目API
    pub project_api: Arc<ProjectApi>,

    /// BOQ API
    pub boq_api: Arc<BoqApi>,

    /// 里程碑API
    pub milestone_api: Arc<MilestoneApi>,

    /// 审计API
    pub audit_api: Arc<AuditApi<ConfigManager>>,
}

impl AppState {
    /// 打开数据库、应用 schema 并装配全部 API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("schema 初始化失败: {}", e))?;
        crate::perf::install_sqlite_tracing(&mut conn);

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 基于已初始化 schema 的连接装配
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 引擎层
        // ==========================================
        let registry = Arc::new(ProjectRegistry::new(conn.clone()));
        let boq_engine = Arc::new(BoqRevisionEngine::new(conn.clone()));
        let state_machine = Arc::new(MilestoneStateMachine::new(conn.clone()));
        let recorder = Arc::new(AuditRecorder::new(Arc::new(AuditLogRepository::new(conn.clone()))));

        // ==========================================
        // API层
        // ==========================================
        let authenticator: Arc<dyn ProjectAuthenticator> =
            Arc::new(MembershipAuthenticator::new(registry.clone()));
        let project_api = Arc::new(ProjectApi::new(registry));
        let boq_api = Arc::new(BoqApi::new(boq_engine));
        let milestone_api = Arc::new(MilestoneApi::new(state_machine));
        let audit_api = Arc::new(AuditApi::new(recorder, config_manager.clone()));

        tracing::info!("AppState初始化完成");
        Ok(Self {
            db_path,
            conn,
            config_manager,
            authenticator,
            project_api,
            boq_api,
            milestone_api,
            audit_api,
        })
    }
}

/// 解析数据库路径：命令行参数 > CPM_DB_PATH > 用户数据目录
pub fn resolve_db_path(cli_arg: Option<String>) -> String {
    if let Some(path) = cli_arg.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
        return path;
    }
    get_default_db_path()
}

/// 获取默认数据库路径
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./construction_pm.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("construction-pm");
        // best-effort: 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("construction_pm.db");
        }
    }

    path.to_string_lossy().to_string()
}
