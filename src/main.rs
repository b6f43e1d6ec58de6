// ==========================================
// 工程项目管理核心 - 命令行入口
// ==========================================
// 用法: construction-pm [db_path]
// 作用: 初始化数据库 schema 并输出运行配置
// ==========================================

use anyhow::{anyhow, Context, Result};

use construction_pm::app::{resolve_db_path, AppState};
use construction_pm::{db, logging};

fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", construction_pm::APP_NAME);
    tracing::info!("系统版本: {}", construction_pm::VERSION);
    tracing::info!("==================================================");

    let db_path = resolve_db_path(std::env::args().nth(1));
    tracing::info!("使用数据库: {}", db_path);

    let app_state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let schema_version = {
        let conn = app_state
            .conn
            .lock()
            .map_err(|e| anyhow!("数据库锁获取失败: {}", e))?;
        db::read_schema_version(&conn).context("读取 schema_version 失败")?
    };
    tracing::info!(
        schema_version = ?schema_version,
        expected = db::CURRENT_SCHEMA_VERSION,
        "数据库就绪"
    );

    let snapshot = app_state
        .config_manager
        .get_config_snapshot()
        .map_err(|e| anyhow!("读取配置快照失败: {}", e))?;
    tracing::info!(config = %snapshot, "当前配置");

    Ok(())
}
