// ==========================================
// 工程项目管理核心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约定: 非法配置值回退默认值并记录 warn
// ==========================================

use crate::config::audit_config_trait::AuditConfigReader;
use crate::db::open_sqlite_connection;
use crate::engine::AuditLimits;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入（覆盖）global scope 的配置值
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES (?1, ?2, ?3, datetime('now', 'localtime'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式，按 key 排序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let config_map = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(serde_json::to_string(&config_map)?)
    }

    /// 读取正整数配置，非法值回退默认
    fn get_positive_u32(&self, key: &str, default: u32) -> Result<u32, Box<dyn Error>> {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<u32>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default,
                    "配置值非法，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 汇总审计查询限制（默认页大小不超过上限）
    pub fn audit_limits(&self) -> Result<AuditLimits, Box<dyn Error>> {
        let defaults = AuditLimits::default();
        let max_page_size = self.get_positive_u32(config_keys::AUDIT_MAX_PAGE_SIZE, defaults.max_page_size)?;
        let default_page_size = self
            .get_positive_u32(config_keys::AUDIT_DEFAULT_PAGE_SIZE, defaults.default_page_size)?
            .min(max_page_size);
        let export_max_rows =
            self.get_positive_u32(config_keys::AUDIT_EXPORT_MAX_ROWS, defaults.export_max_rows)?;

        Ok(AuditLimits {
            default_page_size,
            max_page_size,
            export_max_rows,
        })
    }
}

// ==========================================
// 实现 AuditConfigReader Trait
// ==========================================
#[async_trait]
impl AuditConfigReader for ConfigManager {
    async fn get_audit_default_page_size(&self) -> Result<u32, Box<dyn Error>> {
        Ok(self.audit_limits()?.default_page_size)
    }

    async fn get_audit_max_page_size(&self) -> Result<u32, Box<dyn Error>> {
        self.get_positive_u32(config_keys::AUDIT_MAX_PAGE_SIZE, AuditLimits::default().max_page_size)
    }

    async fn get_audit_export_max_rows(&self) -> Result<u32, Box<dyn Error>> {
        self.get_positive_u32(config_keys::AUDIT_EXPORT_MAX_ROWS, AuditLimits::default().export_max_rows)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 审计查询
    pub const AUDIT_DEFAULT_PAGE_SIZE: &str = "audit_default_page_size";
    pub const AUDIT_MAX_PAGE_SIZE: &str = "audit_max_page_size";

    // 审计导出
    pub const AUDIT_EXPORT_MAX_ROWS: &str = "audit_export_max_rows";
}
