// ==========================================
// 工程项目管理核心 - 审计配置读取 Trait
// ==========================================
// 职责: 定义审计查询/导出所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// AuditConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AuditConfigReader: Send + Sync {
    /// 未指定 limit 时的默认页大小
    ///
    /// # 默认值
    /// - 100
    async fn get_audit_default_page_size(&self) -> Result<u32, Box<dyn Error>>;

    /// 单页上限（超出截断）
    ///
    /// # 默认值
    /// - 1000
    async fn get_audit_max_page_size(&self) -> Result<u32, Box<dyn Error>>;

    /// 单次导出最大行数
    ///
    /// # 默认值
    /// - 50000
    async fn get_audit_export_max_rows(&self) -> Result<u32, Box<dyn Error>>;
}
