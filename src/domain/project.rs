// ==========================================
// 工程项目管理核心 - 项目领域模型
// ==========================================
// 项目为根聚合: 拥有 BOQ 与里程碑集合，本范围内不删除
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{ProjectStatus, Role};

// ==========================================
// Project - 项目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub is_example: bool, // 示例项目标记，仅用于展示
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

// ==========================================
// ProjectMember - 项目成员（角色作用域）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: String,
    pub user_id: String,
    pub role: Role,
    pub joined_at: NaiveDateTime,
}
