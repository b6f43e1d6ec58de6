// ==========================================
// 工程项目管理核心 - BOQ 领域模型
// ==========================================
// BOQ: 工程量清单，按修订号保存不可变快照
// 红线: 已写入的修订快照不可再修改
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::BoqStatus;

// ==========================================
// Boq - 工程量清单表头
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boq {
    pub boq_id: String,
    pub project_id: String,
    pub title: String,
    pub status: BoqStatus,
    pub revision_no: i32, // 当前修订号，从 1 开始单调递增
    pub approved_at: Option<NaiveDateTime>,
    pub approved_by: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Boq {
    pub fn is_approved(&self) -> bool {
        self.status == BoqStatus::Approved
    }
}

// ==========================================
// BoqItem - 清单条目（修订作用域）
// ==========================================
// item_id 跨修订保持稳定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoqItem {
    pub item_id: String,
    pub seq_no: i32,
    pub description: String,
    pub unit: String,
    pub planned_quantity: f64,
    pub rate: f64,
}

impl BoqItem {
    pub fn amount(&self) -> f64 {
        self.planned_quantity * self.rate
    }
}

// ==========================================
// BoqRevision - 修订记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqRevision {
    pub boq_id: String,
    pub revision_no: i32,
    pub reason: String,
    pub item_count: i32,
    pub total_amount: f64,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

// ==========================================
// 修订请求
// ==========================================

/// 新增条目
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoqItem {
    pub description: String,
    pub unit: String,
    pub planned_quantity: f64,
    pub rate: f64,
}

/// 条目字段级更新（None 表示保持原值）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqItemUpdate {
    pub item_id: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub planned_quantity: Option<f64>,
    pub rate: Option<f64>,
}

/// 一次修订包含的全部变更
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqChanges {
    #[serde(default)]
    pub add_items: Vec<NewBoqItem>,
    #[serde(default)]
    pub update_items: Vec<BoqItemUpdate>,
    #[serde(default)]
    pub remove_item_ids: Vec<String>,
}

/// 修订摘要（写入审计 before/after）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionSummary {
    pub revision_no: i32,
    pub status: BoqStatus,
    pub item_count: usize,
    pub total_amount: f64,
    pub item_ids: Vec<String>,
}

impl RevisionSummary {
    pub fn of(revision_no: i32, status: BoqStatus, items: &[BoqItem]) -> Self {
        Self {
            revision_no,
            status,
            item_count: items.len(),
            total_amount: items.iter().map(BoqItem::amount).sum(),
            item_ids: items.iter().map(|i| i.item_id.clone()).collect(),
        }
    }
}

/// 修订结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviseOutcome {
    pub boq_id: String,
    pub revision_number: i32,
}

// ==========================================
// BoqItemProgress - 条目进度/付款记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqItemProgress {
    pub progress_id: String,
    pub boq_id: String,
    pub item_id: String,
    pub milestone_id: Option<String>,
    pub quantity: f64,
    pub amount: f64,
    pub recorded_by: String,
    pub recorded_at: NaiveDateTime,
}

/// 记录进度/付款请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgress {
    pub item_id: String,
    pub milestone_id: Option<String>,
    pub quantity: f64,
    pub amount: f64,
}

/// BOQ 详情视图（表头 + 指定修订的条目 + 修订历史）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqDetail {
    pub boq: Boq,
    pub revision_no: i32,
    pub items: Vec<BoqItem>,
    pub revisions: Vec<BoqRevision>,
}
