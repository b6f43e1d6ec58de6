// ==========================================
// 工程项目管理核心 - 领域类型定义
// ==========================================
// 红线: 角色/状态均为封闭枚举，禁止在调用点做字符串比较
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 角色 (Role)
// ==========================================
// 作用域: 项目内成员角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,  // 业主
    Pmc,    // 项目管理顾问
    Vendor, // 承包商/供应商
    Viewer, // 只读成员
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Pmc, Role::Vendor, Role::Viewer];

    /// 从数据库字符串解析（未知值返回 None，不做默认降级）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OWNER" => Some(Role::Owner),
            "PMC" => Some(Role::Pmc),
            "VENDOR" => Some(Role::Vendor),
            "VIEWER" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Pmc => "PMC",
            Role::Vendor => "VENDOR",
            Role::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 项目状态 (Project Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Ongoing,   // 进行中
    Completed, // 已完工
}

impl ProjectStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "COMPLETED" => ProjectStatus::Completed,
            _ => ProjectStatus::Ongoing, // 默认值
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProjectStatus::Ongoing => "ONGOING",
            ProjectStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// BOQ 审批状态 (BOQ Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoqStatus {
    Draft,    // 草稿
    Approved, // 已审批
}

impl BoqStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "APPROVED" => BoqStatus::Approved,
            _ => BoqStatus::Draft, // 默认值
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            BoqStatus::Draft => "DRAFT",
            BoqStatus::Approved => "APPROVED",
        }
    }
}

impl fmt::Display for BoqStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 里程碑状态 (Milestone State)
// ==========================================
// 初始: DRAFT  终态: CLOSED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneState {
    Draft,      // 草稿
    InProgress, // 进行中
    Submitted,  // 已提交
    Verified,   // 已核验
    Closed,     // 已关闭
}

impl MilestoneState {
    pub const ALL: [MilestoneState; 5] = [
        MilestoneState::Draft,
        MilestoneState::InProgress,
        MilestoneState::Submitted,
        MilestoneState::Verified,
        MilestoneState::Closed,
    ];

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(MilestoneState::Draft),
            "IN_PROGRESS" => Some(MilestoneState::InProgress),
            "SUBMITTED" => Some(MilestoneState::Submitted),
            "VERIFIED" => Some(MilestoneState::Verified),
            "CLOSED" => Some(MilestoneState::Closed),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            MilestoneState::Draft => "DRAFT",
            MilestoneState::InProgress => "IN_PROGRESS",
            MilestoneState::Submitted => "SUBMITTED",
            MilestoneState::Verified => "VERIFIED",
            MilestoneState::Closed => "CLOSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MilestoneState::Closed)
    }

    /// 已核验（含关闭）才具备付款资格的前提
    pub fn is_verified_or_closed(&self) -> bool {
        matches!(self, MilestoneState::Verified | MilestoneState::Closed)
    }
}

impl fmt::Display for MilestoneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 审计实体类型 (Entity Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Project,
    ProjectMember,
    Boq,
    BoqItemProgress,
    Milestone,
    Evidence,
}

impl EntityType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PROJECT" => Some(EntityType::Project),
            "PROJECT_MEMBER" => Some(EntityType::ProjectMember),
            "BOQ" => Some(EntityType::Boq),
            "BOQ_ITEM_PROGRESS" => Some(EntityType::BoqItemProgress),
            "MILESTONE" => Some(EntityType::Milestone),
            "EVIDENCE" => Some(EntityType::Evidence),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntityType::Project => "PROJECT",
            EntityType::ProjectMember => "PROJECT_MEMBER",
            EntityType::Boq => "BOQ",
            EntityType::BoqItemProgress => "BOQ_ITEM_PROGRESS",
            EntityType::Milestone => "MILESTONE",
            EntityType::Evidence => "EVIDENCE",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 审计动作类型 (Audit Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ProjectCreated,
    MemberAdded,
    BoqCreated,
    BoqRevised,
    BoqApproved,
    ProgressRecorded,
    MilestoneCreated,
    MilestoneTransitioned,
    ExtraApproved,
    EvidenceSubmitted,
}

impl AuditAction {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PROJECT_CREATED" => Some(AuditAction::ProjectCreated),
            "MEMBER_ADDED" => Some(AuditAction::MemberAdded),
            "BOQ_CREATED" => Some(AuditAction::BoqCreated),
            "BOQ_REVISED" => Some(AuditAction::BoqRevised),
            "BOQ_APPROVED" => Some(AuditAction::BoqApproved),
            "PROGRESS_RECORDED" => Some(AuditAction::ProgressRecorded),
            "MILESTONE_CREATED" => Some(AuditAction::MilestoneCreated),
            "MILESTONE_TRANSITIONED" => Some(AuditAction::MilestoneTransitioned),
            "EXTRA_APPROVED" => Some(AuditAction::ExtraApproved),
            "EVIDENCE_SUBMITTED" => Some(AuditAction::EvidenceSubmitted),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AuditAction::ProjectCreated => "PROJECT_CREATED",
            AuditAction::MemberAdded => "MEMBER_ADDED",
            AuditAction::BoqCreated => "BOQ_CREATED",
            AuditAction::BoqRevised => "BOQ_REVISED",
            AuditAction::BoqApproved => "BOQ_APPROVED",
            AuditAction::ProgressRecorded => "PROGRESS_RECORDED",
            AuditAction::MilestoneCreated => "MILESTONE_CREATED",
            AuditAction::MilestoneTransitioned => "MILESTONE_TRANSITIONED",
            AuditAction::ExtraApproved => "EXTRA_APPROVED",
            AuditAction::EvidenceSubmitted => "EVIDENCE_SUBMITTED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
