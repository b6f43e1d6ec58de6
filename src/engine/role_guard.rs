// ==========================================
// 工程项目管理核心 - 角色守卫
// ==========================================
// 职责: 给定主体角色与允许集合，放行或拒绝
// 红线: 无状态、无副作用、无 I/O 操作
// 红线: 调用点只引用下方的允许集合常量，不做字符串比较
// ==========================================

use crate::domain::principal::Principal;
use crate::domain::types::Role;
use crate::engine::error::{EngineError, EngineResult};

// ==========================================
// 各操作的允许角色集合
// ==========================================

/// 创建/修订 BOQ、记录进度、创建里程碑
pub const BOQ_EDITORS: &[Role] = &[Role::Owner, Role::Pmc];

/// 审批 BOQ、审批额外工作、添加成员
pub const OWNER_ONLY: &[Role] = &[Role::Owner];

/// 里程碑状态转换（进入 VERIFIED 另有限制）
pub const MILESTONE_ACTORS: &[Role] = &[Role::Owner, Role::Pmc, Role::Vendor];

/// 进入 VERIFIED 的核验角色
pub const VERIFIERS: &[Role] = &[Role::Owner, Role::Pmc];

/// 提交证据
pub const EVIDENCE_SUBMITTERS: &[Role] = &[Role::Owner, Role::Pmc, Role::Vendor];

/// 只读访问（全部成员）
pub const READERS: &[Role] = &Role::ALL;

/// 审计日志导出
pub const AUDIT_EXPORTERS: &[Role] = &[Role::Owner, Role::Pmc];

// ==========================================
// RoleGuard - 纯函数工具类
// ==========================================
pub struct RoleGuard;

impl RoleGuard {
    /// 主体角色必须属于允许集合
    ///
    /// # 错误
    /// - `EngineError::Forbidden`: 携带被拒角色与所需集合
    pub fn require_role(principal: &Principal, allowed: &[Role]) -> EngineResult<()> {
        if allowed.contains(&principal.role) {
            Ok(())
        } else {
            Err(EngineError::Forbidden {
                role: principal.role,
                required: allowed.to_vec(),
            })
        }
    }

    /// 审计导出权限（OWNER 或 PMC）
    pub fn can_export_audit_log(principal: &Principal) -> bool {
        AUDIT_EXPORTERS.contains(&principal.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal::new("p1", "u1", role)
    }

    #[test]
    fn test_require_role_allows_members_of_set() {
        for role in [Role::Owner, Role::Pmc] {
            assert!(RoleGuard::require_role(&principal(role), BOQ_EDITORS).is_ok());
        }
    }

    #[test]
    fn test_require_role_rejects_with_role_and_required_set() {
        let err = RoleGuard::require_role(&principal(Role::Vendor), OWNER_ONLY).unwrap_err();
        match err {
            EngineError::Forbidden { role, required } => {
                assert_eq!(role, Role::Vendor);
                assert_eq!(required, vec![Role::Owner]);
            }
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_require_role_is_repeatable() {
        let p = principal(Role::Viewer);
        for _ in 0..3 {
            assert!(RoleGuard::require_role(&p, READERS).is_ok());
            assert!(RoleGuard::require_role(&p, EVIDENCE_SUBMITTERS).is_err());
        }
    }

    #[test]
    fn test_can_export_audit_log() {
        assert!(RoleGuard::can_export_audit_log(&principal(Role::Owner)));
        assert!(RoleGuard::can_export_audit_log(&principal(Role::Pmc)));
        assert!(!RoleGuard::can_export_audit_log(&principal(Role::Vendor)));
        assert!(!RoleGuard::can_export_audit_log(&principal(Role::Viewer)));
    }
}
