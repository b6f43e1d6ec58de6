// ==========================================
// 里程碑状态机集成测试
// ==========================================
// 职责: 转换边、前置条件、角色、项目作用域与失败无副作用
// ==========================================


#[cfg(test)]
mod milestone_state_machine_test {
    use construction_pm::domain::milestone::NewMilestone;
    use construction_pm::domain::principal::Principal;
    use construction_pm::domain::types::{AuditAction, EntityType, MilestoneState, ProjectStatus, Role};
    use construction_pm::engine::EngineError;

    use crate::test_helpers::*;

    fn transition_count(env: &TestEnv, milestone_id: &str) -> usize {
        env.audit_repo
            .find_by_entity(EntityType::Milestone, milestone_id)
            .unwrap()
            .iter()
            .filter(|e| e.action == AuditAction::MilestoneTransitioned)
            .count()
    }

    // ==========================================
    // 正常流程
    // ==========================================

    #[test]
    fn test_full_lifecycle_to_closed() {
        let env = setup_env();
        let boq = seed_approved_boq(&env);
        let milestone = seed_milestone(&env, Some(&boq.boq.boq_id), false);

        let verified = drive_to_verified(&env, &milestone.milestone_id);
        assert_eq!(verified.state, MilestoneState::Verified);

        let closed = env
            .state_machine
            .transition(&env.owner, &milestone.milestone_id, MilestoneState::Closed, None, None)
            .unwrap();
        assert_eq!(closed.milestone.state, MilestoneState::Closed);
        assert!(closed.eligibility.eligible);

        // 4 次转换，每次一条审计
        assert_eq!(transition_count(&env, &milestone.milestone_id), 4);

        // 修订号单调递增
        assert_eq!(closed.milestone.revision, milestone.revision + 4);
    }

    #[test]
    fn test_transition_audit_carries_before_after_and_reason() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);

        env.state_machine
            .transition(
                &env.vendor,
                &milestone.milestone_id,
                MilestoneState::InProgress,
                Some("进场施工".to_string()),
                None,
            )
            .unwrap();

        let logs = env
            .audit_repo
            .find_by_entity(EntityType::Milestone, &milestone.milestone_id)
            .unwrap();
        let entry = logs
            .iter()
            .find(|e| e.action == AuditAction::MilestoneTransitioned)
            .unwrap();

        assert_eq!(entry.actor_id, "vendor-1");
        assert_eq!(entry.actor_role, Role::Vendor);
        assert_eq!(entry.note.as_deref(), Some("进场施工"));
        assert_eq!(entry.before_json.as_ref().unwrap()["state"], "DRAFT");
        assert_eq!(entry.after_json.as_ref().unwrap()["state"], "IN_PROGRESS");
    }

    #[test]
    fn test_rework_edge_submitted_back_to_in_progress() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);
        let sm = &env.state_machine;

        sm.transition(&env.vendor, &milestone.milestone_id, MilestoneState::InProgress, None, None)
            .unwrap();
        sm.submit_evidence(&env.vendor, &milestone.milestone_id, None, vec![photo()])
            .unwrap();
        sm.transition(&env.vendor, &milestone.milestone_id, MilestoneState::Submitted, None, None)
            .unwrap();

        let reworked = sm
            .transition(
                &env.pmc,
                &milestone.milestone_id,
                MilestoneState::InProgress,
                Some("照片不清晰，返工".to_string()),
                None,
            )
            .unwrap();
        assert_eq!(reworked.milestone.state, MilestoneState::InProgress);
    }

    // ==========================================
    // 非法转换
    // ==========================================

    #[test]
    fn test_draft_to_verified_is_invalid_and_writes_nothing() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);

        let err = env
            .state_machine
            .transition(&env.owner, &milestone.milestone_id, MilestoneState::Verified, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: MilestoneState::Draft,
                to: MilestoneState::Verified
            }
        ));

        let detail = env
            .state_machine
            .get_milestone(&env.owner, &milestone.milestone_id)
            .unwrap();
        assert_eq!(detail.milestone.state, MilestoneState::Draft);
        assert_eq!(detail.milestone.revision, milestone.revision);
        assert_eq!(transition_count(&env, &milestone.milestone_id), 0);
    }

    #[test]
    fn test_closed_is_terminal() {
        let env = setup_env();
        let boq = seed_approved_boq(&env);
        let milestone = seed_milestone(&env, Some(&boq.boq.boq_id), false);
        drive_to_verified(&env, &milestone.milestone_id);
        env.state_machine
            .transition(&env.owner, &milestone.milestone_id, MilestoneState::Closed, None, None)
            .unwrap();

        for target in MilestoneState::ALL {
            let err = env
                .state_machine
                .transition(&env.owner, &milestone.milestone_id, target, None, None)
                .unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidTransition { .. }),
                "CLOSED -> {} 应被拒绝",
                target
            );
        }

        // 关闭后不再接收证据
        let err = env
            .state_machine
            .submit_evidence(&env.vendor, &milestone.milestone_id, None, vec![photo()])
            .unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));
    }

    // ==========================================
    // 前置条件
    // ==========================================

    #[test]
    fn test_submit_without_evidence_fails_precondition() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);
        env.state_machine
            .transition(&env.vendor, &milestone.milestone_id, MilestoneState::InProgress, None, None)
            .unwrap();

        let err = env
            .state_machine
            .transition(&env.vendor, &milestone.milestone_id, MilestoneState::Submitted, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));

        let detail = env
            .state_machine
            .get_milestone(&env.vendor, &milestone.milestone_id)
            .unwrap();
        assert_eq!(detail.milestone.state, MilestoneState::InProgress);
        assert_eq!(detail.evidence_count, 0);
    }

    #[test]
    fn test_close_requires_eligibility() {
        let env = setup_env();
        let boq = seed_boq(&env);
        let milestone = seed_milestone(&env, Some(&boq.boq.boq_id), false);
        drive_to_verified(&env, &milestone.milestone_id);

        // BOQ 未审批
        let err = env
            .state_machine
            .transition(&env.owner, &milestone.milestone_id, MilestoneState::Closed, None, None)
            .unwrap_err();
        assert!(matches!(&err, EngineError::PreconditionFailed(msg) if msg.contains("BOQ not approved")));

        env.boq_engine.approve(&env.owner, &boq.boq.boq_id).unwrap();
        let closed = env
            .state_machine
            .transition(&env.owner, &milestone.milestone_id, MilestoneState::Closed, None, None)
            .unwrap();
        assert_eq!(closed.milestone.state, MilestoneState::Closed);
    }

    // ==========================================
    // 角色
    // ==========================================

    #[test]
    fn test_vendor_cannot_verify() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);
        let sm = &env.state_machine;
        sm.transition(&env.vendor, &milestone.milestone_id, MilestoneState::InProgress, None, None)
            .unwrap();
        sm.submit_evidence(&env.vendor, &milestone.milestone_id, None, vec![photo()])
            .unwrap();
        sm.transition(&env.vendor, &milestone.milestone_id, MilestoneState::Submitted, None, None)
            .unwrap();

        let err = sm
            .transition(&env.vendor, &milestone.milestone_id, MilestoneState::Verified, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { role: Role::Vendor, .. }));

        let detail = sm.get_milestone(&env.vendor, &milestone.milestone_id).unwrap();
        assert_eq!(detail.milestone.state, MilestoneState::Submitted);
    }

    #[test]
    fn test_viewer_cannot_transition_but_can_read() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);

        let err = env
            .state_machine
            .transition(&env.viewer, &milestone.milestone_id, MilestoneState::InProgress, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        let detail = env
            .state_machine
            .get_milestone(&env.viewer, &milestone.milestone_id)
            .unwrap();
        assert_eq!(detail.milestone.state, MilestoneState::Draft);
    }

    // ==========================================
    // 项目作用域 / 并发
    // ==========================================

    #[test]
    fn test_milestone_of_other_project_is_not_found() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);

        let (_other, outsider) = env
            .registry
            .create_project("owner-2", "其他项目", ProjectStatus::Ongoing, false)
            .unwrap();

        let err = env
            .state_machine
            .transition(&outsider, &milestone.milestone_id, MilestoneState::InProgress, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        // 伪造主体: 角色正确但项目不匹配
        let forged = Principal::new("another-project", "owner-1", Role::Owner);
        let err = env
            .state_machine
            .get_milestone(&forged, &milestone.milestone_id)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_stale_expected_revision_is_conflict() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);

        env.state_machine
            .transition(
                &env.vendor,
                &milestone.milestone_id,
                MilestoneState::InProgress,
                None,
                Some(milestone.revision),
            )
            .unwrap();

        let err = env
            .state_machine
            .transition(
                &env.pmc,
                &milestone.milestone_id,
                MilestoneState::Submitted,
                None,
                Some(milestone.revision),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    // ==========================================
    // 创建 / 额外工作审批
    // ==========================================

    #[test]
    fn test_create_milestone_validates_links() {
        let env = setup_env();
        let boq = seed_boq(&env);
        let item_id = boq.items[0].item_id.clone();

        let created = env
            .state_machine
            .create_milestone(
                &env.pmc,
                &env.project_id,
                NewMilestone {
                    title: "钢筋绑扎".to_string(),
                    boq_id: Some(boq.boq.boq_id.clone()),
                    linked_item_ids: vec![item_id.clone()],
                    is_extra: false,
                },
            )
            .unwrap();
        let detail = env
            .state_machine
            .get_milestone(&env.pmc, &created.milestone_id)
            .unwrap();
        assert_eq!(detail.linked_item_ids, vec![item_id]);
        assert!(detail.eligibility.is_some());

        let err = env
            .state_machine
            .create_milestone(
                &env.pmc,
                &env.project_id,
                NewMilestone {
                    title: "无效关联".to_string(),
                    boq_id: Some(boq.boq.boq_id.clone()),
                    linked_item_ids: vec!["missing-item".to_string()],
                    is_extra: false,
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));

        let err = env
            .state_machine
            .create_milestone(&env.vendor, &env.project_id, NewMilestone::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        let err = env
            .state_machine
            .create_milestone(&env.pmc, &env.project_id, NewMilestone::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_approve_extra_rules() {
        let env = setup_env();
        let extra = seed_milestone(&env, None, true);
        let regular = seed_milestone(&env, None, false);

        let err = env
            .state_machine
            .approve_extra(&env.pmc, &extra.milestone_id)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        let err = env
            .state_machine
            .approve_extra(&env.owner, &regular.milestone_id)
            .unwrap_err();
        assert!(matches!(err, EngineError::PreconditionFailed(_)));

        let approved = env
            .state_machine
            .approve_extra(&env.owner, &extra.milestone_id)
            .unwrap();
        assert!(approved.milestone.is_extra_approved());
        assert_eq!(approved.milestone.extra_approved_by.as_deref(), Some("owner-1"));

        let err = env
            .state_machine
            .approve_extra(&env.owner, &extra.milestone_id)
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        // 重复审批不改动首次审批的记录
        let after = env
            .state_machine
            .get_milestone(&env.owner, &extra.milestone_id)
            .unwrap()
            .milestone;
        assert_eq!(after.extra_approved_at, approved.milestone.extra_approved_at);
        assert_eq!(after.extra_approved_by, approved.milestone.extra_approved_by);
        assert_eq!(after.revision, approved.milestone.revision);

        let approvals = env
            .audit_repo
            .find_by_entity(EntityType::Milestone, &extra.milestone_id)
            .unwrap()
            .iter()
            .filter(|e| e.action == AuditAction::ExtraApproved)
            .count();
        assert_eq!(approvals, 1);
    }

    #[test]
    fn test_evidence_listing() {
        let env = setup_env();
        let milestone = seed_milestone(&env, None, false);

        env.state_machine
            .submit_evidence(
                &env.vendor,
                &milestone.milestone_id,
                Some("第一批".to_string()),
                vec![photo(), photo()],
            )
            .unwrap();

        let evidence = env
            .state_machine
            .list_evidence(&env.viewer, &milestone.milestone_id)
            .unwrap();
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].files.len(), 2);
        assert_eq!(evidence[0].submitted_by, "vendor-1");

        let mut bad = photo();
        bad.storage_key = "  ".to_string();
        let err = env
            .state_machine
            .submit_evidence(&env.vendor, &milestone.milestone_id, None, vec![bad])
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
