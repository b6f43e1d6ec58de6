// ==========================================
// 应用命令端到端测试
// ==========================================
// 职责: 认证 → API → 响应信封；错误种类与状态语义映射
// ==========================================


#[cfg(test)]
mod app_commands_test {
    use construction_pm::api::{AuditQueryParams, CreateBoqRequest, ReviseRequest, SubmitEvidenceRequest, TransitionRequest};
    use construction_pm::app::{self, ApiEnvelope, AppState, SessionContext};
    use construction_pm::domain::boq::NewProgress;
    use construction_pm::domain::milestone::NewMilestone;
    use serde_json::json;
    use tempfile::NamedTempFile;

    use crate::test_helpers::create_test_db;

    struct Fixture {
        _temp_file: NamedTempFile,
        state: AppState,
        project_id: String,
    }

    fn session(user_id: &str) -> Option<SessionContext> {
        Some(SessionContext::new(user_id))
    }

    fn data_str(envelope: &ApiEnvelope, pointer: &str) -> String {
        envelope
            .data
            .as_ref()
            .and_then(|d| d.pointer(pointer))
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| panic!("响应缺少字段 {}: {:?}", pointer, envelope))
            .to_string()
    }

    fn error_code(envelope: &ApiEnvelope) -> &str {
        envelope.error.as_ref().map(|e| e.code.as_str()).unwrap_or("")
    }

    /// 项目 + owner/pmc/vendor 三个成员
    async fn setup() -> Fixture {
        let (temp_file, db_path) = create_test_db().unwrap();
        let state = AppState::new(db_path).unwrap();

        let created = app::create_project(&state, session("owner-1"), "E2E 项目".to_string(), None, false).await;
        assert!(created.success, "{:?}", created);
        let project_id = data_str(&created, "/project_id");

        for (user, role) in [("pmc-1", "PMC"), ("vendor-1", "VENDOR")] {
            let added =
                app::add_project_member(&state, session("owner-1"), &project_id, user.to_string(), role.to_string())
                    .await;
            assert!(added.success, "{:?}", added);
        }

        Fixture {
            _temp_file: temp_file,
            state,
            project_id,
        }
    }

    async fn create_boq(fx: &Fixture) -> String {
        let request: CreateBoqRequest = serde_json::from_value(json!({
            "title": "土建",
            "items": [
                { "description": "土方开挖", "unit": "m3", "plannedQuantity": 1500.0, "rate": 28.0 },
                { "description": "垫层", "unit": "m3", "plannedQuantity": 90.0, "rate": 380.0 }
            ]
        }))
        .unwrap();
        let envelope = app::create_boq(&fx.state, session("pmc-1"), &fx.project_id, request).await;
        assert!(envelope.success, "{:?}", envelope);
        data_str(&envelope, "/boq/boq_id")
    }

    async fn create_milestone(fx: &Fixture, boq_id: Option<String>) -> String {
        let request = NewMilestone {
            title: "开挖完成".to_string(),
            boq_id,
            ..Default::default()
        };
        let envelope = app::create_milestone(&fx.state, session("pmc-1"), &fx.project_id, request).await;
        assert!(envelope.success, "{:?}", envelope);
        data_str(&envelope, "/milestone_id")
    }

    fn to_state(state: &str) -> TransitionRequest {
        TransitionRequest {
            to_state: state.to_string(),
            reason: None,
            expected_revision: None,
        }
    }

    // ==========================================
    // 认证
    // ==========================================

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let fx = setup().await;

        let envelope = app::get_boq(&fx.state, None, &fx.project_id, "any".to_string(), None).await;
        assert!(!envelope.success);
        assert_eq!(envelope.status(), 401);
        assert_eq!(error_code(&envelope), "UNAUTHORIZED");

        let envelope = app::create_project(&fx.state, None, "无会话".to_string(), None, false).await;
        assert_eq!(envelope.status(), 401);
    }

    #[tokio::test]
    async fn test_non_member_is_unauthorized() {
        let fx = setup().await;
        let boq_id = create_boq(&fx).await;

        let envelope = app::get_boq(&fx.state, session("stranger"), &fx.project_id, boq_id, None).await;
        assert_eq!(envelope.status(), 401);
    }

    // ==========================================
    // 错误映射
    // ==========================================

    #[tokio::test]
    async fn test_vendor_approve_is_forbidden() {
        let fx = setup().await;
        let boq_id = create_boq(&fx).await;

        let envelope = app::approve_boq(&fx.state, session("vendor-1"), &fx.project_id, boq_id).await;
        assert_eq!(envelope.status(), 403);
        assert_eq!(error_code(&envelope), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_transition_error_kinds() {
        let fx = setup().await;
        let milestone_id = create_milestone(&fx, None).await;

        // 未知状态字符串
        let envelope = app::transition_milestone(
            &fx.state,
            session("pmc-1"),
            &fx.project_id,
            milestone_id.clone(),
            to_state("DONE"),
        )
        .await;
        assert_eq!(envelope.status(), 400);
        assert_eq!(error_code(&envelope), "INVALID_INPUT");

        // 不在转换图内
        let envelope = app::transition_milestone(
            &fx.state,
            session("pmc-1"),
            &fx.project_id,
            milestone_id.clone(),
            to_state("VERIFIED"),
        )
        .await;
        assert_eq!(envelope.status(), 400);
        assert_eq!(error_code(&envelope), "INVALID_TRANSITION");

        // 无证据提交
        let envelope = app::transition_milestone(
            &fx.state,
            session("vendor-1"),
            &fx.project_id,
            milestone_id.clone(),
            to_state("IN_PROGRESS"),
        )
        .await;
        assert!(envelope.success);
        let envelope = app::transition_milestone(
            &fx.state,
            session("vendor-1"),
            &fx.project_id,
            milestone_id.clone(),
            to_state("SUBMITTED"),
        )
        .await;
        assert_eq!(envelope.status(), 400);
        assert_eq!(error_code(&envelope), "PRECONDITION_FAILED");

        // 不存在的里程碑
        let envelope = app::transition_milestone(
            &fx.state,
            session("vendor-1"),
            &fx.project_id,
            "missing".to_string(),
            to_state("IN_PROGRESS"),
        )
        .await;
        assert_eq!(envelope.status(), 404);
        assert_eq!(error_code(&envelope), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_stale_revise_is_conflict() {
        let fx = setup().await;
        let boq_id = create_boq(&fx).await;

        let request: ReviseRequest = serde_json::from_value(json!({
            "reason": "增加回填",
            "changes": {
                "addItems": [
                    { "description": "回填", "unit": "m3", "plannedQuantity": 600.0, "rate": 22.0 }
                ]
            },
            "expectedRevision": 1
        }))
        .unwrap();

        let first = app::revise_boq(&fx.state, session("pmc-1"), &fx.project_id, boq_id.clone(), request.clone()).await;
        assert!(first.success, "{:?}", first);
        assert_eq!(first.data.as_ref().unwrap()["revisionNumber"], 2);

        let second = app::revise_boq(&fx.state, session("owner-1"), &fx.project_id, boq_id, request).await;
        assert_eq!(second.status(), 409);
        assert_eq!(error_code(&second), "CONFLICT");
    }

    #[tokio::test]
    async fn test_parallel_commands_with_same_revision() {
        let fx = setup().await;
        let milestone_id = create_milestone(&fx, None).await;

        let calls = (0..3).map(|_| {
            app::transition_milestone(
                &fx.state,
                session("vendor-1"),
                &fx.project_id,
                milestone_id.clone(),
                TransitionRequest {
                    to_state: "IN_PROGRESS".to_string(),
                    reason: None,
                    expected_revision: Some(1),
                },
            )
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(results.iter().filter(|e| e.success).count(), 1);
        assert_eq!(results.iter().filter(|e| e.status() == 409).count(), 2);
    }

    // ==========================================
    // 正常流程
    // ==========================================

    #[tokio::test]
    async fn test_happy_path_through_commands() {
        let fx = setup().await;
        let boq_id = create_boq(&fx).await;
        let milestone_id = create_milestone(&fx, Some(boq_id.clone())).await;

        let approved = app::approve_boq(&fx.state, session("owner-1"), &fx.project_id, boq_id.clone()).await;
        assert!(approved.success);

        let moved = app::transition_milestone(
            &fx.state,
            session("vendor-1"),
            &fx.project_id,
            milestone_id.clone(),
            to_state("IN_PROGRESS"),
        )
        .await;
        assert!(moved.success);

        let evidence: SubmitEvidenceRequest = serde_json::from_value(json!({
            "note": "开挖完成照片",
            "files": [ { "fileName": "pit.jpg", "storageKey": "ev/pit.jpg", "contentType": "image/jpeg", "sizeBytes": 1024 } ]
        }))
        .unwrap();
        let submitted =
            app::submit_evidence(&fx.state, session("vendor-1"), &fx.project_id, milestone_id.clone(), evidence).await;
        assert!(submitted.success, "{:?}", submitted);

        let listed = app::list_evidence(&fx.state, session("pmc-1"), &fx.project_id, milestone_id.clone()).await;
        assert!(listed.success, "{:?}", listed);
        assert_eq!(listed.data.as_ref().unwrap().as_array().map(Vec::len), Some(1));

        for (user, target) in [("vendor-1", "SUBMITTED"), ("pmc-1", "VERIFIED")] {
            let envelope = app::transition_milestone(
                &fx.state,
                session(user),
                &fx.project_id,
                milestone_id.clone(),
                to_state(target),
            )
            .await;
            assert!(envelope.success, "{} -> {}: {:?}", user, target, envelope);
        }

        let detail = app::get_milestone(&fx.state, session("vendor-1"), &fx.project_id, milestone_id.clone()).await;
        assert_eq!(data_str(&detail, "/milestone/state"), "VERIFIED");
        assert_eq!(detail.data.as_ref().unwrap()["eligibility"]["eligible"], true);

        let closed = app::transition_milestone(
            &fx.state,
            session("owner-1"),
            &fx.project_id,
            milestone_id,
            to_state("CLOSED"),
        )
        .await;
        assert!(closed.success, "{:?}", closed);
        assert_eq!(data_str(&closed, "/milestone/state"), "CLOSED");
    }

    #[tokio::test]
    async fn test_progress_commands() {
        let fx = setup().await;
        let boq_id = create_boq(&fx).await;

        let detail = app::get_boq(&fx.state, session("vendor-1"), &fx.project_id, boq_id.clone(), None).await;
        let item_id = data_str(&detail, "/items/0/item_id");

        let progress: NewProgress = serde_json::from_value(json!({
            "itemId": item_id,
            "quantity": 300.0,
            "amount": 8400.0
        }))
        .unwrap();
        let recorded =
            app::record_boq_progress(&fx.state, session("pmc-1"), &fx.project_id, boq_id.clone(), progress).await;
        assert!(recorded.success, "{:?}", recorded);

        let history =
            app::list_item_progress(&fx.state, session("vendor-1"), &fx.project_id, boq_id, item_id.clone()).await;
        assert!(history.success, "{:?}", history);
        let rows = history.data.as_ref().unwrap().as_array().unwrap();
        assert_eq!(rows.len(), 1);

        let missing = app::list_item_progress(
            &fx.state,
            session("vendor-1"),
            &fx.project_id,
            "missing".to_string(),
            item_id,
        )
        .await;
        assert_eq!(missing.status(), 404);
    }

    #[tokio::test]
    async fn test_audit_commands() {
        let fx = setup().await;
        create_boq(&fx).await;

        let listed = app::list_audit_logs(
            &fx.state,
            session("vendor-1"),
            &fx.project_id,
            AuditQueryParams {
                action: Some("BOQ_CREATED".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(listed.success);
        assert_eq!(listed.data.as_ref().unwrap()["total"], 1);

        let denied =
            app::export_audit_logs(&fx.state, session("vendor-1"), &fx.project_id, AuditQueryParams::default()).await;
        assert_eq!(denied.status(), 403);

        let exported =
            app::export_audit_logs(&fx.state, session("pmc-1"), &fx.project_id, AuditQueryParams::default()).await;
        assert!(exported.success);
        assert!(data_str(&exported, "/csv").starts_with("created_at,log_id,project_id"));
        assert!(data_str(&exported, "/file_name").ends_with(".csv"));
    }

    #[test]
    fn test_error_envelope_json_shape() {
        let envelope = ApiEnvelope::from_error(&construction_pm::api::ApiError::Conflict("stale".to_string()));
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json()).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "CONFLICT");
        assert_eq!(value["error"]["status"], 409);
        assert!(value.get("data").is_none());
    }
}
