use crate::api::{SubmitEvidenceRequest, TransitionRequest};
use crate::app::auth::SessionContext;
use crate::app::state::AppState;
use crate::domain::milestone::NewMilestone;

use super::common::{authenticate, respond, run_blocking, ApiEnvelope};

// ==========================================
// 里程碑相关命令
// ==========================================

pub async fn create_milestone(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    request: NewMilestone,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.milestone_api.clone();
        let project_id = project_id.to_string();
        run_blocking("cmd.create_milestone", move || {
            api.create_milestone(&principal, &project_id, request)
        })
        .await
    }
    .await;
    respond("create_milestone", result)
}

pub async fn get_milestone(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    milestone_id: String,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.milestone_api.clone();
        run_blocking("cmd.get_milestone", move || api.get_milestone(&principal, &milestone_id)).await
    }
    .await;
    respond("get_milestone", result)
}

/// POST {milestone}/transition
pub async fn transition_milestone(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    milestone_id: String,
    request: TransitionRequest,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.milestone_api.clone();
        run_blocking("cmd.transition_milestone", move || {
            api.transition(&principal, &milestone_id, request)
        })
        .await
    }
    .await;
    respond("transition_milestone", result)
}

/// POST {milestone}/approve-extra
pub async fn approve_extra(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    milestone_id: String,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.milestone_api.clone();
        run_blocking("cmd.approve_extra", move || api.approve_extra(&principal, &milestone_id)).await
    }
    .await;
    respond("approve_extra", result)
}

pub async fn submit_evidence(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    milestone_id: String,
    request: SubmitEvidenceRequest,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.milestone_api.clone();
        run_blocking("cmd.submit_evidence", move || {
            api.submit_evidence(&principal, &milestone_id, request)
        })
        .await
    }
    .await;
    respond("submit_evidence", result)
}

pub async fn list_evidence(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    milestone_id: String,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.milestone_api.clone();
        run_blocking("cmd.list_evidence", move || api.list_evidence(&principal, &milestone_id)).await
    }
    .await;
    respond("list_evidence", result)
}
