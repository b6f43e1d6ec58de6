use crate::api::{CreateBoqRequest, ReviseRequest};
use crate::app::auth::SessionContext;
use crate::app::state::AppState;
use crate::domain::boq::NewProgress;

use super::common::{authenticate, respond, run_blocking, ApiEnvelope};

// ==========================================
// BOQ 相关命令
// ==========================================

pub async fn create_boq(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    request: CreateBoqRequest,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.boq_api.clone();
        let project_id = project_id.to_string();
        run_blocking("cmd.create_boq", move || api.create_boq(&principal, &project_id, request)).await
    }
    .await;
    respond("create_boq", result)
}

/// GET {boq}
pub async fn get_boq(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    boq_id: String,
    revision: Option<i32>,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.boq_api.clone();
        run_blocking("cmd.get_boq", move || api.get_boq(&principal, &boq_id, revision)).await
    }
    .await;
    respond("get_boq", result)
}

/// POST {boq}/revise
pub async fn revise_boq(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    boq_id: String,
    request: ReviseRequest,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.boq_api.clone();
        run_blocking("cmd.revise_boq", move || api.revise(&principal, &boq_id, &request)).await
    }
    .await;
    respond("revise_boq", result)
}

/// POST {boq}/approve
pub async fn approve_boq(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    boq_id: String,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.boq_api.clone();
        run_blocking("cmd.approve_boq", move || api.approve(&principal, &boq_id)).await
    }
    .await;
    respond("approve_boq", result)
}

pub async fn record_boq_progress(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    boq_id: String,
    progress: NewProgress,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.boq_api.clone();
        run_blocking("cmd.record_boq_progress", move || {
            api.record_progress(&principal, &boq_id, progress)
        })
        .await
    }
    .await;
    respond("record_boq_progress", result)
}

pub async fn list_item_progress(
    state: &AppState,
    session: Option<SessionContext>,
    project_id: &str,
    boq_id: String,
    item_id: String,
) -> ApiEnvelope {
    let result = async {
        let principal = authenticate(state, session.as_ref(), project_id).await?;
        let api = state.boq_api.clone();
        run_blocking("cmd.list_item_progress", move || {
            api.item_progress(&principal, &boq_id, &item_id)
        })
        .await
    }
    .await;
    respond("list_item_progress", result)
}
