use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::identity::authenticate;
use crate::models::{
    AddMemberRequest, AssignPanelsRequest, CreatePanelRequest, CreateTaskRequest, Panel,
    PanelAssignment, PanelMember, PanelTask, SubmitReviewRequest, UserRole,
};
use crate::response::ApiResponse;
use crate::store::{AssignmentCoverage, MyAssignment, ReviewOutcome};
use crate::AppState;

#[derive(Serialize)]
pub struct PanelDetail {
    #[serde(flatten)]
    pub panel: Panel,
    pub members: Vec<PanelMember>,
    pub tasks: Vec<PanelTask>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreatePanelRequest>,
) -> Result<Json<ApiResponse<Panel>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let panel = state.store.create_panel(req).await?;
    Ok(Json(ApiResponse::success("Panel created", panel)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<Panel>>>> {
    authenticate(&state.store, &headers).await?;

    let panels = state.store.list_panels().await?;
    Ok(Json(ApiResponse::success("Panels retrieved", panels)))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PanelDetail>>> {
    authenticate(&state.store, &headers).await?;

    let panel = state.store.get_panel(id).await?;
    let members = state.store.list_panel_members(id).await?;
    let tasks = state.store.list_panel_tasks(id).await?;
    Ok(Json(ApiResponse::success(
        "Panel retrieved",
        PanelDetail {
            panel,
            members,
            tasks,
        },
    )))
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<ApiResponse<PanelMember>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let member = state
        .store
        .add_panel_member(id, req.user_id, req.role)
        .await?;
    Ok(Json(ApiResponse::success("Panel member added", member)))
}

pub async fn list_members(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PanelMember>>>> {
    authenticate(&state.store, &headers).await?;

    let members = state.store.list_panel_members(id).await?;
    Ok(Json(ApiResponse::success("Panel members retrieved", members)))
}

pub async fn add_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<ApiResponse<PanelTask>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let task = state.store.add_panel_task(id, req).await?;
    Ok(Json(ApiResponse::success("Panel task created", task)))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PanelTask>>>> {
    authenticate(&state.store, &headers).await?;

    let tasks = state.store.list_panel_tasks(id).await?;
    Ok(Json(ApiResponse::success("Panel tasks retrieved", tasks)))
}

pub async fn assign(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(nomination_id): Path<Uuid>,
    Json(req): Json<AssignPanelsRequest>,
) -> Result<Json<ApiResponse<Vec<PanelAssignment>>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let assignments = state
        .store
        .assign_panels(nomination_id, &req.panel_ids, identity.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Panels assigned", assignments)))
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((assignment_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SubmitReviewRequest>,
) -> Result<Json<ApiResponse<ReviewOutcome>>> {
    let identity = authenticate(&state.store, &headers).await?;
    if !identity.panel_member {
        return Err(AppError::Authorization(
            "You are not a member of any panel".to_string(),
        ));
    }

    let outcome = state
        .store
        .submit_review(
            assignment_id,
            task_id,
            identity.user_id,
            req.score,
            req.comment,
        )
        .await?;
    Ok(Json(ApiResponse::success("Review recorded", outcome)))
}

pub async fn my_assignments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<MyAssignment>>>> {
    let identity = authenticate(&state.store, &headers).await?;

    let assignments = state.store.my_assignments(identity.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Assignments retrieved",
        assignments,
    )))
}

pub async fn all_assignments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<AssignmentCoverage>>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let assignments = state.store.all_assignments().await?;
    Ok(Json(ApiResponse::success(
        "Assignments retrieved",
        assignments,
    )))
}
