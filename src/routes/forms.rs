use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::extract::Json;
use crate::identity::authenticate;
use crate::models::{CreateFormRequest, Form, FormField, UpdateFormRequest, UserRole};
use crate::response::ApiResponse;
use crate::AppState;

#[derive(Serialize)]
pub struct FormDetail {
    #[serde(flatten)]
    pub form: Form,
    pub fields: Vec<FormField>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateFormRequest>,
) -> Result<Json<ApiResponse<FormDetail>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let form = state.store.create_form(req).await?;
    let fields = state.store.form_fields(form.id).await?;
    Ok(Json(ApiResponse::success(
        "Form created",
        FormDetail { form, fields },
    )))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<Form>>>> {
    authenticate(&state.store, &headers).await?;

    let forms = state.store.list_forms().await?;
    Ok(Json(ApiResponse::success("Forms retrieved", forms)))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FormDetail>>> {
    authenticate(&state.store, &headers).await?;

    let (form, fields) = state.store.get_form(id).await?;
    Ok(Json(ApiResponse::success(
        "Form retrieved",
        FormDetail { form, fields },
    )))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFormRequest>,
) -> Result<Json<ApiResponse<FormDetail>>> {
    let identity = authenticate(&state.store, &headers).await?;
    identity.require_role(&[UserRole::Hr])?;

    let (form, fields) = state.store.update_form(id, req).await?;
    Ok(Json(ApiResponse::success(
        "Form updated",
        FormDetail { form, fields },
    )))
}
