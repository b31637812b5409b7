use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use super::models::ApiError;
use crate::domains::loyalty::models::{CreateTemplateRequest, TemplateWithRewards};
use crate::middleware::auth::CurrentUser;
use crate::models::Tenant;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<TemplateWithRewards>,
    pub has_active_subscription: bool,
}

/// GET /api/v1/templates
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<TemplateListResponse>, ApiError> {
    let tenant = Tenant::of(&current_user);

    let templates = state.template_service.list(tenant).await?;
    let has_active_subscription = state.subscription_service.has_active(tenant).await?;

    Ok(Json(TemplateListResponse {
        success: true,
        templates,
        has_active_subscription,
    }))
}

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    payload.validate().map_err(ApiError::from_validation)?;

    let template = state
        .template_service
        .create(Tenant::of(&current_user), payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "template": template })),
    ))
}

/// GET /api/v1/templates/:id
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let template = state
        .template_service
        .get(Tenant::of(&current_user), id)
        .await?;

    Ok(Json(serde_json::json!({ "success": true, "template": template })))
}

/// PUT /api/v1/templates/:id
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate().map_err(ApiError::from_validation)?;

    let template = state
        .template_service
        .update(Tenant::of(&current_user), id, payload)
        .await?;

    Ok(Json(serde_json::json!({ "success": true, "template": template })))
}

/// DELETE /api/v1/templates/:id
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .template_service
        .delete(Tenant::of(&current_user), id)
        .await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
