use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::models::ApiError;
use crate::domains::loyalty::models::IssueCardRequest;
use crate::middleware::auth::CurrentUser;
use crate::models::Tenant;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct StampRequest {
    pub notes: Option<String>,
}

/// GET /api/v1/cards
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Query(page): Query<PageParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cards = state
        .card_service
        .list(Tenant::of(&current_user), page.limit(), page.offset())
        .await?;

    Ok(Json(serde_json::json!({ "success": true, "cards": cards })))
}

/// POST /api/v1/cards — issue a card, creating the customer on first sight.
pub async fn issue_card(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<IssueCardRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    payload.validate().map_err(ApiError::from_validation)?;

    let card = state
        .card_service
        .issue(Tenant::of(&current_user), payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "card": card })),
    ))
}

/// GET /api/v1/cards/:id
pub async fn get_card(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tenant = Tenant::of(&current_user);
    let card = state.card_service.get(tenant, id).await?;
    let history = state.card_service.history(tenant, id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "card": card,
        "history": history,
    })))
}

/// POST /api/v1/cards/:id/stamp
pub async fn add_stamp(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    payload: Option<Json<StampRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let notes = payload.and_then(|Json(p)| p.notes);

    info!(card_id = id, user_id = current_user.user_id, "adding stamp");

    let result = state
        .card_service
        .add_stamp(Tenant::of(&current_user), id, notes)
        .await?;

    Ok(Json(serde_json::json!({ "success": true, "stamp": result })))
}
