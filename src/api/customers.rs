use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use super::cards::PageParams;
use super::models::ApiError;
use crate::domains::loyalty::models::PhoneSearchRequest;
use crate::middleware::auth::CurrentUser;
use crate::models::Tenant;
use crate::state::AppState;

/// GET /api/v1/customers
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Query(page): Query<PageParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let customers = state
        .customer_service
        .list(Tenant::of(&current_user), page.limit(), page.offset())
        .await?;

    Ok(Json(serde_json::json!({ "success": true, "customers": customers })))
}

/// GET /api/v1/customers/:id
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let customer = state
        .customer_service
        .detail(Tenant::of(&current_user), id)
        .await?;

    Ok(Json(serde_json::json!({ "success": true, "customer": customer })))
}

/// POST /api/v1/customers/search — tenant-scoped phone lookup backing the
/// issuance form.
pub async fn search_customers(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<PhoneSearchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate().map_err(ApiError::from_validation)?;

    let found = state
        .customer_service
        .search_by_phone(Tenant::of(&current_user), &payload.phone)
        .await?;

    Ok(match found {
        Some((customer, cards)) => Json(serde_json::json!({
            "success": true,
            "customer": customer,
            "cards": cards,
        })),
        None => Json(serde_json::json!({
            "success": true,
            "customer": null,
            "cards": [],
        })),
    })
}
