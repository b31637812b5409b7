use axum::{extract::State, Json};
use std::sync::Arc;
use validator::Validate;

use super::models::ApiError;
use crate::domains::loyalty::models::PhoneSearchRequest;
use crate::state::AppState;

/// POST /api/v1/public/card-lookup — the "find my card" feature on the
/// landing page. Intentionally unauthenticated and intentionally
/// cross-tenant: a shopper may hold cards at many shops.
pub async fn card_lookup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PhoneSearchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    payload.validate().map_err(ApiError::from_validation)?;

    let customers = state
        .customer_service
        .public_card_lookup(&payload.phone)
        .await?;

    if customers.is_empty() {
        return Ok(Json(serde_json::json!({
            "success": false,
            "message": "No customer found with this phone number.",
        })));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "customers": customers,
    })))
}
