use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use super::models::ApiError;
use crate::domains::billing::models::ConfirmStatus;
use crate::middleware::auth::CurrentUser;
use crate::models::Tenant;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PayParams {
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnParams {
    /// Order reference id.
    pub id: String,
    /// Optional client-asserted terminal status (`failed` | `cancelled`).
    pub status: Option<String>,
}

/// POST|GET /api/v1/orders/:reference_id/pay — create a payment attempt and
/// hand back the hosted checkout URL.
pub async fn pay(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(reference_id): Path<String>,
    Query(params): Query<PayParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let provider = params
        .provider
        .ok_or_else(|| ApiError::BadRequest("Payment provider is required.".to_string()))?;

    let checkout_url = state
        .payment_service
        .initiate(Tenant::of(&current_user), &reference_id, &provider)
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "checkout_url": checkout_url,
    })))
}

/// GET /api/v1/payment/return — the browser lands here after checkout. The
/// result is always a renderable document with one of success/failed/
/// cancelled/pending, never a bare error page.
pub async fn payment_return(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Query(params): Query<ReturnParams>,
) -> Json<serde_json::Value> {
    info!(order_id = %params.id, status = ?params.status, "payment return received");

    let result = state
        .confirmation_service
        .confirm_return(
            Tenant::of(&current_user),
            &params.id,
            params.status.as_deref(),
        )
        .await;

    match result {
        Ok(outcome) => Json(serde_json::json!({ "success": true, "result": outcome })),
        Err(e) => {
            error!(order_id = %params.id, "payment return processing failed: {}", e);
            Json(serde_json::json!({
                "success": false,
                "result": {
                    "status": "failed",
                    "message": "An error occurred while processing your payment. Please contact support.",
                },
            }))
        }
    }
}

/// POST /api/v1/payment/callback — server-to-server webhook from the
/// gateway. Unauthenticated by design; the purchase id is re-verified
/// against the gateway before anything transitions.
pub async fn payment_callback(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("payment callback received");

    let purchase_id = body
        .get("purchase_id")
        .or_else(|| body.get("id"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("No purchase ID provided".to_string()))?;

    let outcome = state
        .confirmation_service
        .confirm_callback(purchase_id)
        .await
        .map_err(|e| {
            error!(purchase_id, "payment callback processing failed: {}", e);
            ApiError::from(e)
        })?;

    let message = match outcome.status {
        ConfirmStatus::Success => "Payment processed successfully",
        _ => "Payment not completed",
    };

    Ok(Json(serde_json::json!({ "message": message })))
}

/// GET /api/v1/subscription — current entitlement for the tenant.
pub async fn subscription_status(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = state
        .subscription_service
        .status(Tenant::of(&current_user))
        .await?;

    Ok(Json(serde_json::json!({ "success": true, "subscription_status": status })))
}
