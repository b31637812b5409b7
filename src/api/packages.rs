use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use super::models::ApiError;
use crate::domains::billing::models::{CreateOrderRequest, CreatePackageRequest};
use crate::domains::billing::payment_service::SUPPORTED_PROVIDERS;
use crate::middleware::auth::CurrentUser;
use crate::models::Tenant;
use crate::state::AppState;

/// GET /api/v1/packages
pub async fn list_packages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let packages = state.order_service.list_packages().await?;
    Ok(Json(serde_json::json!({ "success": true, "packages": packages })))
}

/// GET /api/v1/packages/:id
pub async fn get_package(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let package = state.order_service.get_package(id).await?;
    Ok(Json(serde_json::json!({ "success": true, "package": package })))
}

/// POST /api/v1/packages — admin catalog entry; packages have no lifecycle
/// beyond create.
pub async fn create_package(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePackageRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    payload.validate().map_err(ApiError::from_validation)?;

    let package = state.order_service.create_package(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "package": package })),
    ))
}

/// POST /api/v1/upgrade — create a pending order for a package and point the
/// client at the pay endpoint for it.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    payload.validate().map_err(ApiError::from_validation)?;

    if !SUPPORTED_PROVIDERS.contains(&payload.payment_provider.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Unsupported payment provider: {}",
            payload.payment_provider
        )));
    }

    let (order, package) = state
        .order_service
        .create_order(Tenant::of(&current_user), payload.package_id)
        .await?;

    let pay_url = format!(
        "/api/v1/orders/{}/pay?provider={}",
        order.reference_id, payload.payment_provider
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "order": order,
            "package": package,
            "pay_url": pay_url,
        })),
    ))
}
