pub mod models;

pub mod cards;
pub mod customers;
pub mod dashboard;
pub mod packages;
pub mod payments;
pub mod public;
pub mod templates;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::middleware::extract_current_user;
use crate::state::AppState;

/// All `/api/v1` routes. The payment callback and the public card lookup
/// stay outside the JWT layer: the first is invoked by the gateway, the
/// second by anonymous shoppers.
pub fn create_api_router() -> Router<Arc<AppState>> {
    let protected = Router::new()
        // Card templates
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/:id",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        // Customer cards and stamping
        .route("/cards", get(cards::list_cards).post(cards::issue_card))
        .route("/cards/:id", get(cards::get_card))
        .route("/cards/:id/stamp", post(cards::add_stamp))
        // Customers
        .route("/customers", get(customers::list_customers))
        .route("/customers/search", post(customers::search_customers))
        .route("/customers/:id", get(customers::get_customer))
        // Packages and upgrade
        .route(
            "/packages",
            get(packages::list_packages).post(packages::create_package),
        )
        .route("/packages/:id", get(packages::get_package))
        .route("/upgrade", post(packages::create_order))
        // Payments
        .route(
            "/orders/:reference_id/pay",
            post(payments::pay).get(payments::pay),
        )
        .route("/payment/return", get(payments::payment_return))
        .route("/subscription", get(payments::subscription_status))
        // Dashboard
        .route("/dashboard", get(dashboard::dashboard_stats))
        .layer(from_fn(extract_current_user));

    let public = Router::new()
        // Invoked server-to-server by the gateway; must stay reachable
        // without session state.
        .route("/payment/callback", post(payments::payment_callback))
        .route("/public/card-lookup", post(public::card_lookup));

    Router::new().nest("/api/v1", protected.merge(public))
}
