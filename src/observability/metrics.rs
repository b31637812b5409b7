//! Prometheus metrics for the billing and stamping flows.

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Outbound gateway calls by endpoint and result.
    pub static ref GATEWAY_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_requests_total",
        "Total number of payment gateway requests",
        &["endpoint", "result"]
    )
    .unwrap();

    /// Payment confirmation outcomes by entry point.
    pub static ref PAYMENT_CONFIRMATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "payment_confirmations_total",
        "Payment confirmation flow outcomes",
        &["entry_point", "outcome"]
    )
    .unwrap();

    /// Stamps recorded on customer cards.
    pub static ref STAMPS_ADDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "stamps_added_total",
        "Stamps added to customer cards",
        &["completed_card"]
    )
    .unwrap();

    /// Cards issued to customers.
    pub static ref CARDS_ISSUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cards_issued_total",
        "Customer cards issued",
        &["new_customer"]
    )
    .unwrap();
}

pub fn record_gateway_request(endpoint: &str, success: bool) {
    GATEWAY_REQUESTS_TOTAL
        .with_label_values(&[endpoint, if success { "ok" } else { "error" }])
        .inc();
}

pub fn record_payment_confirmation(entry_point: &str, outcome: &str) {
    PAYMENT_CONFIRMATIONS_TOTAL
        .with_label_values(&[entry_point, outcome])
        .inc();
}

pub fn record_stamp_added(completed: bool) {
    STAMPS_ADDED_TOTAL
        .with_label_values(&[if completed { "yes" } else { "no" }])
        .inc();
}

pub fn record_card_issued(new_customer: bool) {
    CARDS_ISSUED_TOTAL
        .with_label_values(&[if new_customer { "yes" } else { "no" }])
        .inc();
}
