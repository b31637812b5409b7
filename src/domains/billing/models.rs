//! Requests, responses and errors for the billing domain.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::billing::Subscription;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackageRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub price: Decimal,
    #[validate(range(min = 1))]
    pub duration: i32,
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(range(min = 1))]
    pub package_id: i64,
    #[validate(length(min = 1, max = 64))]
    pub payment_provider: String,
}

/// Order block on the payment result document.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub reference_id: String,
    pub total_amount: Decimal,
    pub package_name: String,
}

/// Subscription block on the payment result document, dates as `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummary {
    pub start_date: String,
    pub end_date: String,
}

impl From<&Subscription> for SubscriptionSummary {
    fn from(sub: &Subscription) -> Self {
        Self {
            start_date: sub.start_date.format("%Y-%m-%d").to_string(),
            end_date: sub.end_date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmStatus {
    Success,
    Pending,
    Failed,
    Cancelled,
}

impl ConfirmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// What the confirmation flow reports back, from either entry point. The
/// return path renders this as the result page payload; the callback path
/// only keeps the status and message.
#[derive(Debug, Serialize)]
pub struct ConfirmOutcome {
    pub status: ConfirmStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub has_active_subscription: bool,
    pub days_remaining: Option<i64>,
    pub expiring_soon: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Order not found")]
    OrderNotFound,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Package not found")]
    PackageNotFound,

    #[error("This order has already been processed")]
    AlreadyProcessed { status: String },

    #[error("Unsupported payment provider: {provider}")]
    UnsupportedProvider { provider: String },

    #[error("Invalid payment response from gateway")]
    InvalidPaymentResponse,

    #[error("Order amount cannot be represented in minor units")]
    InvalidAmount,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn confirm_status_vocabulary() {
        assert_eq!(ConfirmStatus::Success.as_str(), "success");
        assert_eq!(ConfirmStatus::Pending.as_str(), "pending");
        assert_eq!(ConfirmStatus::Failed.as_str(), "failed");
        assert_eq!(ConfirmStatus::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn subscription_summary_formats_dates() {
        let sub = Subscription {
            id: 1,
            user_id: 1,
            package_id: 1,
            status: "active".to_string(),
            start_date: Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2025, 3, 31, 8, 30, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap(),
        };
        let summary = SubscriptionSummary::from(&sub);
        assert_eq!(summary.start_date, "2025-03-01");
        assert_eq!(summary.end_date, "2025-03-31");
    }
}
