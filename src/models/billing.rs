//! Monetization entities: packages, orders, payments, subscriptions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Static plan catalog, admin-managed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Package {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    /// Entitlement window in days.
    pub duration: i32,
    pub description: Option<String>,
    pub features: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub const ORDER_STATUS_PENDING: &str = "pending";
pub const ORDER_STATUS_COMPLETED: &str = "completed";
pub const ORDER_STATUS_FAILED: &str = "failed";
pub const ORDER_STATUS_CANCELLED: &str = "cancelled";

/// One consistent status vocabulary for payments. `pending` is the only
/// non-terminal state.
pub const PAYMENT_STATUS_PENDING: &str = "pending";
pub const PAYMENT_STATUS_COMPLETED: &str = "completed";
pub const PAYMENT_STATUS_FAILED: &str = "failed";
pub const PAYMENT_STATUS_CANCELLED: &str = "cancelled";

pub const SUBSCRIPTION_STATUS_ACTIVE: &str = "active";
pub const SUBSCRIPTION_STATUS_PENDING: &str = "pending";
pub const SUBSCRIPTION_STATUS_TRIAL: &str = "trial";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub package_id: i64,
    /// External-facing identifier (`ORD-` + random token). The numeric id is
    /// never exposed in payment URLs.
    pub reference_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == ORDER_STATUS_PENDING
    }
}

/// One settlement attempt for an order. Retries create new rows; the latest
/// row is "the" payment for the order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub status: String,
    pub provider: String,
    pub transaction_id: Option<String>,
    pub provider_data: Option<serde_json::Value>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_pending(&self) -> bool {
        self.status == PAYMENT_STATUS_PENDING
    }

    pub fn is_completed(&self) -> bool {
        self.status == PAYMENT_STATUS_COMPLETED
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub package_id: i64,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Active means status `active` and `now` inside the paid window.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SUBSCRIPTION_STATUS_ACTIVE
            && self.start_date <= now
            && self.end_date >= now
    }

    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.end_date - now).num_days().max(0)
    }

    pub fn is_expiring_soon(&self, now: DateTime<Utc>, within_days: i64) -> bool {
        let remaining = self.days_remaining(now);
        self.is_active_at(now) && remaining > 0 && remaining <= within_days
    }
}

/// Merchant account row. Only the contact snapshot is read here; credentials
/// and auth endpoints live outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserContact {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subscription(status: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Subscription {
        Subscription {
            id: 1,
            user_id: 1,
            package_id: 1,
            status: status.to_string(),
            start_date: start,
            end_date: end,
            created_at: start,
        }
    }

    #[test]
    fn subscription_active_inside_window() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        assert!(subscription(SUBSCRIPTION_STATUS_ACTIVE, start, end).is_active_at(now));
    }

    #[test]
    fn subscription_inactive_after_end() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert!(!subscription(SUBSCRIPTION_STATUS_ACTIVE, start, end).is_active_at(now));
    }

    #[test]
    fn trial_status_is_not_active() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        assert!(!subscription(SUBSCRIPTION_STATUS_TRIAL, start, end).is_active_at(now));
    }

    #[test]
    fn days_remaining_floors_at_zero() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            subscription(SUBSCRIPTION_STATUS_ACTIVE, start, end).days_remaining(after),
            0
        );
    }

    #[test]
    fn expiring_soon_within_week() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 27, 0, 0, 0).unwrap();
        let sub = subscription(SUBSCRIPTION_STATUS_ACTIVE, start, end);
        assert!(sub.is_expiring_soon(now, 7));
        let early = Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap();
        assert!(!sub.is_expiring_soon(early, 7));
    }
}
