use chrono::Utc;
use sqlx::PgPool;

use super::models::{BillingError, SubscriptionStatus};
use crate::models::billing::Subscription;
use crate::models::Tenant;

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, package_id, status, start_date, end_date, created_at";

const EXPIRY_WARNING_DAYS: i64 = 7;

/// Subscription entitlement reads for a tenant.
pub struct SubscriptionService {
    db: PgPool,
}

impl SubscriptionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The subscription currently granting access: status `active`, now
    /// inside the paid window.
    pub async fn active(&self, tenant: Tenant) -> Result<Option<Subscription>, BillingError> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE user_id = $1
              AND status = 'active'
              AND start_date <= NOW()
              AND end_date >= NOW()
            ORDER BY end_date DESC
            LIMIT 1
            "#
        ))
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?;
        Ok(subscription)
    }

    /// Most recent subscription that is still in play (active, pending or
    /// trial with time left), used on upgrade pages.
    pub async fn ongoing(&self, tenant: Tenant) -> Result<Option<Subscription>, BillingError> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE user_id = $1
              AND status IN ('active', 'pending', 'trial')
              AND end_date >= NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?;
        Ok(subscription)
    }

    pub async fn has_active(&self, tenant: Tenant) -> Result<bool, BillingError> {
        Ok(self.active(tenant).await?.is_some())
    }

    pub async fn status(&self, tenant: Tenant) -> Result<SubscriptionStatus, BillingError> {
        let now = Utc::now();
        let active = self.active(tenant).await?;

        Ok(match active {
            Some(sub) => SubscriptionStatus {
                has_active_subscription: true,
                days_remaining: Some(sub.days_remaining(now)),
                expiring_soon: sub.is_expiring_soon(now, EXPIRY_WARNING_DAYS),
                subscription: Some(sub),
            },
            None => SubscriptionStatus {
                has_active_subscription: false,
                days_remaining: None,
                expiring_soon: false,
                subscription: None,
            },
        })
    }
}
