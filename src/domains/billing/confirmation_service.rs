use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info, warn};

use super::models::{BillingError, ConfirmOutcome, ConfirmStatus, OrderSummary, SubscriptionSummary};
use super::order_service::{OrderService, ORDER_COLUMNS};
use crate::models::billing::{
    Order, Payment, Subscription, ORDER_STATUS_COMPLETED, ORDER_STATUS_PENDING,
    PAYMENT_STATUS_COMPLETED, PAYMENT_STATUS_PENDING, SUBSCRIPTION_STATUS_ACTIVE,
};
use crate::models::Tenant;
use crate::observability::metrics::record_payment_confirmation;
use crate::services::chip::ChipClient;

const PAYMENT_COLUMNS: &str =
    "id, order_id, user_id, amount, status, provider, transaction_id, provider_data, paid_at, created_at";

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, package_id, status, start_date, end_date, created_at";

/// The payment confirmation state machine. Two entry points — the browser
/// return redirect and the gateway's server callback — converge on the same
/// transition logic; the paid branch runs at most once per purchase.
pub struct ConfirmationService {
    db: PgPool,
    orders: OrderService,
    chip: ChipClient,
}

impl ConfirmationService {
    pub fn new(db: PgPool, chip: ChipClient) -> Self {
        Self {
            orders: OrderService::new(db.clone()),
            db,
            chip,
        }
    }

    /// Return-redirect entry point: resolve by order reference within the
    /// tenant, honor an explicit client-asserted terminal status, otherwise
    /// verify with the gateway.
    pub async fn confirm_return(
        &self,
        tenant: Tenant,
        reference_id: &str,
        client_status: Option<&str>,
    ) -> Result<ConfirmOutcome, BillingError> {
        let order = self.orders.find_by_reference(tenant, reference_id).await?;
        let payment = self.latest_payment(order.id).await?;
        let summary = self.order_summary(&order).await?;

        // Client-asserted failure/cancel shortcut. Only a still-pending order
        // may take it; on anything else the assertion is ignored and the
        // gateway is asked instead, so a forged redirect can never downgrade
        // a settled order.
        if let Some(status @ ("failed" | "cancelled")) = client_status {
            if order.is_pending() && payment.is_pending() {
                self.mark_terminal(&order, &payment, status).await?;

                let confirm_status = if status == "cancelled" {
                    ConfirmStatus::Cancelled
                } else {
                    ConfirmStatus::Failed
                };
                record_payment_confirmation("return", confirm_status.as_str());
                return Ok(ConfirmOutcome {
                    status: confirm_status,
                    message: if confirm_status == ConfirmStatus::Cancelled {
                        "Payment was cancelled.".to_string()
                    } else {
                        "Payment was not successful. Please try again.".to_string()
                    },
                    order: Some(summary),
                    subscription: None,
                });
            }

            warn!(
                reference_id = %order.reference_id,
                order_status = %order.status,
                "ignoring client-asserted {} on non-pending order",
                status
            );
        }

        let outcome = self.verify_with_gateway(&order, &payment, summary).await?;
        record_payment_confirmation("return", outcome.status.as_str());
        Ok(outcome)
    }

    /// Server-to-server callback entry point. The gateway only knows its own
    /// purchase id, so resolution is by transaction id and deliberately
    /// tenant-unscoped — the caller is the gateway, not a logged-in user.
    pub async fn confirm_callback(&self, purchase_id: &str) -> Result<ConfirmOutcome, BillingError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(purchase_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(BillingError::PaymentNotFound)?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(payment.order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(BillingError::OrderNotFound)?;

        let summary = self.order_summary(&order).await?;
        let outcome = self.verify_with_gateway(&order, &payment, summary).await?;
        record_payment_confirmation("callback", outcome.status.as_str());
        Ok(outcome)
    }

    /// Common tail of both entry points: ask the gateway, never the client,
    /// whether the purchase is paid. Anything other than a definite `paid` —
    /// including a transport failure — reports pending without writes, so
    /// the flow is safe to re-run.
    async fn verify_with_gateway(
        &self,
        order: &Order,
        payment: &Payment,
        summary: OrderSummary,
    ) -> Result<ConfirmOutcome, BillingError> {
        let transaction_id = payment
            .transaction_id
            .as_deref()
            .ok_or(BillingError::InvalidPaymentResponse)?;

        let purchase = self.chip.get_purchase(transaction_id).await;
        let status = purchase
            .as_ref()
            .and_then(|p| p.get("status"))
            .and_then(Value::as_str);

        if status != Some("paid") {
            info!(
                reference_id = %order.reference_id,
                transaction_id,
                gateway_status = status.unwrap_or("unavailable"),
                "purchase not settled yet"
            );
            return Ok(ConfirmOutcome {
                status: ConfirmStatus::Pending,
                message: "Payment is being processed. Please wait...".to_string(),
                order: Some(summary),
                subscription: None,
            });
        }

        // Checked above; safe to take the payload by value.
        let purchase_info = purchase.unwrap_or(Value::Null);
        let subscription = self
            .process_successful_payment(order, payment, &purchase_info)
            .await?;

        Ok(ConfirmOutcome {
            status: ConfirmStatus::Success,
            message: "Payment successful! Your subscription has been activated.".to_string(),
            order: Some(summary),
            subscription: subscription.as_ref().map(SubscriptionSummary::from),
        })
    }

    /// The confirmation transaction. All-or-nothing: the payment check-and-
    /// set, the order transition and the subscription upsert commit together
    /// or not at all, so a completed payment always has its subscription.
    ///
    /// The conditional update on the payment row is the idempotency guard:
    /// whichever of the racing return/callback triggers moves it off
    /// `pending` runs the subscription math; the loser sees zero rows and
    /// reports success without extending again.
    async fn process_successful_payment(
        &self,
        order: &Order,
        payment: &Payment,
        purchase_info: &Value,
    ) -> Result<Option<Subscription>, BillingError> {
        let mut tx = self.db.begin().await?;

        let claimed: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE payments
            SET status = $1, provider_data = $2, paid_at = NOW()
            WHERE id = $3 AND status = $4
            RETURNING id
            "#,
        )
        .bind(PAYMENT_STATUS_COMPLETED)
        .bind(purchase_info)
        .bind(payment.id)
        .bind(PAYMENT_STATUS_PENDING)
        .fetch_optional(&mut *tx)
        .await?;

        if claimed.is_none() {
            tx.rollback().await?;

            let (current_status,): (String,) =
                sqlx::query_as(r#"SELECT status FROM payments WHERE id = $1"#)
                    .bind(payment.id)
                    .fetch_one(&self.db)
                    .await?;

            if current_status == PAYMENT_STATUS_COMPLETED {
                info!(
                    reference_id = %order.reference_id,
                    payment_id = payment.id,
                    "payment already confirmed, skipping subscription extension"
                );
                return Ok(self.current_subscription(order).await?);
            }

            return Err(BillingError::AlreadyProcessed {
                status: current_status,
            });
        }

        let result = self.apply_paid_transitions(&mut tx, order).await;
        match result {
            Ok(subscription) => {
                tx.commit().await?;
                info!(
                    reference_id = %order.reference_id,
                    payment_id = payment.id,
                    subscription_id = subscription.id,
                    "payment completed"
                );
                Ok(Some(subscription))
            }
            Err(e) => {
                // Roll back so payment and order stay pending for a retry —
                // never a completed payment without an active subscription.
                error!(
                    reference_id = %order.reference_id,
                    payment_id = payment.id,
                    "confirmation transaction failed, rolling back: {}",
                    e
                );
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    async fn apply_paid_transitions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<Subscription, BillingError> {
        sqlx::query(r#"UPDATE orders SET status = $1 WHERE id = $2"#)
            .bind(ORDER_STATUS_COMPLETED)
            .bind(order.id)
            .execute(&mut **tx)
            .await?;

        let (duration,): (i32,) =
            sqlx::query_as(r#"SELECT duration FROM packages WHERE id = $1"#)
                .bind(order.package_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(BillingError::PackageNotFound)?;

        let existing = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE user_id = $1 AND package_id = $2
            FOR UPDATE
            "#
        ))
        .bind(order.user_id)
        .bind(order.package_id)
        .fetch_optional(&mut **tx)
        .await?;

        let now = Utc::now();
        let (start_date, end_date) = subscription_window(now, existing.as_ref(), duration);

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (user_id, package_id, status, start_date, end_date, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (user_id, package_id)
            DO UPDATE SET status = EXCLUDED.status,
                          start_date = EXCLUDED.start_date,
                          end_date = EXCLUDED.end_date
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(order.user_id)
        .bind(order.package_id)
        .bind(SUBSCRIPTION_STATUS_ACTIVE)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(subscription)
    }

    async fn mark_terminal(
        &self,
        order: &Order,
        payment: &Payment,
        status: &str,
    ) -> Result<(), BillingError> {
        let mut tx = self.db.begin().await?;

        sqlx::query(r#"UPDATE payments SET status = $1 WHERE id = $2 AND status = $3"#)
            .bind(status)
            .bind(payment.id)
            .bind(PAYMENT_STATUS_PENDING)
            .execute(&mut *tx)
            .await?;

        sqlx::query(r#"UPDATE orders SET status = $1 WHERE id = $2 AND status = $3"#)
            .bind(status)
            .bind(order.id)
            .bind(ORDER_STATUS_PENDING)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            reference_id = %order.reference_id,
            payment_id = payment.id,
            status,
            "order closed from client redirect"
        );

        Ok(())
    }

    async fn latest_payment(&self, order_id: i64) -> Result<Payment, BillingError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(BillingError::PaymentNotFound)?;
        Ok(payment)
    }

    async fn current_subscription(&self, order: &Order) -> Result<Option<Subscription>, BillingError> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1 AND package_id = $2"
        ))
        .bind(order.user_id)
        .bind(order.package_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(subscription)
    }

    async fn order_summary(&self, order: &Order) -> Result<OrderSummary, BillingError> {
        let (package_name,): (String,) =
            sqlx::query_as(r#"SELECT name FROM packages WHERE id = $1"#)
                .bind(order.package_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or(BillingError::PackageNotFound)?;

        Ok(OrderSummary {
            reference_id: order.reference_id.clone(),
            total_amount: order.total_amount,
            package_name,
        })
    }
}

/// Entitlement window for a newly confirmed purchase.
///
/// A currently active subscription keeps its start date and gains the package
/// duration on top of its remaining time; anything else opens a fresh window
/// from now.
pub fn subscription_window(
    now: DateTime<Utc>,
    existing: Option<&Subscription>,
    duration_days: i32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let duration = Duration::days(duration_days as i64);
    match existing {
        Some(sub) if sub.is_active_at(now) => (sub.start_date, sub.end_date + duration),
        _ => (now, now + duration),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::models::billing::SUBSCRIPTION_STATUS_PENDING;

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
    fn fresh_window_starts_now() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let (start, end) = subscription_window(now, None, 30);
        assert_eq!(start, now);
        assert_eq!(end, now + Duration::days(30));
    }

    #[test]
    fn active_subscription_extends_instead_of_resetting() {
        // Purchased at T, renewed at T+10d: end becomes T+40d and the start
        // date is untouched.
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let existing = subscription(SUBSCRIPTION_STATUS_ACTIVE, t, t + Duration::days(30));
        let renewal_time = t + Duration::days(10);

        let (start, end) = subscription_window(renewal_time, Some(&existing), 30);
        assert_eq!(start, t);
        assert_eq!(end, t + Duration::days(40));
    }

    #[test]
    fn lapsed_subscription_resets_from_now() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let existing = subscription(SUBSCRIPTION_STATUS_ACTIVE, t, t + Duration::days(30));
        let late = t + Duration::days(60);

        let (start, end) = subscription_window(late, Some(&existing), 30);
        assert_eq!(start, late);
        assert_eq!(end, late + Duration::days(30));
    }

    #[test]
    fn non_active_status_resets_from_now() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let existing = subscription(SUBSCRIPTION_STATUS_PENDING, t, t + Duration::days(30));
        let now = t + Duration::days(5);

        let (start, end) = subscription_window(now, Some(&existing), 30);
        assert_eq!(start, now);
        assert_eq!(end, now + Duration::days(30));
    }
}
