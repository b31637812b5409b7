use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{error, info};

use super::models::BillingError;
use super::order_service::OrderService;
use crate::models::billing::{
    Order, Package, UserContact, ORDER_STATUS_FAILED, PAYMENT_STATUS_FAILED,
    PAYMENT_STATUS_PENDING,
};
use crate::models::Tenant;
use crate::services::chip::ChipClient;

/// Providers the pay endpoint accepts. Only Chip is wired today.
pub const SUPPORTED_PROVIDERS: &[&str] = &["chip"];

const PURCHASE_CURRENCY: &str = "MYR";

/// Payment initiation: snapshot an attempt row, create the gateway purchase
/// and hand back the hosted checkout URL. Deliberately not idempotent — a
/// retry creates a second Payment attempt for the same order.
pub struct PaymentService {
    db: PgPool,
    orders: OrderService,
    chip: ChipClient,
    app_base_url: String,
}

impl PaymentService {
    pub fn new(db: PgPool, chip: ChipClient, app_base_url: String) -> Self {
        Self {
            orders: OrderService::new(db.clone()),
            db,
            chip,
            app_base_url,
        }
    }

    pub async fn initiate(
        &self,
        tenant: Tenant,
        reference_id: &str,
        provider: &str,
    ) -> Result<String, BillingError> {
        if !SUPPORTED_PROVIDERS.contains(&provider) {
            return Err(BillingError::UnsupportedProvider {
                provider: provider.to_string(),
            });
        }

        let order = self.orders.find_by_reference(tenant, reference_id).await?;
        if !order.is_pending() {
            return Err(BillingError::AlreadyProcessed {
                status: order.status.clone(),
            });
        }

        let package = self.orders.get_package(order.package_id).await?;
        let user = self.orders.user_contact(tenant).await?;

        let payment_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO payments (order_id, user_id, amount, status, provider, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id
            "#,
        )
        .bind(order.id)
        .bind(tenant.user_id())
        .bind(order.total_amount)
        .bind(PAYMENT_STATUS_PENDING)
        .bind(provider)
        .fetch_one(&self.db)
        .await?;

        match self.create_gateway_purchase(&order, &package, &user).await {
            Ok((transaction_id, checkout_url, raw)) => {
                sqlx::query(
                    r#"UPDATE payments SET transaction_id = $1, provider_data = $2 WHERE id = $3"#,
                )
                .bind(&transaction_id)
                .bind(&raw)
                .bind(payment_id)
                .execute(&self.db)
                .await?;

                info!(
                    reference_id = %order.reference_id,
                    transaction_id = %transaction_id,
                    "payment initiated"
                );

                Ok(checkout_url)
            }
            Err(e) => {
                error!(
                    reference_id = %order.reference_id,
                    provider,
                    "payment initiation failed: {}",
                    e
                );
                sqlx::query(r#"UPDATE payments SET status = $1 WHERE id = $2"#)
                    .bind(PAYMENT_STATUS_FAILED)
                    .bind(payment_id)
                    .execute(&self.db)
                    .await?;
                sqlx::query(r#"UPDATE orders SET status = $1 WHERE id = $2"#)
                    .bind(ORDER_STATUS_FAILED)
                    .bind(order.id)
                    .execute(&self.db)
                    .await?;
                Err(e)
            }
        }
    }

    async fn create_gateway_purchase(
        &self,
        order: &Order,
        package: &Package,
        user: &UserContact,
    ) -> Result<(String, String, Value), BillingError> {
        let payload = build_purchase_payload(
            &self.app_base_url,
            self.chip.brand_id(),
            order,
            package,
            user,
            Utc::now(),
        )?;

        let purchase = self
            .chip
            .create_purchase(&payload)
            .await
            .ok_or(BillingError::InvalidPaymentResponse)?;

        let transaction_id = purchase
            .get("id")
            .and_then(Value::as_str)
            .ok_or(BillingError::InvalidPaymentResponse)?
            .to_string();
        let checkout_url = purchase
            .get("checkout_url")
            .and_then(Value::as_str)
            .ok_or(BillingError::InvalidPaymentResponse)?
            .to_string();

        Ok((transaction_id, checkout_url, purchase))
    }
}

/// Gateway purchase request: one line item at the order's snapshotted amount,
/// buyer contact, and the four URLs back into this system keyed by the
/// order's external reference.
pub fn build_purchase_payload(
    app_base_url: &str,
    brand_id: &str,
    order: &Order,
    package: &Package,
    user: &UserContact,
    now: DateTime<Utc>,
) -> Result<Value, BillingError> {
    let base = app_base_url.trim_end_matches('/');
    let price = minor_units(order.total_amount).ok_or(BillingError::InvalidAmount)?;

    Ok(json!({
        "success_callback": format!("{base}/api/v1/payment/callback"),
        "success_redirect": format!("{base}/api/v1/payment/return?id={}", order.reference_id),
        "failure_redirect": format!(
            "{base}/api/v1/payment/return?id={}&status=failed",
            order.reference_id
        ),
        "cancel_redirect": format!(
            "{base}/api/v1/payment/return?id={}&status=cancelled",
            order.reference_id
        ),
        "platform": "web",
        "send_receipt": true,
        "purchase": {
            "currency": PURCHASE_CURRENCY,
            "due": (now + Duration::days(1)).timestamp(),
            "products": [
                {
                    "name": package.name,
                    "price": price,
                    "quantity": 1,
                }
            ],
        },
        "client": {
            "email": user.email,
            "phone": user.phone,
            "full_name": user.name,
        },
        "brand_id": brand_id,
    }))
}

/// Ringgit to sen. Truncates like the original integer cast; amounts are
/// two-decimal NUMERIC so nothing is lost.
fn minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).trunc().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(units: i64, scale: u32) -> Decimal {
        Decimal::new(units, scale)
    }

    fn order() -> Order {
        Order {
            id: 7,
            user_id: 1,
            package_id: 2,
            reference_id: "ORD-ab12CD34ef".to_string(),
            name: Some("Aina".to_string()),
            email: Some("aina@example.com".to_string()),
            phone: Some("+60123456789".to_string()),
            total_amount: dec(2999, 2),
            status: "pending".to_string(),
            created_at: Utc::now(),
        }
    }

    fn package() -> Package {
        Package {
            id: 2,
            name: "Basic Package".to_string(),
            price: dec(2999, 2),
            duration: 30,
            description: None,
            features: serde_json::json!([]),
            created_at: Utc::now(),
        }
    }

    fn user() -> UserContact {
        UserContact {
            id: 1,
            name: "Aina".to_string(),
            email: "aina@example.com".to_string(),
            phone: Some("+60123456789".to_string()),
        }
    }

    #[test]
    fn minor_units_truncates_to_sen() {
        assert_eq!(minor_units(dec(2999, 2)), Some(2999));
        assert_eq!(minor_units(dec(0, 2)), Some(0));
        assert_eq!(minor_units(dec(100, 0)), Some(10000));
    }

    #[test]
    fn payload_carries_reference_keyed_urls_and_line_item() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let payload = build_purchase_payload(
            "https://setem.example.com/",
            "brand-1",
            &order(),
            &package(),
            &user(),
            now,
        )
        .unwrap();

        assert_eq!(
            payload["success_redirect"],
            "https://setem.example.com/api/v1/payment/return?id=ORD-ab12CD34ef"
        );
        assert_eq!(
            payload["cancel_redirect"],
            "https://setem.example.com/api/v1/payment/return?id=ORD-ab12CD34ef&status=cancelled"
        );
        assert_eq!(
            payload["success_callback"],
            "https://setem.example.com/api/v1/payment/callback"
        );
        assert_eq!(payload["purchase"]["currency"], "MYR");
        assert_eq!(
            payload["purchase"]["due"],
            (now + Duration::days(1)).timestamp()
        );
        assert_eq!(payload["purchase"]["products"][0]["name"], "Basic Package");
        assert_eq!(payload["purchase"]["products"][0]["price"], 2999);
        assert_eq!(payload["purchase"]["products"][0]["quantity"], 1);
        assert_eq!(payload["client"]["email"], "aina@example.com");
        assert_eq!(payload["brand_id"], "brand-1");
    }

    #[test]
    fn unsupported_provider_is_rejected_by_whitelist() {
        assert!(!SUPPORTED_PROVIDERS.contains(&"securepay"));
        assert!(SUPPORTED_PROVIDERS.contains(&"chip"));
    }
}
