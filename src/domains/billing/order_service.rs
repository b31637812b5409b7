use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::PgPool;
use tracing::info;

use super::models::{BillingError, CreatePackageRequest};
use crate::models::billing::{Order, Package, UserContact, ORDER_STATUS_PENDING};
use crate::models::Tenant;

pub(crate) const ORDER_COLUMNS: &str =
    "id, user_id, package_id, reference_id, name, email, phone, total_amount, status, created_at";

const PACKAGE_COLUMNS: &str = "id, name, price, duration, description, features, created_at";

/// Package catalog and order creation. Orders snapshot the package price and
/// the buyer's contact details at creation time.
pub struct OrderService {
    db: PgPool,
}

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Packages (global catalog, not tenant-scoped)
    // ------------------------------------------------------------------

    pub async fn list_packages(&self) -> Result<Vec<Package>, BillingError> {
        let packages = sqlx::query_as::<_, Package>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages ORDER BY price ASC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(packages)
    }

    pub async fn get_package(&self, id: i64) -> Result<Package, BillingError> {
        let package = sqlx::query_as::<_, Package>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(BillingError::PackageNotFound)?;
        Ok(package)
    }

    pub async fn create_package(
        &self,
        request: CreatePackageRequest,
    ) -> Result<Package, BillingError> {
        let features = serde_json::to_value(&request.features)
            .map_err(|e| BillingError::Database(e.to_string()))?;

        let package = sqlx::query_as::<_, Package>(&format!(
            r#"
            INSERT INTO packages (name, price, duration, description, features, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING {PACKAGE_COLUMNS}
            "#
        ))
        .bind(&request.name)
        .bind(request.price)
        .bind(request.duration)
        .bind(&request.description)
        .bind(features)
        .fetch_one(&self.db)
        .await?;

        Ok(package)
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Create a pending order for a package. Many historical orders per
    /// (user, package) are allowed; only subscriptions deduplicate.
    pub async fn create_order(
        &self,
        tenant: Tenant,
        package_id: i64,
    ) -> Result<(Order, Package), BillingError> {
        let package = self.get_package(package_id).await?;
        let user = self.user_contact(tenant).await?;
        let reference_id = generate_reference_id();

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders
                (user_id, package_id, reference_id, name, email, phone, total_amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(tenant.user_id())
        .bind(package.id)
        .bind(&reference_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(package.price)
        .bind(ORDER_STATUS_PENDING)
        .fetch_one(&self.db)
        .await?;

        info!(
            reference_id = %order.reference_id,
            package_id = package.id,
            "order created"
        );

        Ok((order, package))
    }

    pub async fn find_by_reference(
        &self,
        tenant: Tenant,
        reference_id: &str,
    ) -> Result<Order, BillingError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE reference_id = $1 AND user_id = $2"
        ))
        .bind(reference_id)
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?
        .ok_or(BillingError::OrderNotFound)?;
        Ok(order)
    }

    pub(crate) async fn user_contact(&self, tenant: Tenant) -> Result<UserContact, BillingError> {
        let user = sqlx::query_as::<_, UserContact>(
            r#"SELECT id, name, email, phone FROM users WHERE id = $1"#,
        )
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| BillingError::Database("user row missing for tenant".to_string()))?;
        Ok(user)
    }
}

/// External-facing order key: `ORD-` plus a 10-character random token.
pub fn generate_reference_id() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("ORD-{}", token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_id_shape() {
        let id = generate_reference_id();
        assert!(id.starts_with("ORD-"));
        assert_eq!(id.len(), 14);
        assert!(id[4..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn reference_ids_are_unique_enough() {
        let a = generate_reference_id();
        let b = generate_reference_id();
        assert_ne!(a, b);
    }
}
