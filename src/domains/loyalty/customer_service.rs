use sqlx::PgPool;

use super::models::{
    CustomerCardView, CustomerDetail, CustomerListItem, LoyaltyError, PublicCardMatch, RewardView,
};
use crate::models::loyalty::{CardReward, Customer, CustomerCard};
use crate::models::Tenant;

#[derive(sqlx::FromRow)]
struct CardWithTemplateRow {
    id: i64,
    card_template_id: i64,
    current_stamps: i32,
    completed: bool,
    expiry_date: Option<chrono::NaiveDate>,
    created_at: chrono::DateTime<chrono::Utc>,
    template_name: String,
    total_stamps: i32,
}

/// Customer reads. All functions take a [`Tenant`] except the explicitly
/// named public lookup, which is the one sanctioned cross-tenant read path.
pub struct CustomerService {
    db: PgPool,
}

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        tenant: Tenant,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CustomerListItem>, LoyaltyError> {
        let items = sqlx::query_as::<_, CustomerListItem>(
            r#"
            SELECT
                c.id,
                c.name,
                c.phone,
                COUNT(cc.id) AS cards_count,
                COUNT(cc.id) FILTER (WHERE NOT cc.completed) AS active_cards,
                c.created_at
            FROM customers c
            LEFT JOIN customer_cards cc ON cc.customer_id = c.id
            WHERE c.user_id = $1
            GROUP BY c.id, c.name, c.phone, c.created_at
            ORDER BY c.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(tenant.user_id())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(items)
    }

    pub async fn detail(&self, tenant: Tenant, id: i64) -> Result<CustomerDetail, LoyaltyError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, email, user_id, is_existing_customer, created_at
            FROM customers
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?
        .ok_or(LoyaltyError::CustomerNotFound)?;

        let cards = self.card_views_for_customer(customer.id).await?;

        Ok(CustomerDetail {
            id: customer.id,
            name: customer.name,
            phone: customer.phone,
            cards,
        })
    }

    /// Tenant-scoped phone search used by the issuance form.
    pub async fn search_by_phone(
        &self,
        tenant: Tenant,
        phone: &str,
    ) -> Result<Option<(Customer, Vec<CustomerCard>)>, LoyaltyError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, email, user_id, is_existing_customer, created_at
            FROM customers
            WHERE phone = $1 AND user_id = $2
            "#,
        )
        .bind(phone)
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?;

        let Some(customer) = customer else {
            return Ok(None);
        };

        let cards = sqlx::query_as::<_, CustomerCard>(
            r#"
            SELECT id, customer_id, card_template_id, current_stamps, completed,
                   start_date, expiry_date, user_id, created_at
            FROM customer_cards
            WHERE customer_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer.id)
        .bind(tenant.user_id())
        .fetch_all(&self.db)
        .await?;

        Ok(Some((customer, cards)))
    }

    /// Cross-tenant lookup backing the public "find my card" page. This is
    /// the only read that deliberately spans tenants: a shopper's phone may
    /// hold cards at many shops, and the result groups them per shop.
    pub async fn public_card_lookup(
        &self,
        phone: &str,
    ) -> Result<Vec<PublicCardMatch>, LoyaltyError> {
        #[derive(sqlx::FromRow)]
        struct MatchRow {
            id: i64,
            name: String,
            phone: String,
            shop_name: String,
        }

        let matches = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT c.id, c.name, c.phone, COALESCE(u.name, 'Unknown Shop') AS shop_name
            FROM customers c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.phone = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(phone)
        .fetch_all(&self.db)
        .await?;

        let mut out = Vec::with_capacity(matches.len());
        for m in matches {
            let cards = self.card_views_for_customer(m.id).await?;
            out.push(PublicCardMatch {
                id: m.id,
                name: m.name,
                phone: m.phone,
                shop_name: m.shop_name,
                customer_cards: cards,
            });
        }

        Ok(out)
    }

    async fn card_views_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<CustomerCardView>, LoyaltyError> {
        let rows = sqlx::query_as::<_, CardWithTemplateRow>(
            r#"
            SELECT
                cc.id,
                cc.card_template_id,
                cc.current_stamps,
                cc.completed,
                cc.expiry_date,
                cc.created_at,
                ct.name AS template_name,
                ct.total_stamps
            FROM customer_cards cc
            INNER JOIN card_templates ct ON ct.id = cc.card_template_id
            WHERE cc.customer_id = $1
            ORDER BY cc.created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.db)
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let rewards = sqlx::query_as::<_, CardReward>(
                r#"
                SELECT id, card_template_id, stamp_number, reward_description, is_final_reward
                FROM card_rewards
                WHERE card_template_id = $1
                ORDER BY stamp_number ASC
                "#,
            )
            .bind(row.card_template_id)
            .fetch_all(&self.db)
            .await?;

            views.push(CustomerCardView {
                id: row.id,
                template_name: row.template_name,
                total_stamps: row.total_stamps,
                current_stamps: row.current_stamps,
                completed: row.completed,
                expiry_date: row.expiry_date,
                created_at: row.created_at,
                rewards: rewards
                    .into_iter()
                    .map(|r| RewardView {
                        stamp_number: r.stamp_number,
                        description: r.reward_description,
                        is_final_reward: r.is_final_reward,
                    })
                    .collect(),
            });
        }

        Ok(views)
    }
}
