use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use super::models::{CardListItem, IssueCardRequest, LoyaltyError, StampResult};
use crate::models::loyalty::{CardReward, CardTemplate, Customer, CustomerCard, StampHistory};
use crate::models::Tenant;
use crate::observability::metrics::{record_card_issued, record_stamp_added};

const CARD_COLUMNS: &str =
    "id, customer_id, card_template_id, current_stamps, completed, start_date, expiry_date, user_id, created_at";

/// Card issuance and the stamping flow.
pub struct CardService {
    db: PgPool,
}

impl CardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        tenant: Tenant,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CardListItem>, LoyaltyError> {
        let items = sqlx::query_as::<_, CardListItem>(
            r#"
            SELECT
                cc.id,
                c.name AS customer_name,
                c.phone AS customer_phone,
                ct.name AS template_name,
                ct.total_stamps,
                cc.current_stamps,
                cc.completed,
                cc.expiry_date,
                cc.created_at
            FROM customer_cards cc
            INNER JOIN customers c ON c.id = cc.customer_id
            INNER JOIN card_templates ct ON ct.id = cc.card_template_id
            WHERE cc.user_id = $1
            ORDER BY cc.created_at DESC
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

    pub async fn get(&self, tenant: Tenant, card_id: i64) -> Result<CustomerCard, LoyaltyError> {
        let card = sqlx::query_as::<_, CustomerCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM customer_cards WHERE id = $1 AND user_id = $2"
        ))
        .bind(card_id)
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?
        .ok_or(LoyaltyError::CardNotFound)?;

        Ok(card)
    }

    /// The card's append-only stamp ledger, newest first.
    pub async fn history(
        &self,
        tenant: Tenant,
        card_id: i64,
    ) -> Result<Vec<StampHistory>, LoyaltyError> {
        let entries = sqlx::query_as::<_, StampHistory>(
            r#"
            SELECT id, customer_card_id, stamps_added, notes, user_id, created_at
            FROM stamp_histories
            WHERE customer_card_id = $1 AND user_id = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(card_id)
        .bind(tenant.user_id())
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    /// Issue a card: find-or-create the customer by (phone, tenant), create
    /// the card with the issuing visit as its first stamp, and open the
    /// audit ledger.
    pub async fn issue(
        &self,
        tenant: Tenant,
        request: IssueCardRequest,
    ) -> Result<CustomerCard, LoyaltyError> {
        let template = sqlx::query_as::<_, CardTemplate>(
            r#"
            SELECT id, name, total_stamps, has_expiration, validity_days, user_id, created_at
            FROM card_templates
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(request.template_id)
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?
        .ok_or(LoyaltyError::TemplateNotFound)?;

        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (name, phone, user_id, is_existing_customer, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (phone, user_id) DO NOTHING
            RETURNING id, name, phone, email, user_id, is_existing_customer, created_at
            "#,
        )
        .bind(&request.name)
        .bind(&request.phone)
        .bind(tenant.user_id())
        .bind(request.is_existing_customer)
        .fetch_optional(&mut *tx)
        .await?;

        let is_new_customer = inserted.is_some();
        let customer = match inserted {
            Some(c) => c,
            None => sqlx::query_as::<_, Customer>(
                r#"
                SELECT id, name, phone, email, user_id, is_existing_customer, created_at
                FROM customers
                WHERE phone = $1 AND user_id = $2
                "#,
            )
            .bind(&request.phone)
            .bind(tenant.user_id())
            .fetch_one(&mut *tx)
            .await?,
        };

        let start_date = request.start_date.unwrap_or_else(|| Utc::now().date_naive());
        let expiry_date = template.expiry_for(start_date);
        // The issuing visit counts as the first stamp; a one-stamp template
        // completes immediately.
        let completed = template.total_stamps <= 1;

        let card = sqlx::query_as::<_, CustomerCard>(&format!(
            r#"
            INSERT INTO customer_cards
                (customer_id, card_template_id, current_stamps, completed, start_date, expiry_date, user_id, created_at)
            VALUES ($1, $2, 1, $3, $4, $5, $6, NOW())
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(customer.id)
        .bind(template.id)
        .bind(completed)
        .bind(start_date)
        .bind(expiry_date)
        .bind(tenant.user_id())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO stamp_histories (customer_card_id, stamps_added, user_id, created_at)
            VALUES ($1, 1, $2, NOW())
            "#,
        )
        .bind(card.id)
        .bind(tenant.user_id())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        record_card_issued(is_new_customer);
        info!(
            card_id = card.id,
            customer_id = customer.id,
            template_id = template.id,
            "card issued"
        );

        Ok(card)
    }

    /// Add one stamp. The increment happens at the storage layer so two
    /// concurrent stamps never lose an update; the completion check reads the
    /// post-increment value inside the same transaction.
    ///
    /// Over-stamping a completed card is permitted: the counter keeps rising
    /// and `completed` stays true.
    pub async fn add_stamp(
        &self,
        tenant: Tenant,
        card_id: i64,
        notes: Option<String>,
    ) -> Result<StampResult, LoyaltyError> {
        let mut tx = self.db.begin().await?;

        let mut card = sqlx::query_as::<_, CustomerCard>(&format!(
            r#"
            UPDATE customer_cards
            SET current_stamps = current_stamps + 1
            WHERE id = $1 AND user_id = $2
            RETURNING {CARD_COLUMNS}
            "#
        ))
        .bind(card_id)
        .bind(tenant.user_id())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LoyaltyError::CardNotFound)?;

        sqlx::query(
            r#"
            INSERT INTO stamp_histories (customer_card_id, stamps_added, notes, user_id, created_at)
            VALUES ($1, 1, $2, $3, NOW())
            "#,
        )
        .bind(card.id)
        .bind(&notes)
        .bind(tenant.user_id())
        .execute(&mut *tx)
        .await?;

        let (total_stamps,): (i32,) = sqlx::query_as(
            r#"SELECT total_stamps FROM card_templates WHERE id = $1"#,
        )
        .bind(card.card_template_id)
        .fetch_one(&mut *tx)
        .await?;

        if card.current_stamps >= total_stamps && !card.completed {
            sqlx::query(r#"UPDATE customer_cards SET completed = TRUE WHERE id = $1"#)
                .bind(card.id)
                .execute(&mut *tx)
                .await?;
            card.completed = true;
        }

        tx.commit().await?;

        // Reward disclosure only: does the new count land on a reward tier?
        let unlocked_reward = sqlx::query_as::<_, CardReward>(
            r#"
            SELECT id, card_template_id, stamp_number, reward_description, is_final_reward
            FROM card_rewards
            WHERE card_template_id = $1 AND stamp_number = $2
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(card.card_template_id)
        .bind(card.current_stamps)
        .fetch_optional(&self.db)
        .await?;

        record_stamp_added(card.completed);
        info!(
            card_id = card.id,
            current_stamps = card.current_stamps,
            completed = card.completed,
            "stamp added"
        );

        Ok(StampResult {
            completed: card.completed,
            total_stamps,
            unlocked_reward,
            card,
        })
    }
}
