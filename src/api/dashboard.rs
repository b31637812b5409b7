use axum::{extract::State, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

use super::models::ApiError;
use crate::domains::loyalty::models::LoyaltyError;
use crate::middleware::auth::CurrentUser;
use crate::models::loyalty::CustomerCard;
use crate::models::Tenant;
use crate::state::AppState;

#[derive(Debug, Serialize, Default)]
pub struct DashboardOverview {
    pub total_cards: i64,
    pub total_customers: i64,
    pub total_templates: i64,
    pub active_cards: i64,
    pub expired_cards: i64,
    pub completed_cards: i64,
    pub recent_cards: i64,
    pub expiring_soon: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MonthlyIssuance {
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopTemplate {
    pub name: String,
    pub total_stamps: i32,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct RecentCard {
    pub id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub template_name: String,
    pub current_stamps: i32,
    pub total_stamps: i32,
    pub created_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub stats: DashboardOverview,
    pub monthly_stats: Vec<MonthlyIssuance>,
    pub top_templates: Vec<TopTemplate>,
    pub recent_activity: Vec<RecentCard>,
}

/// GET /api/v1/dashboard — tenant-scoped aggregates for the landing view.
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let tenant = Tenant::of(&current_user);
    let db = &state.db_pool;

    let stats = get_overview(db, tenant).await?;
    let monthly_stats = get_monthly_issuance(db, tenant).await?;
    let top_templates = get_top_templates(db, tenant).await?;
    let recent_activity = get_recent_activity(db, tenant).await?;

    Ok(Json(DashboardResponse {
        success: true,
        stats,
        monthly_stats,
        top_templates,
        recent_activity,
    }))
}

async fn get_overview(db: &PgPool, tenant: Tenant) -> Result<DashboardOverview, LoyaltyError> {
    #[derive(sqlx::FromRow)]
    struct OverviewRow {
        total_cards: i64,
        active_cards: i64,
        expired_cards: i64,
        completed_cards: i64,
        recent_cards: i64,
        expiring_soon: i64,
    }

    let cards = sqlx::query_as::<_, OverviewRow>(
        r#"
        SELECT
            COUNT(*) AS total_cards,
            COUNT(*) FILTER (WHERE cc.expiry_date IS NULL OR cc.expiry_date >= CURRENT_DATE)
                AS active_cards,
            COUNT(*) FILTER (WHERE cc.expiry_date < CURRENT_DATE) AS expired_cards,
            COUNT(*) FILTER (WHERE cc.current_stamps >= ct.total_stamps) AS completed_cards,
            COUNT(*) FILTER (WHERE cc.created_at >= NOW() - INTERVAL '7 days') AS recent_cards,
            COUNT(*) FILTER (
                WHERE cc.expiry_date BETWEEN CURRENT_DATE AND CURRENT_DATE + INTERVAL '7 days'
            ) AS expiring_soon
        FROM customer_cards cc
        INNER JOIN card_templates ct ON ct.id = cc.card_template_id
        WHERE cc.user_id = $1
        "#,
    )
    .bind(tenant.user_id())
    .fetch_one(db)
    .await?;

    let (total_customers,): (i64,) =
        sqlx::query_as(r#"SELECT COUNT(*) FROM customers WHERE user_id = $1"#)
            .bind(tenant.user_id())
            .fetch_one(db)
            .await?;

    let (total_templates,): (i64,) =
        sqlx::query_as(r#"SELECT COUNT(*) FROM card_templates WHERE user_id = $1"#)
            .bind(tenant.user_id())
            .fetch_one(db)
            .await?;

    Ok(DashboardOverview {
        total_cards: cards.total_cards,
        total_customers,
        total_templates,
        active_cards: cards.active_cards,
        expired_cards: cards.expired_cards,
        completed_cards: cards.completed_cards,
        recent_cards: cards.recent_cards,
        expiring_soon: cards.expiring_soon,
    })
}

async fn get_monthly_issuance(
    db: &PgPool,
    tenant: Tenant,
) -> Result<Vec<MonthlyIssuance>, LoyaltyError> {
    let rows = sqlx::query_as::<_, MonthlyIssuance>(
        r#"
        SELECT to_char(date_trunc('month', created_at), 'Mon YYYY') AS month,
               COUNT(*) AS count
        FROM customer_cards
        WHERE user_id = $1
          AND created_at >= NOW() - INTERVAL '6 months'
        GROUP BY date_trunc('month', created_at)
        ORDER BY date_trunc('month', created_at) ASC
        "#,
    )
    .bind(tenant.user_id())
    .fetch_all(db)
    .await?;
    Ok(rows)
}

async fn get_top_templates(db: &PgPool, tenant: Tenant) -> Result<Vec<TopTemplate>, LoyaltyError> {
    let rows = sqlx::query_as::<_, TopTemplate>(
        r#"
        SELECT ct.name, ct.total_stamps, COUNT(cc.id) AS count
        FROM card_templates ct
        LEFT JOIN customer_cards cc ON cc.card_template_id = ct.id
        WHERE ct.user_id = $1
        GROUP BY ct.id, ct.name, ct.total_stamps
        ORDER BY count DESC
        LIMIT 5
        "#,
    )
    .bind(tenant.user_id())
    .fetch_all(db)
    .await?;
    Ok(rows)
}

async fn get_recent_activity(db: &PgPool, tenant: Tenant) -> Result<Vec<RecentCard>, LoyaltyError> {
    #[derive(sqlx::FromRow)]
    struct RecentRow {
        id: i64,
        customer_id: i64,
        card_template_id: i64,
        current_stamps: i32,
        completed: bool,
        start_date: Option<NaiveDate>,
        expiry_date: Option<NaiveDate>,
        user_id: i64,
        created_at: DateTime<Utc>,
        customer_name: String,
        customer_phone: String,
        template_name: String,
        total_stamps: i32,
    }

    let rows = sqlx::query_as::<_, RecentRow>(
        r#"
        SELECT
            cc.id, cc.customer_id, cc.card_template_id, cc.current_stamps,
            cc.completed, cc.start_date, cc.expiry_date, cc.user_id, cc.created_at,
            c.name AS customer_name,
            c.phone AS customer_phone,
            ct.name AS template_name,
            ct.total_stamps
        FROM customer_cards cc
        INNER JOIN customers c ON c.id = cc.customer_id
        INNER JOIN card_templates ct ON ct.id = cc.card_template_id
        WHERE cc.user_id = $1
        ORDER BY cc.created_at DESC
        LIMIT 10
        "#,
    )
    .bind(tenant.user_id())
    .fetch_all(db)
    .await?;

    let today = Utc::now().date_naive();
    let activity = rows
        .into_iter()
        .map(|row| {
            let card = CustomerCard {
                id: row.id,
                customer_id: row.customer_id,
                card_template_id: row.card_template_id,
                current_stamps: row.current_stamps,
                completed: row.completed,
                start_date: row.start_date,
                expiry_date: row.expiry_date,
                user_id: row.user_id,
                created_at: row.created_at,
            };
            let status = card.status(row.total_stamps, today);
            RecentCard {
                id: card.id,
                customer_name: row.customer_name,
                customer_phone: row.customer_phone,
                template_name: row.template_name,
                current_stamps: card.current_stamps,
                total_stamps: row.total_stamps,
                created_at: card.created_at,
                status: status.as_str().to_string(),
            }
        })
        .collect();

    Ok(activity)
}
