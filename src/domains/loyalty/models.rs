//! Requests, responses and errors for the stamp-card domain.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::loyalty::{CardReward, CardTemplate, CustomerCard};

// ======================================================================
// TEMPLATES
// ======================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RewardInput {
    #[validate(range(min = 1, max = 15))]
    pub stamp_number: i32,
    pub description: String,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 1, max = 15))]
    pub total_stamps: i32,
    #[serde(default)]
    pub has_expiration: bool,
    #[validate(range(min = 1))]
    pub validity_days: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub rewards: Vec<RewardInput>,
}

#[derive(Debug, Serialize)]
pub struct TemplateWithRewards {
    #[serde(flatten)]
    pub template: CardTemplate,
    pub rewards: Vec<CardReward>,
}

// ======================================================================
// CARDS
// ======================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct IssueCardRequest {
    #[validate(length(min = 1, max = 32))]
    pub phone: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub template_id: i64,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_existing_customer: bool,
}

/// Result of one stamp. `unlocked_reward` is disclosure only — the mutation
/// path itself grants nothing.
#[derive(Debug, Serialize)]
pub struct StampResult {
    pub card: CustomerCard,
    pub total_stamps: i32,
    pub completed: bool,
    pub unlocked_reward: Option<CardReward>,
}

/// Card list row with the joined names the index page shows.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CardListItem {
    pub id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub template_name: String,
    pub total_stamps: i32,
    pub current_stamps: i32,
    pub completed: bool,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

// ======================================================================
// CUSTOMERS
// ======================================================================

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CustomerListItem {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub cards_count: i64,
    pub active_cards: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RewardView {
    pub stamp_number: i32,
    pub description: String,
    pub is_final_reward: bool,
}

#[derive(Debug, Serialize)]
pub struct CustomerCardView {
    pub id: i64,
    pub template_name: String,
    pub total_stamps: i32,
    pub current_stamps: i32,
    pub completed: bool,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub rewards: Vec<RewardView>,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub cards: Vec<CustomerCardView>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PhoneSearchRequest {
    #[validate(length(min = 1, max = 32))]
    pub phone: String,
}

// ======================================================================
// PUBLIC LOOKUP
// ======================================================================

/// One customer record per shop holding cards for the looked-up phone.
#[derive(Debug, Serialize)]
pub struct PublicCardMatch {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub shop_name: String,
    pub customer_cards: Vec<CustomerCardView>,
}

// ======================================================================
// ERRORS
// ======================================================================

#[derive(Debug, thiserror::Error)]
pub enum LoyaltyError {
    #[error("Card template not found")]
    TemplateNotFound,

    #[error("Customer card not found")]
    CardNotFound,

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("A template with this name already exists")]
    DuplicateTemplateName,

    #[error("Reward stamp number {stamp_number} is outside 1..={total_stamps}")]
    RewardOutOfRange { stamp_number: i32, total_stamps: i32 },

    #[error("Templates with expiration require validity_days")]
    MissingValidityDays,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for LoyaltyError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
