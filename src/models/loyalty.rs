//! Stamp-card domain entities: customers, templates, rewards, cards, history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub user_id: i64,
    pub is_existing_customer: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CardTemplate {
    pub id: i64,
    pub name: String,
    pub total_stamps: i32,
    pub has_expiration: bool,
    pub validity_days: Option<i32>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl CardTemplate {
    /// Expiry date for a card issued on `start`, or None for non-expiring
    /// templates.
    pub fn expiry_for(&self, start: NaiveDate) -> Option<NaiveDate> {
        if !self.has_expiration {
            return None;
        }
        self.validity_days
            .map(|days| start + chrono::Duration::days(days as i64))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CardReward {
    pub id: i64,
    pub card_template_id: i64,
    pub stamp_number: i32,
    pub reward_description: String,
    pub is_final_reward: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerCard {
    pub id: i64,
    pub customer_id: i64,
    pub card_template_id: i64,
    pub current_stamps: i32,
    pub completed: bool,
    pub start_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl CustomerCard {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.map_or(false, |d| d < today)
    }

    /// Derived display status. Expiry wins over completion; a card expiring
    /// within 7 days is flagged before it lapses.
    pub fn status(&self, total_stamps: i32, today: NaiveDate) -> CardStatus {
        if self.is_expired(today) {
            return CardStatus::Expired;
        }
        if self.current_stamps >= total_stamps {
            return CardStatus::Completed;
        }
        if let Some(expiry) = self.expiry_date {
            if (expiry - today).num_days() <= 7 {
                return CardStatus::ExpiringSoon;
            }
        }
        CardStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Active,
    Completed,
    Expired,
    ExpiringSoon,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::ExpiringSoon => "expiring_soon",
        }
    }
}

/// Append-only audit row. Never updated or deleted after insert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StampHistory {
    pub id: i64,
    pub customer_card_id: i64,
    pub stamps_added: i32,
    pub notes: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(total: i32, has_expiration: bool, validity_days: Option<i32>) -> CardTemplate {
        CardTemplate {
            id: 1,
            name: "Coffee Club".to_string(),
            total_stamps: total,
            has_expiration,
            validity_days,
            user_id: 1,
            created_at: Utc::now(),
        }
    }

    fn card(current: i32, expiry: Option<NaiveDate>) -> CustomerCard {
        CustomerCard {
            id: 1,
            customer_id: 1,
            card_template_id: 1,
            current_stamps: current,
            completed: false,
            start_date: None,
            expiry_date: expiry,
            user_id: 1,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn expiry_derived_from_validity_days() {
        let t = template(10, true, Some(30));
        assert_eq!(t.expiry_for(date(2025, 1, 1)), Some(date(2025, 1, 31)));
    }

    #[test]
    fn no_expiry_without_expiration_flag() {
        let t = template(10, false, Some(30));
        assert_eq!(t.expiry_for(date(2025, 1, 1)), None);
    }

    #[test]
    fn status_expired_wins_over_completed() {
        let c = card(10, Some(date(2025, 1, 1)));
        assert_eq!(c.status(10, date(2025, 2, 1)), CardStatus::Expired);
    }

    #[test]
    fn status_completed_at_threshold() {
        let c = card(10, None);
        assert_eq!(c.status(10, date(2025, 2, 1)), CardStatus::Completed);
    }

    #[test]
    fn status_stays_completed_past_threshold() {
        // Over-stamping keeps the counter rising; completion never unwinds.
        let c = card(11, None);
        assert_eq!(c.status(10, date(2025, 2, 1)), CardStatus::Completed);
    }

    #[test]
    fn status_expiring_soon_within_week() {
        let c = card(3, Some(date(2025, 2, 5)));
        assert_eq!(c.status(10, date(2025, 2, 1)), CardStatus::ExpiringSoon);
    }

    #[test]
    fn status_active_otherwise() {
        let c = card(3, Some(date(2025, 6, 1)));
        assert_eq!(c.status(10, date(2025, 2, 1)), CardStatus::Active);
    }
}
