use sqlx::PgPool;

use super::models::{CreateTemplateRequest, LoyaltyError, TemplateWithRewards};
use crate::models::loyalty::{CardReward, CardTemplate};
use crate::models::Tenant;

/// Card template CRUD. Every query is conjoined with the tenant's user id;
/// rewards live and die with their template.
pub struct TemplateService {
    db: PgPool,
}

impl TemplateService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, tenant: Tenant) -> Result<Vec<TemplateWithRewards>, LoyaltyError> {
        let templates = sqlx::query_as::<_, CardTemplate>(
            r#"
            SELECT id, name, total_stamps, has_expiration, validity_days, user_id, created_at
            FROM card_templates
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant.user_id())
        .fetch_all(&self.db)
        .await?;

        let mut out = Vec::with_capacity(templates.len());
        for template in templates {
            let rewards = self.rewards_for(template.id).await?;
            out.push(TemplateWithRewards { template, rewards });
        }

        Ok(out)
    }

    pub async fn get(&self, tenant: Tenant, id: i64) -> Result<TemplateWithRewards, LoyaltyError> {
        let template = sqlx::query_as::<_, CardTemplate>(
            r#"
            SELECT id, name, total_stamps, has_expiration, validity_days, user_id, created_at
            FROM card_templates
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant.user_id())
        .fetch_optional(&self.db)
        .await?
        .ok_or(LoyaltyError::TemplateNotFound)?;

        let rewards = self.rewards_for(template.id).await?;
        Ok(TemplateWithRewards { template, rewards })
    }

    pub async fn create(
        &self,
        tenant: Tenant,
        request: CreateTemplateRequest,
    ) -> Result<TemplateWithRewards, LoyaltyError> {
        validate_reward_schedule(&request)?;

        let mut tx = self.db.begin().await?;

        let name_taken: Option<(i64,)> = sqlx::query_as(
            r#"SELECT id FROM card_templates WHERE name = $1 AND user_id = $2"#,
        )
        .bind(&request.name)
        .bind(tenant.user_id())
        .fetch_optional(&mut *tx)
        .await?;

        if name_taken.is_some() {
            return Err(LoyaltyError::DuplicateTemplateName);
        }

        let validity_days = if request.has_expiration {
            request.validity_days
        } else {
            None
        };

        let template = sqlx::query_as::<_, CardTemplate>(
            r#"
            INSERT INTO card_templates (name, total_stamps, has_expiration, validity_days, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, name, total_stamps, has_expiration, validity_days, user_id, created_at
            "#,
        )
        .bind(&request.name)
        .bind(request.total_stamps)
        .bind(request.has_expiration)
        .bind(validity_days)
        .bind(tenant.user_id())
        .fetch_one(&mut *tx)
        .await?;

        let mut rewards = Vec::new();
        for input in &request.rewards {
            // Blank descriptions are dropped, matching the form behavior.
            if input.description.trim().is_empty() {
                continue;
            }
            let reward = sqlx::query_as::<_, CardReward>(
                r#"
                INSERT INTO card_rewards (card_template_id, stamp_number, reward_description, is_final_reward)
                VALUES ($1, $2, $3, $4)
                RETURNING id, card_template_id, stamp_number, reward_description, is_final_reward
                "#,
            )
            .bind(template.id)
            .bind(input.stamp_number)
            .bind(input.description.trim())
            .bind(input.is_final)
            .fetch_one(&mut *tx)
            .await?;
            rewards.push(reward);
        }

        tx.commit().await?;

        Ok(TemplateWithRewards { template, rewards })
    }

    /// Update replaces the reward schedule wholesale; the reward sitting at
    /// `total_stamps` becomes the final reward.
    pub async fn update(
        &self,
        tenant: Tenant,
        id: i64,
        request: CreateTemplateRequest,
    ) -> Result<TemplateWithRewards, LoyaltyError> {
        validate_reward_schedule(&request)?;

        let mut tx = self.db.begin().await?;

        let validity_days = if request.has_expiration {
            request.validity_days
        } else {
            None
        };

        let template = sqlx::query_as::<_, CardTemplate>(
            r#"
            UPDATE card_templates
            SET name = $1, total_stamps = $2, has_expiration = $3, validity_days = $4
            WHERE id = $5 AND user_id = $6
            RETURNING id, name, total_stamps, has_expiration, validity_days, user_id, created_at
            "#,
        )
        .bind(&request.name)
        .bind(request.total_stamps)
        .bind(request.has_expiration)
        .bind(validity_days)
        .bind(id)
        .bind(tenant.user_id())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LoyaltyError::TemplateNotFound)?;

        sqlx::query(r#"DELETE FROM card_rewards WHERE card_template_id = $1"#)
            .bind(template.id)
            .execute(&mut *tx)
            .await?;

        let mut rewards = Vec::new();
        for input in &request.rewards {
            if input.description.trim().is_empty() {
                continue;
            }
            let reward = sqlx::query_as::<_, CardReward>(
                r#"
                INSERT INTO card_rewards (card_template_id, stamp_number, reward_description, is_final_reward)
                VALUES ($1, $2, $3, $4)
                RETURNING id, card_template_id, stamp_number, reward_description, is_final_reward
                "#,
            )
            .bind(template.id)
            .bind(input.stamp_number)
            .bind(input.description.trim())
            .bind(input.stamp_number == request.total_stamps)
            .fetch_one(&mut *tx)
            .await?;
            rewards.push(reward);
        }

        tx.commit().await?;

        Ok(TemplateWithRewards { template, rewards })
    }

    pub async fn delete(&self, tenant: Tenant, id: i64) -> Result<(), LoyaltyError> {
        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query(
            r#"DELETE FROM card_templates WHERE id = $1 AND user_id = $2"#,
        )
        .bind(id)
        .bind(tenant.user_id())
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(LoyaltyError::TemplateNotFound);
        }

        // Rewards cascade at the schema level; the explicit delete keeps the
        // invariant even against a missing FK action.
        sqlx::query(r#"DELETE FROM card_rewards WHERE card_template_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn rewards_for(&self, template_id: i64) -> Result<Vec<CardReward>, LoyaltyError> {
        let rewards = sqlx::query_as::<_, CardReward>(
            r#"
            SELECT id, card_template_id, stamp_number, reward_description, is_final_reward
            FROM card_rewards
            WHERE card_template_id = $1
            ORDER BY stamp_number ASC
            "#,
        )
        .bind(template_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rewards)
    }
}

fn validate_reward_schedule(request: &CreateTemplateRequest) -> Result<(), LoyaltyError> {
    if request.has_expiration && request.validity_days.is_none() {
        return Err(LoyaltyError::MissingValidityDays);
    }
    for reward in &request.rewards {
        if reward.stamp_number < 1 || reward.stamp_number > request.total_stamps {
            return Err(LoyaltyError::RewardOutOfRange {
                stamp_number: reward.stamp_number,
                total_stamps: request.total_stamps,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::loyalty::models::RewardInput;

    fn request(total: i32, rewards: Vec<RewardInput>) -> CreateTemplateRequest {
        CreateTemplateRequest {
            name: "Breakfast Set".to_string(),
            total_stamps: total,
            has_expiration: false,
            validity_days: None,
            rewards,
        }
    }

    #[test]
    fn reward_outside_schedule_rejected() {
        let req = request(
            5,
            vec![RewardInput {
                stamp_number: 6,
                description: "Free drink".to_string(),
                is_final: false,
            }],
        );
        assert!(matches!(
            validate_reward_schedule(&req),
            Err(LoyaltyError::RewardOutOfRange { stamp_number: 6, total_stamps: 5 })
        ));
    }

    #[test]
    fn expiration_requires_validity_days() {
        let mut req = request(5, vec![]);
        req.has_expiration = true;
        assert!(matches!(
            validate_reward_schedule(&req),
            Err(LoyaltyError::MissingValidityDays)
        ));
    }

    #[test]
    fn valid_schedule_passes() {
        let req = request(
            5,
            vec![RewardInput {
                stamp_number: 5,
                description: "Free meal".to_string(),
                is_final: true,
            }],
        );
        assert!(validate_reward_schedule(&req).is_ok());
    }
}
