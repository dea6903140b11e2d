//! Campaign repository

use crate::db::DatabasePool;
use crate::models::{Campaign, CreateCampaign, StatCounter};
use async_trait::async_trait;
use smsrust_common::types::{CampaignId, CampaignStatus, PauseReason};
use smsrust_common::{Error, Result};
use uuid::Uuid;

/// Campaign repository trait
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Create a new campaign in `scheduled` status
    async fn create(&self, input: CreateCampaign) -> Result<Campaign>;

    /// Get a campaign by ID
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>>;

    /// Set the lifecycle status and pause reason.
    ///
    /// Entering `active` stamps `started_at` on first transition; entering
    /// `completed` stamps `completed_at`.
    async fn set_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        pause_reason: Option<PauseReason>,
    ) -> Result<Option<Campaign>>;

    /// Increment one lifecycle counter. `Sent` also bumps `sent_today`.
    async fn increment_counter(&self, id: CampaignId, counter: StatCounter) -> Result<()>;

    /// Campaigns with a configured sending window, in `active` or `paused`
    async fn list_with_send_window(&self) -> Result<Vec<Campaign>>;

    /// Campaigns currently paused with the given reason
    async fn list_paused_with_reason(&self, reason: PauseReason) -> Result<Vec<Campaign>>;

    /// Zero `sent_today` on every campaign; returns the number touched
    async fn reset_daily_counters(&self) -> Result<u64>;
}

/// Database campaign repository
#[derive(Clone)]
pub struct DbCampaignRepository {
    pool: DatabasePool,
}

impl DbCampaignRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for DbCampaignRepository {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let id = Uuid::new_v4();
        let variant_pool =
            serde_json::to_value(input.variant_pool.unwrap_or_default()).unwrap_or_default();
        let send_window = input
            .send_window
            .map(|w| serde_json::to_value(w).unwrap_or_default())
            .unwrap_or(serde_json::Value::Null);

        sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                id, owner_id, name, description, message, variant_pool, ai_enabled,
                ai_tone, contact_list_id, device_id, interval_min_secs,
                interval_max_secs, daily_message_limit, send_window, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 'scheduled')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.owner_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.message)
        .bind(&variant_pool)
        .bind(input.ai_enabled.unwrap_or(false))
        .bind(&input.ai_tone)
        .bind(input.contact_list_id)
        .bind(input.device_id)
        .bind(input.interval_min_secs.unwrap_or(30))
        .bind(input.interval_max_secs.unwrap_or(90))
        .bind(input.daily_message_limit.unwrap_or(300))
        .bind(&send_window)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn set_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        pause_reason: Option<PauseReason>,
    ) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns
            SET status = $2,
                pause_reason = $3,
                started_at = CASE WHEN $2 = 'active' THEN COALESCE(started_at, NOW()) ELSE started_at END,
                completed_at = CASE WHEN $2 = 'completed' THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(pause_reason.map(|r| r.to_string()))
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn increment_counter(&self, id: CampaignId, counter: StatCounter) -> Result<()> {
        let sql = match counter {
            StatCounter::Sent => {
                "UPDATE campaigns SET sent_count = sent_count + 1, sent_today = sent_today + 1, updated_at = NOW() WHERE id = $1"
            }
            StatCounter::Delivered => {
                "UPDATE campaigns SET delivered_count = delivered_count + 1, updated_at = NOW() WHERE id = $1"
            }
            StatCounter::Failed => {
                "UPDATE campaigns SET failed_count = failed_count + 1, updated_at = NOW() WHERE id = $1"
            }
            // Read/undelivered corrections only move daily stats rows
            StatCounter::Read | StatCounter::Undelivered => return Ok(()),
        };

        sqlx::query(sql)
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_with_send_window(&self) -> Result<Vec<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            r#"
            SELECT * FROM campaigns
            WHERE send_window IS NOT NULL
              AND send_window != 'null'::jsonb
              AND status IN ('active', 'paused')
            "#,
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_paused_with_reason(&self, reason: PauseReason) -> Result<Vec<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE status = 'paused' AND pause_reason = $1",
        )
        .bind(reason.to_string())
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn reset_daily_counters(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE campaigns SET sent_today = 0, updated_at = NOW() WHERE sent_today > 0",
        )
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
