//! Campaign daily statistics repository

use crate::db::DatabasePool;
use crate::models::{CampaignStats, StatCounter};
use async_trait::async_trait;
use chrono::NaiveDate;
use smsrust_common::types::CampaignId;
use smsrust_common::{Error, Result};

/// Campaign daily statistics repository trait
#[async_trait]
pub trait CampaignStatsRepository: Send + Sync {
    /// Additively bump one counter in the campaign's day bucket.
    ///
    /// The row is created lazily on the first event of the day; rows for
    /// past days are never touched again.
    async fn increment(
        &self,
        campaign_id: CampaignId,
        day: NaiveDate,
        counter: StatCounter,
    ) -> Result<()>;

    /// Get the bucket for one day
    async fn get(&self, campaign_id: CampaignId, day: NaiveDate) -> Result<Option<CampaignStats>>;

    /// All day buckets for a campaign, oldest first
    async fn list_for_campaign(&self, campaign_id: CampaignId) -> Result<Vec<CampaignStats>>;
}

/// Database campaign statistics repository
#[derive(Clone)]
pub struct DbCampaignStatsRepository {
    pool: DatabasePool,
}

impl DbCampaignStatsRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn counter_column(counter: StatCounter) -> &'static str {
    match counter {
        StatCounter::Sent => "sent",
        StatCounter::Delivered => "delivered",
        StatCounter::Failed => "failed",
        StatCounter::Read => "read_count",
        StatCounter::Undelivered => "undelivered",
    }
}

#[async_trait]
impl CampaignStatsRepository for DbCampaignStatsRepository {
    async fn increment(
        &self,
        campaign_id: CampaignId,
        day: NaiveDate,
        counter: StatCounter,
    ) -> Result<()> {
        let column = counter_column(counter);
        let sql = format!(
            r#"
            INSERT INTO campaign_stats (id, campaign_id, day, {column})
            VALUES (gen_random_uuid(), $1, $2, 1)
            ON CONFLICT (campaign_id, day)
            DO UPDATE SET {column} = campaign_stats.{column} + 1, updated_at = NOW()
            "#,
        );

        sqlx::query(&sql)
            .bind(campaign_id)
            .bind(day)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, campaign_id: CampaignId, day: NaiveDate) -> Result<Option<CampaignStats>> {
        sqlx::query_as::<_, CampaignStats>(
            "SELECT * FROM campaign_stats WHERE campaign_id = $1 AND day = $2",
        )
        .bind(campaign_id)
        .bind(day)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_for_campaign(&self, campaign_id: CampaignId) -> Result<Vec<CampaignStats>> {
        sqlx::query_as::<_, CampaignStats>(
            "SELECT * FROM campaign_stats WHERE campaign_id = $1 ORDER BY day ASC",
        )
        .bind(campaign_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}
