//! Message sent detail repository

use crate::db::DatabasePool;
use crate::models::{CreateMessageDetail, MessageSentDetail};
use async_trait::async_trait;
use chrono::Utc;
use smsrust_common::types::{CampaignId, MessageDetailId};
use smsrust_common::{Error, Result};

/// Message detail repository trait
#[async_trait]
pub trait MessageDetailRepository: Send + Sync {
    /// Create the initial `pending` record for a dispatch attempt
    async fn create(&self, input: CreateMessageDetail) -> Result<MessageSentDetail>;

    /// Get a record by ID
    async fn get(&self, id: MessageDetailId) -> Result<Option<MessageSentDetail>>;

    /// Find the record correlated to a gateway task id
    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<MessageSentDetail>>;

    /// Persist the mutable status fields of a record
    async fn update(&self, detail: &MessageSentDetail) -> Result<()>;

    /// All records for a campaign, newest first
    async fn list_for_campaign(&self, campaign_id: CampaignId) -> Result<Vec<MessageSentDetail>>;
}

/// Database message detail repository
#[derive(Clone)]
pub struct DbMessageDetailRepository {
    pool: DatabasePool,
}

impl DbMessageDetailRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageDetailRepository for DbMessageDetailRepository {
    async fn create(&self, input: CreateMessageDetail) -> Result<MessageSentDetail> {
        let detail = input.into_detail(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO message_sent_details (
                id, campaign_id, contact_id, device_id, phone_number, content,
                content_hash, variant_id, tone, language, encoding, segments, cost,
                status, status_history, attempts, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(detail.id)
        .bind(detail.campaign_id)
        .bind(detail.contact_id)
        .bind(detail.device_id)
        .bind(&detail.phone_number)
        .bind(&detail.content)
        .bind(&detail.content_hash)
        .bind(&detail.variant_id)
        .bind(&detail.tone)
        .bind(&detail.language)
        .bind(&detail.encoding)
        .bind(detail.segments)
        .bind(detail.cost)
        .bind(&detail.status)
        .bind(&detail.status_history)
        .bind(detail.attempts)
        .bind(detail.created_at)
        .bind(detail.updated_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(detail)
    }

    async fn get(&self, id: MessageDetailId) -> Result<Option<MessageSentDetail>> {
        sqlx::query_as::<_, MessageSentDetail>(
            "SELECT * FROM message_sent_details WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<MessageSentDetail>> {
        sqlx::query_as::<_, MessageSentDetail>(
            "SELECT * FROM message_sent_details WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn update(&self, detail: &MessageSentDetail) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE message_sent_details
            SET status = $2,
                status_history = $3,
                task_id = $4,
                attempts = $5,
                sent_at = $6,
                delivered_at = $7,
                read_at = $8,
                failed_at = $9,
                delivery_latency_ms = $10,
                read_latency_ms = $11,
                last_error = $12,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(detail.id)
        .bind(&detail.status)
        .bind(&detail.status_history)
        .bind(&detail.task_id)
        .bind(detail.attempts)
        .bind(detail.sent_at)
        .bind(detail.delivered_at)
        .bind(detail.read_at)
        .bind(detail.failed_at)
        .bind(detail.delivery_latency_ms)
        .bind(detail.read_latency_ms)
        .bind(&detail.last_error)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_for_campaign(&self, campaign_id: CampaignId) -> Result<Vec<MessageSentDetail>> {
        sqlx::query_as::<_, MessageSentDetail>(
            r#"
            SELECT * FROM message_sent_details
            WHERE campaign_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}
