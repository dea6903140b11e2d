//! Campaign lifecycle orchestration
//!
//! The orchestrator is the entry point for start/pause/resume/stop. It
//! validates the lifecycle transition against the stored status, drives the
//! dispatch registry and persists the new status. Workers and scheduled
//! tasks change statuses too (cap pauses, window pauses, completion); the
//! orchestrator only handles the externally requested transitions.

use crate::dispatch::{DispatchJob, DispatchRegistry, WorkerContext};
use crate::stores::Stores;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use serde::Serialize;
use smsrust_common::types::{CampaignId, CampaignStatus, PauseReason};
use smsrust_common::Error;
use smsrust_storage::{Campaign, CampaignStats, Contact};
use std::sync::Arc;
use tracing::{info, warn};

/// Errors from campaign lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Campaign not found")]
    NotFound,

    #[error("Campaign is not in scheduled status")]
    NotScheduled,

    #[error("Campaign is not active")]
    NotActive,

    #[error("Campaign cannot be stopped in its current status")]
    NotRunning,

    #[error("Campaign is not paused")]
    NotPaused,

    #[error("Campaign has no opted-in contacts")]
    EmptyAudience,

    #[error("Device not found or disabled")]
    DeviceUnavailable,

    #[error(transparent)]
    Storage(#[from] Error),
}

impl From<CampaignError> for Error {
    fn from(e: CampaignError) -> Self {
        match e {
            CampaignError::NotFound => Error::NotFound("Campaign not found".to_string()),
            CampaignError::EmptyAudience => {
                Error::EmptyAudience("Campaign has no opted-in contacts".to_string())
            }
            CampaignError::Storage(inner) => inner,
            other => Error::Validation(other.to_string()),
        }
    }
}

/// Aggregated view returned by the stats operation
#[derive(Debug, Clone, Serialize)]
pub struct CampaignStatsSummary {
    pub campaign_id: CampaignId,
    pub status: String,
    pub pause_reason: Option<String>,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub failed_count: i32,
    pub sent_today: i32,
    /// Jobs still queued, when a dispatcher is live
    pub queued_jobs: Option<usize>,
    /// Per-day counter buckets, oldest first
    pub days: Vec<CampaignStats>,
}

/// Drives campaign lifecycle transitions
pub struct CampaignOrchestrator {
    stores: Stores,
    registry: Arc<DispatchRegistry>,
    ctx: WorkerContext,
}

impl CampaignOrchestrator {
    pub fn new(stores: Stores, registry: Arc<DispatchRegistry>, ctx: WorkerContext) -> Self {
        Self {
            stores,
            registry,
            ctx,
        }
    }

    async fn load(&self, campaign_id: CampaignId) -> Result<Campaign, CampaignError> {
        self.stores
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or(CampaignError::NotFound)
    }

    fn status_of(campaign: &Campaign) -> Result<CampaignStatus, CampaignError> {
        campaign.status_enum().ok_or_else(|| {
            CampaignError::Storage(Error::Internal(format!(
                "Campaign {} has invalid status {}",
                campaign.id, campaign.status
            )))
        })
    }

    /// Start a scheduled campaign: seed one paced job per opted-in contact
    /// and spawn the dispatcher.
    pub async fn start(&self, campaign_id: CampaignId) -> Result<(), CampaignError> {
        let campaign = self.load(campaign_id).await?;
        if Self::status_of(&campaign)? != CampaignStatus::Scheduled {
            return Err(CampaignError::NotScheduled);
        }

        let contacts = self
            .stores
            .contacts
            .list_opted_in(campaign.contact_list_id)
            .await?;
        if contacts.is_empty() {
            return Err(CampaignError::EmptyAudience);
        }

        match self.stores.devices.get(campaign.device_id).await? {
            Some(device) if device.enabled => {}
            _ => return Err(CampaignError::DeviceUnavailable),
        }

        let jobs = seed_jobs(&campaign, &contacts, Utc::now());
        let seeded = jobs.len();
        self.registry
            .start_campaign(campaign_id, jobs, self.ctx.clone())
            .await?;

        self.stores
            .campaigns
            .set_status(campaign_id, CampaignStatus::Active, None)
            .await?;

        info!(campaign = %campaign_id, contacts = seeded, "Campaign started");
        Ok(())
    }

    /// Pause an active campaign
    pub async fn pause(
        &self,
        campaign_id: CampaignId,
        reason: PauseReason,
    ) -> Result<(), CampaignError> {
        let campaign = self.load(campaign_id).await?;
        if Self::status_of(&campaign)? != CampaignStatus::Active {
            return Err(CampaignError::NotActive);
        }

        if !self.registry.pause(campaign_id).await {
            warn!(campaign = %campaign_id, "Pause requested with no live dispatcher");
        }
        self.stores
            .campaigns
            .set_status(campaign_id, CampaignStatus::Paused, Some(reason))
            .await?;

        info!(campaign = %campaign_id, %reason, "Campaign paused");
        Ok(())
    }

    /// Resume a paused campaign
    pub async fn resume(&self, campaign_id: CampaignId) -> Result<(), CampaignError> {
        let campaign = self.load(campaign_id).await?;
        if Self::status_of(&campaign)? != CampaignStatus::Paused {
            return Err(CampaignError::NotPaused);
        }

        self.stores
            .campaigns
            .set_status(campaign_id, CampaignStatus::Active, None)
            .await?;
        if !self.registry.resume(campaign_id).await {
            warn!(campaign = %campaign_id, "Resume requested with no live dispatcher");
        }

        info!(campaign = %campaign_id, "Campaign resumed");
        Ok(())
    }

    /// Stop a campaign: discard queued jobs and mark it completed.
    ///
    /// Stopping is terminal. The in-flight job, if any, finishes; already
    /// sent messages keep receiving delivery reports.
    pub async fn stop(&self, campaign_id: CampaignId) -> Result<(), CampaignError> {
        let campaign = self.load(campaign_id).await?;
        match Self::status_of(&campaign)? {
            CampaignStatus::Active | CampaignStatus::Paused => {}
            _ => return Err(CampaignError::NotRunning),
        }

        let discarded = self.registry.stop(campaign_id).await.unwrap_or(0);
        self.stores
            .campaigns
            .set_status(campaign_id, CampaignStatus::Completed, None)
            .await?;

        info!(campaign = %campaign_id, discarded, "Campaign stopped");
        Ok(())
    }

    /// Aggregate lifecycle counters, queue depth and daily buckets
    pub async fn stats(
        &self,
        campaign_id: CampaignId,
    ) -> Result<CampaignStatsSummary, CampaignError> {
        let campaign = self.load(campaign_id).await?;
        let days = self.stores.stats.list_for_campaign(campaign_id).await?;
        let queued_jobs = self.registry.queued_jobs(campaign_id).await;

        Ok(CampaignStatsSummary {
            campaign_id,
            status: campaign.status,
            pause_reason: campaign.pause_reason,
            sent_count: campaign.sent_count,
            delivered_count: campaign.delivered_count,
            failed_count: campaign.failed_count,
            sent_today: campaign.sent_today,
            queued_jobs,
            days,
        })
    }
}

/// Build one job per contact with cumulative randomized pacing delays.
///
/// Each gap is drawn uniformly from the campaign's pacing interval, so the
/// k-th job is eligible after the sum of the first k gaps.
pub fn seed_jobs(campaign: &Campaign, contacts: &[Contact], now: DateTime<Utc>) -> Vec<DispatchJob> {
    let min = campaign.interval_min_secs.max(0) as i64;
    let max = campaign.interval_max_secs.max(campaign.interval_min_secs.max(0)) as i64;

    let mut rng = rand::thread_rng();
    let mut offset = 0i64;
    contacts
        .iter()
        .map(|contact| {
            offset += rng.gen_range(min..=max);
            DispatchJob::new(
                campaign.id,
                contact.id,
                contact.phone_number.clone(),
                campaign.device_id,
                now + ChronoDuration::seconds(offset),
                now,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn campaign(min: i32, max: i32) -> Campaign {
        Campaign {
            id: uuid::Uuid::new_v4(),
            owner_id: uuid::Uuid::new_v4(),
            name: "seeding".to_string(),
            description: None,
            message: "m".to_string(),
            variant_pool: serde_json::json!([]),
            ai_enabled: false,
            ai_tone: None,
            contact_list_id: uuid::Uuid::new_v4(),
            device_id: uuid::Uuid::new_v4(),
            interval_min_secs: min,
            interval_max_secs: max,
            daily_message_limit: 300,
            send_window: serde_json::Value::Null,
            status: "scheduled".to_string(),
            pause_reason: None,
            sent_count: 0,
            delivered_count: 0,
            failed_count: 0,
            sent_today: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    fn contacts(n: usize) -> Vec<Contact> {
        (0..n)
            .map(|i| Contact {
                id: uuid::Uuid::new_v4(),
                contact_list_id: uuid::Uuid::new_v4(),
                phone_number: format!("+1416555{:04}", i),
                name: None,
                opted_in: true,
                sim_device_id: None,
                sim_slot: None,
                attributes: serde_json::json!({}),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_seed_jobs_pacing_gaps_within_bounds() {
        let campaign = campaign(30, 90);
        let now = Utc::now();
        let jobs = seed_jobs(&campaign, &contacts(20), now);
        assert_eq!(jobs.len(), 20);

        let mut previous = now;
        for job in &jobs {
            let gap = (job.not_before - previous).num_seconds();
            assert!((30..=90).contains(&gap), "gap {} out of bounds", gap);
            previous = job.not_before;
        }
    }

    #[test]
    fn test_seed_jobs_unique_idempotency_keys_per_contact() {
        let campaign = campaign(1, 1);
        let jobs = seed_jobs(&campaign, &contacts(5), Utc::now());

        let mut keys: Vec<&str> = jobs.iter().map(|j| j.idempotency_key.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 5);
    }
}
