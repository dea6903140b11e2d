//! Per-campaign dispatch worker
//!
//! One worker drains one campaign's queue, a single job at a time. Pacing
//! falls out of the queue itself: jobs are seeded with randomized
//! `not_before` deadlines and the claim call sleeps until the head is due.

use crate::content::{content_hash, encoding_and_segments, ContentSelector};
use crate::dispatch::policy::RateCapPolicy;
use crate::dispatch::queue::{DispatchJob, DispatchQueue};
use crate::stores::Stores;
use crate::tracker::MessageStatusTracker;
use crate::transport::{DeviceTransport, TaskSubmission};
use chrono::{Duration as ChronoDuration, Utc};
use smsrust_common::config::DispatchConfig;
use smsrust_common::types::{CampaignStatus, MessageDetailId, PauseReason};
use smsrust_common::Error;
use smsrust_storage::CreateMessageDetail;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shared dependencies handed to every worker
#[derive(Clone)]
pub struct WorkerContext {
    pub stores: Stores,
    pub policy: Arc<RateCapPolicy>,
    pub selector: Arc<ContentSelector>,
    pub transport: Arc<dyn DeviceTransport>,
    pub tracker: Arc<MessageStatusTracker>,
    pub dispatch: DispatchConfig,
}

/// What processing one job led to
#[derive(Debug, Clone, PartialEq, Eq)]
enum JobOutcome {
    Sent,
    RetryScheduled,
    FailedTerminal,
    CapPaused,
    Skipped,
}

/// Drains one campaign's dispatch queue
pub struct CampaignWorker {
    campaign_id: smsrust_common::types::CampaignId,
    queue: Arc<DispatchQueue>,
    ctx: WorkerContext,
    token: CancellationToken,
}

impl CampaignWorker {
    pub fn new(
        campaign_id: smsrust_common::types::CampaignId,
        queue: Arc<DispatchQueue>,
        ctx: WorkerContext,
        token: CancellationToken,
    ) -> Self {
        Self {
            campaign_id,
            queue,
            ctx,
            token,
        }
    }

    /// Run until the queue drains, the campaign completes or shutdown
    pub async fn run(self) {
        info!(campaign = %self.campaign_id, "Campaign worker started");

        loop {
            let job = tokio::select! {
                _ = self.token.cancelled() => {
                    info!(campaign = %self.campaign_id, "Campaign worker shutting down");
                    return;
                }
                job = self.queue.claim_next() => job,
            };

            let Some(job) = job else {
                if !self.queue.is_closed() {
                    self.mark_completed().await;
                }
                return;
            };

            // A failed job never aborts the loop
            let outcome = self.process(job).await;
            debug!(campaign = %self.campaign_id, ?outcome, "Job processed");
        }
    }

    /// All campaign jobs were dispatched; the campaign is done
    async fn mark_completed(&self) {
        match self
            .ctx
            .stores
            .campaigns
            .set_status(self.campaign_id, CampaignStatus::Completed, None)
            .await
        {
            Ok(_) => info!(campaign = %self.campaign_id, "Campaign completed"),
            Err(e) => {
                error!(campaign = %self.campaign_id, error = %e, "Failed to mark campaign completed")
            }
        }
    }

    async fn process(&self, job: DispatchJob) -> JobOutcome {
        let campaign = match self.ctx.stores.campaigns.get(job.campaign_id).await {
            Ok(Some(campaign)) => campaign,
            Ok(None) => {
                warn!(campaign = %job.campaign_id, "Campaign vanished, dropping job");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                error!(campaign = %job.campaign_id, error = %e, "Failed to load campaign");
                return self.schedule_retry(job, None, &e.to_string()).await;
            }
        };

        // Caps are checked once per logical message; retries reuse the
        // reserved slot
        if job.attempts == 0 {
            match self.ctx.policy.check_and_reserve(&campaign).await {
                Ok(()) => {}
                Err(err @ Error::CapacityExceeded(_)) => {
                    warn!(
                        campaign = %self.campaign_id,
                        error = %err,
                        "Daily cap reached, pausing campaign"
                    );
                    // Put the job back first so resume picks it up
                    self.queue.enqueue(job);
                    self.queue.pause();
                    if let Err(e) = self
                        .ctx
                        .stores
                        .campaigns
                        .set_status(
                            self.campaign_id,
                            CampaignStatus::Paused,
                            Some(PauseReason::DailyLimitReached),
                        )
                        .await
                    {
                        error!(campaign = %self.campaign_id, error = %e, "Failed to pause campaign");
                    }
                    return JobOutcome::CapPaused;
                }
                Err(e) => {
                    error!(campaign = %self.campaign_id, error = %e, "Cap check failed");
                    return self.schedule_retry(job, None, &e.to_string()).await;
                }
            }
        }

        let device = match self.ctx.stores.devices.get(job.device_id).await {
            Ok(Some(device)) if device.enabled => device,
            Ok(_) => {
                warn!(device = %job.device_id, "Device missing or disabled");
                return self
                    .schedule_retry(job, None, "Device missing or disabled")
                    .await;
            }
            Err(e) => {
                error!(device = %job.device_id, error = %e, "Failed to load device");
                return self.schedule_retry(job, None, &e.to_string()).await;
            }
        };

        // Every attempt selects content and writes its own record
        let contact = match self.ctx.stores.contacts.get(job.contact_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                warn!(contact = %job.contact_id, "Contact vanished, dropping job");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                error!(contact = %job.contact_id, error = %e, "Failed to load contact");
                return self.schedule_retry(job, None, &e.to_string()).await;
            }
        };

        let selected = self.ctx.selector.select(&campaign, &contact).await;
        let (computed_encoding, segments) = encoding_and_segments(&selected.content);
        let encoding = selected
            .encoding
            .clone()
            .unwrap_or_else(|| computed_encoding.to_string());
        let input = CreateMessageDetail {
            campaign_id: job.campaign_id,
            contact_id: job.contact_id,
            device_id: job.device_id,
            phone_number: job.phone_number.clone(),
            content: selected.content.clone(),
            content_hash: content_hash(&selected.content),
            variant_id: selected.variant_id,
            tone: selected.tone,
            language: selected.language,
            encoding,
            segments,
            cost: selected.cost,
            attempt: job.attempts as i32 + 1,
        };

        let (detail_id, content, slot) = match self.ctx.tracker.record_dispatch(input).await {
            Ok(detail) => (detail.id, selected.content, contact.sim_slot),
            Err(e) => {
                error!(campaign = %self.campaign_id, error = %e, "Failed to create message record");
                return self.schedule_retry(job, None, &e.to_string()).await;
            }
        };

        let submission = TaskSubmission {
            key: job.idempotency_key.clone(),
            number: job.phone_number.clone(),
            content,
            slot,
        };

        let transport_timeout = Duration::from_secs(self.ctx.dispatch.transport_timeout_secs);
        let send = timeout(
            transport_timeout,
            self.ctx.transport.send_batch(&device, &[submission]),
        )
        .await
        .map_err(|_| Error::Transport("Gateway call timed out".to_string()))
        .and_then(|r| r);

        match send {
            Ok(receipts) => match receipts.first() {
                Some(receipt) if receipt.accepted() => {
                    if let Err(e) = self.ctx.tracker.mark_sent(detail_id, &receipt.id).await {
                        error!(message = %detail_id, error = %e, "Failed to record sent status");
                    }
                    if let Err(e) = self
                        .ctx
                        .stores
                        .contacts
                        .set_sim_affinity(job.contact_id, device.id, slot.unwrap_or(0))
                        .await
                    {
                        debug!(contact = %job.contact_id, error = %e, "Failed to record SIM affinity");
                    }
                    info!(
                        campaign = %self.campaign_id,
                        message = %detail_id,
                        task_id = %receipt.id,
                        "Message handed to gateway"
                    );
                    JobOutcome::Sent
                }
                Some(receipt) => {
                    let reason = receipt
                        .reason
                        .clone()
                        .unwrap_or_else(|| format!("Gateway rejected task, code {}", receipt.code));
                    self.schedule_retry(job, Some(detail_id), &reason).await
                }
                None => {
                    self.schedule_retry(job, Some(detail_id), "Gateway returned no receipt")
                        .await
                }
            },
            Err(e) => self.schedule_retry(job, Some(detail_id), &e.to_string()).await,
        }
    }

    /// Close out a failed attempt: fail its record, then either enqueue a
    /// successor job with backoff or fail the message terminally.
    async fn schedule_retry(
        &self,
        job: DispatchJob,
        detail_id: Option<MessageDetailId>,
        reason: &str,
    ) -> JobOutcome {
        let consumed = job.attempts + 1;

        if consumed < self.ctx.dispatch.max_attempts {
            let delay = retry_backoff(self.ctx.dispatch.retry_base_secs, consumed);
            warn!(
                campaign = %self.campaign_id,
                attempt = consumed,
                delay_secs = delay.as_secs(),
                reason,
                "Send attempt failed, retrying"
            );

            if let Some(id) = detail_id {
                if let Err(e) = self.ctx.tracker.mark_attempt_failed(id, reason).await {
                    error!(message = %id, error = %e, "Failed to record attempt failure");
                }
            }

            let not_before = Utc::now()
                + ChronoDuration::from_std(delay).unwrap_or(ChronoDuration::zero());
            self.queue.enqueue(job.retry(not_before));
            JobOutcome::RetryScheduled
        } else {
            error!(
                campaign = %self.campaign_id,
                attempts = consumed,
                reason,
                "Send failed terminally"
            );
            if let Some(id) = detail_id {
                if let Err(e) = self.ctx.tracker.mark_failed(id, reason).await {
                    error!(message = %id, error = %e, "Failed to record terminal failure");
                }
            }
            JobOutcome::FailedTerminal
        }
    }
}

/// Exponential backoff: base doubles per failed attempt, capped at 5 minutes
pub fn retry_backoff(base_secs: u64, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let secs = base_secs.saturating_mul(1u64 << exp).min(300);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_retry_backoff_doubles() {
        assert_eq!(retry_backoff(5, 1), Duration::from_secs(5));
        assert_eq!(retry_backoff(5, 2), Duration::from_secs(10));
        assert_eq!(retry_backoff(5, 3), Duration::from_secs(20));
    }

    #[test]
    fn test_retry_backoff_capped() {
        assert_eq!(retry_backoff(5, 10), Duration::from_secs(300));
        assert_eq!(retry_backoff(60, 30), Duration::from_secs(300));
    }
}
