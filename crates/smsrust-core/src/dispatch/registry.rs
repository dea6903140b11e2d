//! Registry of running campaign dispatchers

use crate::dispatch::queue::{DispatchJob, DispatchQueue};
use crate::dispatch::worker::{CampaignWorker, WorkerContext};
use smsrust_common::types::CampaignId;
use smsrust_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

struct CampaignHandle {
    queue: Arc<DispatchQueue>,
    token: CancellationToken,
    worker: JoinHandle<()>,
}

/// Owns the queue, worker task and cancellation token of every running
/// campaign. All lifecycle operations on a campaign's dispatcher go through
/// here; nothing else spawns or stops workers.
pub struct DispatchRegistry {
    campaigns: Mutex<HashMap<CampaignId, CampaignHandle>>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self {
            campaigns: Mutex::new(HashMap::new()),
        }
    }

    /// Create the queue for a campaign, seed it and spawn its worker
    pub async fn start_campaign(
        &self,
        campaign_id: CampaignId,
        jobs: Vec<DispatchJob>,
        ctx: WorkerContext,
    ) -> Result<()> {
        let mut campaigns = self.campaigns.lock().await;

        if let Some(existing) = campaigns.get(&campaign_id) {
            if !existing.worker.is_finished() {
                return Err(Error::Validation(format!(
                    "Campaign {} already has a running dispatcher",
                    campaign_id
                )));
            }
            campaigns.remove(&campaign_id);
        }

        let queue = Arc::new(DispatchQueue::new());
        let seeded = jobs.len();
        for job in jobs {
            queue.enqueue(job);
        }

        let token = CancellationToken::new();
        let worker = CampaignWorker::new(campaign_id, queue.clone(), ctx, token.clone());
        let handle = tokio::spawn(worker.run());

        campaigns.insert(
            campaign_id,
            CampaignHandle {
                queue,
                token,
                worker: handle,
            },
        );

        info!(campaign = %campaign_id, jobs = seeded, "Dispatcher started");
        Ok(())
    }

    /// Pause the campaign's queue; the worker blocks after its current job
    pub async fn pause(&self, campaign_id: CampaignId) -> bool {
        let campaigns = self.campaigns.lock().await;
        match campaigns.get(&campaign_id) {
            Some(handle) => {
                handle.queue.pause();
                true
            }
            None => false,
        }
    }

    /// Resume a paused queue
    pub async fn resume(&self, campaign_id: CampaignId) -> bool {
        let campaigns = self.campaigns.lock().await;
        match campaigns.get(&campaign_id) {
            Some(handle) => {
                handle.queue.resume();
                true
            }
            None => {
                warn!(campaign = %campaign_id, "No dispatcher to resume");
                false
            }
        }
    }

    /// Drain the queue, stop the worker and forget the campaign.
    ///
    /// Returns the number of discarded jobs; the in-flight job, if any,
    /// finishes before the worker exits.
    pub async fn stop(&self, campaign_id: CampaignId) -> Option<usize> {
        let handle = {
            let mut campaigns = self.campaigns.lock().await;
            campaigns.remove(&campaign_id)?
        };

        let discarded = handle.queue.drain();
        handle.token.cancel();
        if let Err(e) = handle.worker.await {
            warn!(campaign = %campaign_id, error = %e, "Worker task ended abnormally");
        }

        info!(campaign = %campaign_id, discarded, "Dispatcher stopped");
        Some(discarded)
    }

    /// Whether the campaign currently has a live dispatcher
    pub async fn is_running(&self, campaign_id: CampaignId) -> bool {
        let campaigns = self.campaigns.lock().await;
        campaigns
            .get(&campaign_id)
            .map(|h| !h.worker.is_finished())
            .unwrap_or(false)
    }

    /// Queued (not yet claimed) jobs for a campaign
    pub async fn queued_jobs(&self, campaign_id: CampaignId) -> Option<usize> {
        let campaigns = self.campaigns.lock().await;
        campaigns.get(&campaign_id).map(|h| h.queue.len())
    }

    /// Stop every dispatcher; used on server shutdown
    pub async fn shutdown(&self) {
        let handles: Vec<(CampaignId, CampaignHandle)> = {
            let mut campaigns = self.campaigns.lock().await;
            campaigns.drain().collect()
        };

        for (campaign_id, handle) in handles {
            handle.queue.pause();
            handle.token.cancel();
            if let Err(e) = handle.worker.await {
                warn!(campaign = %campaign_id, error = %e, "Worker task ended abnormally");
            }
        }
    }
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
