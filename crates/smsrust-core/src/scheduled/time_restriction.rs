//! Sending-window monitor
//!
//! Campaigns may carry an allowed sending window. The monitor periodically
//! sweeps every windowed campaign: active campaigns outside their window are
//! paused with the `time_restriction` reason, and campaigns it paused are
//! resumed once the window opens again. Manual and daily-cap pauses are
//! never overridden.

use super::TaskHandle;
use crate::dispatch::DispatchRegistry;
use crate::stores::Stores;
use chrono::{DateTime, Utc};
use smsrust_common::config::TimeRestrictionConfig;
use smsrust_common::types::{CampaignStatus, PauseReason};
use smsrust_common::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Pauses and resumes campaigns around their sending windows
pub struct TimeRestrictionMonitor {
    stores: Stores,
    registry: Arc<DispatchRegistry>,
    config: TimeRestrictionConfig,
}

impl TimeRestrictionMonitor {
    pub fn new(
        stores: Stores,
        registry: Arc<DispatchRegistry>,
        config: TimeRestrictionConfig,
    ) -> Self {
        Self {
            stores,
            registry,
            config,
        }
    }

    /// One sweep, evaluated at `now`
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<()> {
        let campaigns = self.stores.campaigns.list_with_send_window().await?;

        for campaign in campaigns {
            let Some(window) = campaign.send_window_opt() else {
                continue;
            };
            let inside = window.contains(now);

            match campaign.status_enum() {
                Some(CampaignStatus::Active) if !inside => {
                    if !self.registry.pause(campaign.id).await {
                        warn!(campaign = %campaign.id, "Windowed campaign has no live dispatcher");
                    }
                    self.stores
                        .campaigns
                        .set_status(
                            campaign.id,
                            CampaignStatus::Paused,
                            Some(PauseReason::TimeRestriction),
                        )
                        .await?;
                    info!(campaign = %campaign.id, "Campaign paused outside sending window");
                }
                Some(CampaignStatus::Paused)
                    if inside
                        && campaign.pause_reason_enum() == Some(PauseReason::TimeRestriction) =>
                {
                    self.stores
                        .campaigns
                        .set_status(campaign.id, CampaignStatus::Active, None)
                        .await?;
                    if !self.registry.resume(campaign.id).await {
                        warn!(campaign = %campaign.id, "Windowed campaign has no live dispatcher");
                    }
                    info!(campaign = %campaign.id, "Campaign resumed inside sending window");
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// One sweep at the current time
    pub async fn tick(&self) -> Result<()> {
        self.tick_at(Utc::now()).await
    }

    /// Spawn the periodic sweep loop
    pub fn spawn(self) -> TaskHandle {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let interval = Duration::from_secs(self.config.check_interval_secs.max(1));

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
                if let Err(e) = self.tick().await {
                    error!(error = %e, "Sending-window sweep failed");
                }
            }
        });

        TaskHandle::new("time_restriction", token, handle)
    }
}
