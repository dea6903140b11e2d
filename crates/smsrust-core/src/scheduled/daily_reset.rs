//! Daily counter reset
//!
//! Once a day, at a configured local time, every campaign's `sent_today` and
//! every device's `daily_sent` drop to zero and campaigns paused for the
//! daily cap resume automatically. Lifetime counters and daily stats rows
//! are untouched.

use super::TaskHandle;
use crate::dispatch::DispatchRegistry;
use crate::stores::Stores;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use smsrust_common::config::DailyResetConfig;
use smsrust_common::types::{CampaignStatus, PauseReason};
use smsrust_common::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Resets daily caps and reopens capped campaigns
pub struct DailyResetTask {
    stores: Stores,
    registry: Arc<DispatchRegistry>,
    config: DailyResetConfig,
}

impl DailyResetTask {
    pub fn new(stores: Stores, registry: Arc<DispatchRegistry>, config: DailyResetConfig) -> Self {
        Self {
            stores,
            registry,
            config,
        }
    }

    /// One reset pass
    pub async fn run_once(&self) -> Result<()> {
        let campaigns_reset = self.stores.campaigns.reset_daily_counters().await?;
        let devices_reset = self.stores.devices.reset_daily_counters().await?;

        let capped = self
            .stores
            .campaigns
            .list_paused_with_reason(PauseReason::DailyLimitReached)
            .await?;
        let mut resumed = 0u64;
        for campaign in capped {
            self.stores
                .campaigns
                .set_status(campaign.id, CampaignStatus::Active, None)
                .await?;
            if !self.registry.resume(campaign.id).await {
                warn!(campaign = %campaign.id, "Capped campaign has no live dispatcher to resume");
            }
            resumed += 1;
        }

        info!(
            campaigns_reset,
            devices_reset, resumed, "Daily counters reset"
        );
        Ok(())
    }

    /// Spawn the daily loop
    pub fn spawn(self) -> TaskHandle {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                let wait = next_reset_delay(Utc::now(), &self.config);
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = tokio::time::sleep(wait) => {}
                }
                if let Err(e) = self.run_once().await {
                    error!(error = %e, "Daily reset failed");
                }
            }
        });

        TaskHandle::new("daily_reset", token, handle)
    }
}

/// Time until the next reset instant in the configured local clock
fn next_reset_delay(now: DateTime<Utc>, config: &DailyResetConfig) -> Duration {
    let offset = ChronoDuration::minutes(config.utc_offset_minutes as i64);
    let local_now = now + offset;

    let target_time = NaiveTime::from_hms_opt(config.hour, config.minute, 0)
        .unwrap_or(NaiveTime::MIN);
    let mut target = local_now.date_naive().and_time(target_time).and_utc();
    if target <= local_now {
        target += ChronoDuration::days(1);
    }

    (target - local_now).to_std().unwrap_or(Duration::from_secs(60))
}
