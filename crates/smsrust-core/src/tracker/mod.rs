//! Message status tracking
//!
//! Single authority over the delivery-status state machine. Every mutation of
//! a message record after creation flows through [`update_status`], which
//! validates the transition, appends the history entry, stamps the phase
//! timestamp, derives latencies and moves the campaign and daily-stats
//! counters. Invalid or repeated transitions are logged no-ops, which is what
//! makes webhook resubmission idempotent.
//!
//! [`update_status`]: MessageStatusTracker::update_status

pub mod report;

pub use report::{DeliveredEntry, DeliveryReport, FailedEntry, ReportOutcome, TaskStatusReport};

use crate::stores::Stores;
use chrono::{DateTime, TimeZone, Utc};
use smsrust_common::types::{MessageDetailId, MessageStatus};
use smsrust_common::{Error, Result};
use smsrust_storage::{CreateMessageDetail, MessageSentDetail, StatCounter, StatusHistoryEntry};
use tracing::{debug, info, warn};

/// Tracks per-message delivery state and drives the derived counters
pub struct MessageStatusTracker {
    stores: Stores,
}

impl MessageStatusTracker {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Create the `pending` record for a dispatch
    pub async fn record_dispatch(&self, input: CreateMessageDetail) -> Result<MessageSentDetail> {
        self.stores.details.create(input).await
    }

    /// Fail the record of a non-terminal attempt.
    ///
    /// A retry gets its own record, so the campaign's failure counters stay
    /// untouched here; only the attempt that exhausts the retry budget moves
    /// them, through [`mark_failed`](MessageStatusTracker::mark_failed).
    pub async fn mark_attempt_failed(&self, id: MessageDetailId, reason: &str) -> Result<()> {
        self.apply(
            id,
            MessageStatus::Failed,
            Some(reason.to_string()),
            None,
            None,
            false,
        )
        .await?;
        Ok(())
    }

    /// Record gateway acceptance: store the correlation task id and move the
    /// record to `sent`.
    pub async fn mark_sent(&self, id: MessageDetailId, task_id: &str) -> Result<()> {
        let mut detail = self
            .stores
            .details
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Message detail {} not found", id)))?;

        detail.task_id = Some(task_id.to_string());
        self.stores.details.update(&detail).await?;

        self.update_status(id, MessageStatus::Sent, None, None, None)
            .await?;
        Ok(())
    }

    /// Record terminal send failure after retries are exhausted
    pub async fn mark_failed(&self, id: MessageDetailId, reason: &str) -> Result<()> {
        self.update_status(
            id,
            MessageStatus::Failed,
            Some(reason.to_string()),
            None,
            None,
        )
        .await?;
        Ok(())
    }

    /// Apply one status transition.
    ///
    /// Returns `Ok(true)` when the transition was applied, `Ok(false)` when
    /// the state machine rejected it (already in the target state, regressing,
    /// or leaving a terminal state); rejected transitions change nothing.
    ///
    /// `occurred_at` is the event time reported by the gateway; history
    /// timestamps never go backwards, so a skewed report is clamped to the
    /// previous entry's timestamp.
    pub async fn update_status(
        &self,
        id: MessageDetailId,
        new_status: MessageStatus,
        reason: Option<String>,
        data: Option<serde_json::Value>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        self.apply(id, new_status, reason, data, occurred_at, true)
            .await
    }

    /// The transition itself; `count` controls whether the campaign and
    /// daily-stats counters move with it.
    async fn apply(
        &self,
        id: MessageDetailId,
        new_status: MessageStatus,
        reason: Option<String>,
        data: Option<serde_json::Value>,
        occurred_at: Option<DateTime<Utc>>,
        count: bool,
    ) -> Result<bool> {
        let mut detail = self
            .stores
            .details
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Message detail {} not found", id)))?;

        let current = detail.status_enum().ok_or_else(|| {
            Error::Internal(format!("Message {} has invalid status {}", id, detail.status))
        })?;

        if !current.can_transition_to(new_status) {
            debug!(
                message = %id,
                from = %current,
                to = %new_status,
                "Ignoring invalid status transition"
            );
            return Ok(false);
        }

        let last_entry_at = detail
            .history_vec()
            .last()
            .map(|e| e.timestamp)
            .unwrap_or(detail.created_at);
        let at = occurred_at.unwrap_or_else(Utc::now).max(last_entry_at);

        detail.status = new_status.to_string();
        detail.push_history(StatusHistoryEntry {
            status: new_status.to_string(),
            timestamp: at,
            reason: reason.clone(),
            data,
        });

        match new_status {
            MessageStatus::Sent => detail.sent_at = Some(at),
            MessageStatus::Delivered => {
                detail.delivered_at = Some(at);
                detail.delivery_latency_ms = detail
                    .sent_at
                    .map(|sent| (at - sent).num_milliseconds().max(0));
            }
            MessageStatus::Read => {
                detail.read_at = Some(at);
                detail.read_latency_ms = detail
                    .delivered_at
                    .map(|delivered| (at - delivered).num_milliseconds().max(0));
            }
            MessageStatus::Failed => {
                detail.failed_at = Some(at);
                if let Some(r) = reason {
                    detail.last_error = Some(r);
                }
            }
            MessageStatus::Pending | MessageStatus::Undelivered => {}
        }

        self.stores.details.update(&detail).await?;

        if count {
            if let Some(counter) = StatCounter::for_status(new_status) {
                self.stores
                    .campaigns
                    .increment_counter(detail.campaign_id, counter)
                    .await?;
                self.stores
                    .stats
                    .increment(detail.campaign_id, at.date_naive(), counter)
                    .await?;
            }
        }

        info!(
            message = %id,
            campaign = %detail.campaign_id,
            from = %current,
            to = %new_status,
            "Message status updated"
        );
        Ok(true)
    }

    /// Apply one webhook delivery report.
    ///
    /// Entries are correlated by the gateway task id; unknown ids are logged
    /// and counted, never an error. The call always succeeds so the gateway
    /// is never driven into a resubmission loop by one bad entry.
    pub async fn process_report(&self, report: &DeliveryReport) -> Result<ReportOutcome> {
        let mut outcome = ReportOutcome::default();

        for status in &report.statuses {
            let Some(detail) = self.stores.details.find_by_task_id(&status.tid).await? else {
                warn!(task_id = %status.tid, "Delivery report for unknown task");
                outcome.unmatched += 1;
                continue;
            };

            for entry in &status.sdr {
                let at = parse_epoch(entry.ts);
                self.update_status(
                    detail.id,
                    MessageStatus::Delivered,
                    entry.code.map(|c| format!("code {}", c)),
                    Some(serde_json::to_value(entry).unwrap_or_default()),
                    at,
                )
                .await?;
                outcome.processed += 1;
            }

            for entry in &status.fdr {
                let at = parse_epoch(entry.ts);
                let reason = match entry.gsm_cause {
                    Some(cause) => format!("GSM cause {}", cause),
                    None => format!("code {}", entry.code.unwrap_or(-1)),
                };
                self.update_status(
                    detail.id,
                    MessageStatus::Failed,
                    Some(reason),
                    Some(serde_json::to_value(entry).unwrap_or_default()),
                    at,
                )
                .await?;
                outcome.processed += 1;
            }
        }

        Ok(outcome)
    }
}

fn parse_epoch(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}
