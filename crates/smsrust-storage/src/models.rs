//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use smsrust_common::types::{
    CampaignId, CampaignStatus, ContactId, ContactListId, DeviceId, MessageDetailId,
    MessageStatus, PauseReason, SendWindow, UserId,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Campaign model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    /// Static base message, the last content fallback
    pub message: String,
    /// Pre-generated message variants as a JSON array of strings
    pub variant_pool: serde_json::Value,
    pub ai_enabled: bool,
    pub ai_tone: Option<String>,
    pub contact_list_id: ContactListId,
    pub device_id: DeviceId,
    pub interval_min_secs: i32,
    pub interval_max_secs: i32,
    pub daily_message_limit: i32,
    /// Allowed sending window as a JSON object, null when unrestricted
    pub send_window: serde_json::Value,
    pub status: String,
    pub pause_reason: Option<String>,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub failed_count: i32,
    pub sent_today: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Get status as enum
    pub fn status_enum(&self) -> Option<CampaignStatus> {
        self.status.parse().ok()
    }

    /// Get pause reason as enum
    pub fn pause_reason_enum(&self) -> Option<PauseReason> {
        self.pause_reason.as_deref().and_then(|r| r.parse().ok())
    }

    /// Get the variant pool as a vector
    pub fn variants_vec(&self) -> Vec<String> {
        serde_json::from_value(self.variant_pool.clone()).unwrap_or_default()
    }

    /// Get the sending window, if one is configured
    pub fn send_window_opt(&self) -> Option<SendWindow> {
        serde_json::from_value(self.send_window.clone()).ok()
    }
}

/// Input for creating a campaign
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaign {
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub message: String,
    pub variant_pool: Option<Vec<String>>,
    pub ai_enabled: Option<bool>,
    pub ai_tone: Option<String>,
    pub contact_list_id: ContactListId,
    pub device_id: DeviceId,
    pub interval_min_secs: Option<i32>,
    pub interval_max_secs: Option<i32>,
    pub daily_message_limit: Option<i32>,
    pub send_window: Option<SendWindow>,
}

/// Contact model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub contact_list_id: ContactListId,
    pub phone_number: String,
    pub name: Option<String>,
    pub opted_in: bool,
    /// Device last used to message this contact (SIM affinity)
    pub sim_device_id: Option<DeviceId>,
    pub sim_slot: Option<i32>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a contact
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContact {
    pub contact_list_id: ContactListId,
    pub phone_number: String,
    pub name: Option<String>,
    pub opted_in: Option<bool>,
    pub attributes: Option<serde_json::Value>,
}

/// Gateway device model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Base URL of the gateway hardware's HTTP API
    pub endpoint: String,
    pub daily_limit: i32,
    pub daily_sent: i32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a device
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDevice {
    pub name: String,
    pub endpoint: String,
    pub daily_limit: Option<i32>,
}

/// One appended entry of a message's delivery history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// One record per dispatch attempt, retained for audit and analytics.
/// A retry creates a fresh record; `attempts` is this attempt's ordinal.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageSentDetail {
    pub id: MessageDetailId,
    pub campaign_id: CampaignId,
    pub contact_id: ContactId,
    pub device_id: DeviceId,
    pub phone_number: String,
    pub content: String,
    pub content_hash: String,
    pub variant_id: Option<String>,
    pub tone: Option<String>,
    pub language: Option<String>,
    pub encoding: String,
    pub segments: i32,
    pub cost: f64,
    pub status: String,
    /// Append-only JSON array of [`StatusHistoryEntry`]
    pub status_history: serde_json::Value,
    /// Gateway-assigned task id, the webhook correlation key
    pub task_id: Option<String>,
    pub attempts: i32,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub delivery_latency_ms: Option<i64>,
    pub read_latency_ms: Option<i64>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageSentDetail {
    /// Get status as enum
    pub fn status_enum(&self) -> Option<MessageStatus> {
        self.status.parse().ok()
    }

    /// Get the status history as a vector
    pub fn history_vec(&self) -> Vec<StatusHistoryEntry> {
        serde_json::from_value(self.status_history.clone()).unwrap_or_default()
    }

    /// Append an entry to the status history (never rewrites existing entries)
    pub fn push_history(&mut self, entry: StatusHistoryEntry) {
        let mut history = self.history_vec();
        history.push(entry);
        self.status_history = serde_json::to_value(history).unwrap_or_default();
    }
}

/// Input for creating a message sent detail
#[derive(Debug, Clone)]
pub struct CreateMessageDetail {
    pub campaign_id: CampaignId,
    pub contact_id: ContactId,
    pub device_id: DeviceId,
    pub phone_number: String,
    pub content: String,
    pub content_hash: String,
    pub variant_id: Option<String>,
    pub tone: Option<String>,
    pub language: Option<String>,
    pub encoding: String,
    pub segments: i32,
    pub cost: f64,
    /// Ordinal of this dispatch attempt, starting at 1
    pub attempt: i32,
}

impl CreateMessageDetail {
    /// Build the initial `pending` row for this dispatch attempt
    pub fn into_detail(self, now: DateTime<Utc>) -> MessageSentDetail {
        let initial = StatusHistoryEntry {
            status: MessageStatus::Pending.to_string(),
            timestamp: now,
            reason: None,
            data: None,
        };
        MessageSentDetail {
            id: uuid::Uuid::new_v4(),
            campaign_id: self.campaign_id,
            contact_id: self.contact_id,
            device_id: self.device_id,
            phone_number: self.phone_number,
            content: self.content,
            content_hash: self.content_hash,
            variant_id: self.variant_id,
            tone: self.tone,
            language: self.language,
            encoding: self.encoding,
            segments: self.segments,
            cost: self.cost,
            status: MessageStatus::Pending.to_string(),
            status_history: serde_json::json!([initial]),
            task_id: None,
            attempts: self.attempt,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            failed_at: None,
            delivery_latency_ms: None,
            read_latency_ms: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-campaign per-day counter row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampaignStats {
    pub id: uuid::Uuid,
    pub campaign_id: CampaignId,
    pub day: NaiveDate,
    pub sent: i32,
    pub delivered: i32,
    pub failed: i32,
    pub read_count: i32,
    pub undelivered: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which counter a status transition moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatCounter {
    Sent,
    Delivered,
    Failed,
    Read,
    Undelivered,
}

impl StatCounter {
    /// The counter moved by entering `status`, if any.
    ///
    /// `pending` moves nothing: the record exists but no send happened yet.
    pub fn for_status(status: MessageStatus) -> Option<StatCounter> {
        match status {
            MessageStatus::Pending => None,
            MessageStatus::Sent => Some(StatCounter::Sent),
            MessageStatus::Delivered => Some(StatCounter::Delivered),
            MessageStatus::Failed => Some(StatCounter::Failed),
            MessageStatus::Read => Some(StatCounter::Read),
            MessageStatus::Undelivered => Some(StatCounter::Undelivered),
        }
    }
}
