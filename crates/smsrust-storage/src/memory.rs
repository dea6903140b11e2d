//! In-memory store implementing every repository trait
//!
//! Used by the `memory` database backend and by tests that need a fully
//! deterministic storage layer. All maps sit behind `tokio::sync::RwLock`;
//! the device reserve holds the write lock for the whole check-and-increment
//! so concurrent workers cannot race past a daily cap.

use crate::models::{
    Campaign, CampaignStats, Contact, CreateCampaign, CreateContact, CreateDevice,
    CreateMessageDetail, Device, MessageSentDetail, StatCounter,
};
use crate::repository::{
    CampaignRepository, CampaignStatsRepository, ContactRepository, DeviceRepository,
    MessageDetailRepository,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use smsrust_common::types::{
    CampaignId, CampaignStatus, ContactId, ContactListId, DeviceId, MessageDetailId, PauseReason,
    PhoneNumber,
};
use smsrust_common::{Error, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory storage backend
#[derive(Default)]
pub struct MemoryStore {
    campaigns: RwLock<HashMap<CampaignId, Campaign>>,
    contacts: RwLock<HashMap<ContactId, Contact>>,
    devices: RwLock<HashMap<DeviceId, Device>>,
    details: RwLock<HashMap<MessageDetailId, MessageSentDetail>>,
    stats: RwLock<HashMap<(CampaignId, NaiveDate), CampaignStats>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignRepository for MemoryStore {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            name: input.name,
            description: input.description,
            message: input.message,
            variant_pool: serde_json::to_value(input.variant_pool.unwrap_or_default())
                .unwrap_or_default(),
            ai_enabled: input.ai_enabled.unwrap_or(false),
            ai_tone: input.ai_tone,
            contact_list_id: input.contact_list_id,
            device_id: input.device_id,
            interval_min_secs: input.interval_min_secs.unwrap_or(30),
            interval_max_secs: input.interval_max_secs.unwrap_or(90),
            daily_message_limit: input.daily_message_limit.unwrap_or(300),
            send_window: input
                .send_window
                .map(|w| serde_json::to_value(w).unwrap_or_default())
                .unwrap_or(serde_json::Value::Null),
            status: CampaignStatus::Scheduled.to_string(),
            pause_reason: None,
            sent_count: 0,
            delivered_count: 0,
            failed_count: 0,
            sent_today: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        };

        self.campaigns
            .write()
            .await
            .insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        Ok(self.campaigns.read().await.get(&id).cloned())
    }

    async fn set_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        pause_reason: Option<PauseReason>,
    ) -> Result<Option<Campaign>> {
        let mut campaigns = self.campaigns.write().await;
        let Some(campaign) = campaigns.get_mut(&id) else {
            return Ok(None);
        };

        let now = Utc::now();
        campaign.status = status.to_string();
        campaign.pause_reason = pause_reason.map(|r| r.to_string());
        campaign.updated_at = now;
        if status == CampaignStatus::Active {
            campaign.started_at.get_or_insert(now);
        }
        if status == CampaignStatus::Completed {
            campaign.completed_at = Some(now);
        }

        Ok(Some(campaign.clone()))
    }

    async fn increment_counter(&self, id: CampaignId, counter: StatCounter) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("campaign {}", id)))?;

        match counter {
            StatCounter::Sent => {
                campaign.sent_count += 1;
                campaign.sent_today += 1;
            }
            StatCounter::Delivered => campaign.delivered_count += 1,
            StatCounter::Failed => campaign.failed_count += 1,
            StatCounter::Read | StatCounter::Undelivered => {}
        }
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn list_with_send_window(&self) -> Result<Vec<Campaign>> {
        Ok(self
            .campaigns
            .read()
            .await
            .values()
            .filter(|c| {
                !c.send_window.is_null()
                    && matches!(c.status.as_str(), "active" | "paused")
            })
            .cloned()
            .collect())
    }

    async fn list_paused_with_reason(&self, reason: PauseReason) -> Result<Vec<Campaign>> {
        let reason = reason.to_string();
        Ok(self
            .campaigns
            .read()
            .await
            .values()
            .filter(|c| c.status == "paused" && c.pause_reason.as_deref() == Some(reason.as_str()))
            .cloned()
            .collect())
    }

    async fn reset_daily_counters(&self) -> Result<u64> {
        let mut campaigns = self.campaigns.write().await;
        let mut touched = 0;
        for campaign in campaigns.values_mut() {
            if campaign.sent_today > 0 {
                campaign.sent_today = 0;
                campaign.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn create(&self, input: CreateContact) -> Result<Contact> {
        let now = Utc::now();
        let phone: PhoneNumber = input.phone_number.parse()?;
        let contact = Contact {
            id: Uuid::new_v4(),
            contact_list_id: input.contact_list_id,
            phone_number: phone.as_str().to_string(),
            name: input.name,
            opted_in: input.opted_in.unwrap_or(true),
            sim_device_id: None,
            sim_slot: None,
            attributes: input.attributes.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
        };

        self.contacts
            .write()
            .await
            .insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn get(&self, id: ContactId) -> Result<Option<Contact>> {
        Ok(self.contacts.read().await.get(&id).cloned())
    }

    async fn list_opted_in(&self, list_id: ContactListId) -> Result<Vec<Contact>> {
        let mut contacts: Vec<Contact> = self
            .contacts
            .read()
            .await
            .values()
            .filter(|c| c.contact_list_id == list_id && c.opted_in)
            .cloned()
            .collect();
        contacts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(contacts)
    }

    async fn set_opted_in(&self, id: ContactId, opted_in: bool) -> Result<()> {
        let mut contacts = self.contacts.write().await;
        let contact = contacts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("contact {}", id)))?;
        contact.opted_in = opted_in;
        contact.updated_at = Utc::now();
        Ok(())
    }

    async fn set_sim_affinity(&self, id: ContactId, device_id: DeviceId, slot: i32) -> Result<()> {
        let mut contacts = self.contacts.write().await;
        let contact = contacts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("contact {}", id)))?;
        contact.sim_device_id = Some(device_id);
        contact.sim_slot = Some(slot);
        contact.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl DeviceRepository for MemoryStore {
    async fn create(&self, input: CreateDevice) -> Result<Device> {
        let now = Utc::now();
        let device = Device {
            id: Uuid::new_v4(),
            name: input.name,
            endpoint: input.endpoint,
            daily_limit: input.daily_limit.unwrap_or(15000),
            daily_sent: 0,
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        self.devices.write().await.insert(device.id, device.clone());
        Ok(device)
    }

    async fn get(&self, id: DeviceId) -> Result<Option<Device>> {
        Ok(self.devices.read().await.get(&id).cloned())
    }

    async fn try_reserve_send(&self, id: DeviceId) -> Result<bool> {
        // Check-and-increment under the write lock.
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("device {}", id)))?;

        if !device.enabled || device.daily_sent >= device.daily_limit {
            return Ok(false);
        }
        device.daily_sent += 1;
        device.updated_at = Utc::now();
        Ok(true)
    }

    async fn reset_daily_counters(&self) -> Result<u64> {
        let mut devices = self.devices.write().await;
        let mut touched = 0;
        for device in devices.values_mut() {
            if device.daily_sent > 0 {
                device.daily_sent = 0;
                device.updated_at = Utc::now();
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[async_trait]
impl MessageDetailRepository for MemoryStore {
    async fn create(&self, input: CreateMessageDetail) -> Result<MessageSentDetail> {
        let detail = input.into_detail(Utc::now());
        self.details.write().await.insert(detail.id, detail.clone());
        Ok(detail)
    }

    async fn get(&self, id: MessageDetailId) -> Result<Option<MessageSentDetail>> {
        Ok(self.details.read().await.get(&id).cloned())
    }

    async fn find_by_task_id(&self, task_id: &str) -> Result<Option<MessageSentDetail>> {
        Ok(self
            .details
            .read()
            .await
            .values()
            .find(|d| d.task_id.as_deref() == Some(task_id))
            .cloned())
    }

    async fn update(&self, detail: &MessageSentDetail) -> Result<()> {
        let mut details = self.details.write().await;
        if !details.contains_key(&detail.id) {
            return Err(Error::NotFound(format!("message detail {}", detail.id)));
        }
        let mut updated = detail.clone();
        updated.updated_at = Utc::now();
        details.insert(detail.id, updated);
        Ok(())
    }

    async fn list_for_campaign(&self, campaign_id: CampaignId) -> Result<Vec<MessageSentDetail>> {
        let mut details: Vec<MessageSentDetail> = self
            .details
            .read()
            .await
            .values()
            .filter(|d| d.campaign_id == campaign_id)
            .cloned()
            .collect();
        details.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(details)
    }
}

#[async_trait]
impl CampaignStatsRepository for MemoryStore {
    async fn increment(
        &self,
        campaign_id: CampaignId,
        day: NaiveDate,
        counter: StatCounter,
    ) -> Result<()> {
        let mut stats = self.stats.write().await;
        let now = Utc::now();
        let bucket = stats.entry((campaign_id, day)).or_insert_with(|| CampaignStats {
            id: Uuid::new_v4(),
            campaign_id,
            day,
            sent: 0,
            delivered: 0,
            failed: 0,
            read_count: 0,
            undelivered: 0,
            created_at: now,
            updated_at: now,
        });

        match counter {
            StatCounter::Sent => bucket.sent += 1,
            StatCounter::Delivered => bucket.delivered += 1,
            StatCounter::Failed => bucket.failed += 1,
            StatCounter::Read => bucket.read_count += 1,
            StatCounter::Undelivered => bucket.undelivered += 1,
        }
        bucket.updated_at = now;
        Ok(())
    }

    async fn get(&self, campaign_id: CampaignId, day: NaiveDate) -> Result<Option<CampaignStats>> {
        Ok(self.stats.read().await.get(&(campaign_id, day)).cloned())
    }

    async fn list_for_campaign(&self, campaign_id: CampaignId) -> Result<Vec<CampaignStats>> {
        let mut buckets: Vec<CampaignStats> = self
            .stats
            .read()
            .await
            .values()
            .filter(|s| s.campaign_id == campaign_id)
            .cloned()
            .collect();
        buckets.sort_by_key(|s| s.day);
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn device_input(limit: i32) -> CreateDevice {
        CreateDevice {
            name: "gw-1".to_string(),
            endpoint: "http://10.0.0.1:8000".to_string(),
            daily_limit: Some(limit),
        }
    }

    #[tokio::test]
    async fn test_device_reserve_respects_cap() {
        let store = MemoryStore::new();
        let device = DeviceRepository::create(&store, device_input(2)).await.unwrap();

        assert!(store.try_reserve_send(device.id).await.unwrap());
        assert!(store.try_reserve_send(device.id).await.unwrap());
        assert!(!store.try_reserve_send(device.id).await.unwrap());

        let device = DeviceRepository::get(&store, device.id).await.unwrap().unwrap();
        assert_eq!(device.daily_sent, 2);
    }

    #[tokio::test]
    async fn test_device_reset_reopens_cap() {
        let store = MemoryStore::new();
        let device = DeviceRepository::create(&store, device_input(1)).await.unwrap();

        assert!(store.try_reserve_send(device.id).await.unwrap());
        assert!(!store.try_reserve_send(device.id).await.unwrap());

        assert_eq!(DeviceRepository::reset_daily_counters(&store).await.unwrap(), 1);
        assert!(store.try_reserve_send(device.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_contact_create_normalizes_phone_number() {
        let store = MemoryStore::new();
        let contact = ContactRepository::create(
            &store,
            CreateContact {
                contact_list_id: Uuid::new_v4(),
                phone_number: "+1 (416) 555-0199".to_string(),
                name: None,
                opted_in: None,
                attributes: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(contact.phone_number, "+14165550199");
    }

    #[tokio::test]
    async fn test_contact_create_rejects_bad_phone_number() {
        let store = MemoryStore::new();
        let err = ContactRepository::create(
            &store,
            CreateContact {
                contact_list_id: Uuid::new_v4(),
                phone_number: "not-a-number".to_string(),
                name: None,
                opted_in: None,
                attributes: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_stats_bucket_created_lazily() {
        let store = MemoryStore::new();
        let campaign_id = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        assert!(CampaignStatsRepository::get(&store, campaign_id, day)
            .await
            .unwrap()
            .is_none());

        store.increment(campaign_id, day, StatCounter::Sent).await.unwrap();
        store.increment(campaign_id, day, StatCounter::Sent).await.unwrap();
        store
            .increment(campaign_id, day, StatCounter::Delivered)
            .await
            .unwrap();

        let bucket = CampaignStatsRepository::get(&store, campaign_id, day)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bucket.sent, 2);
        assert_eq!(bucket.delivered, 1);
        assert_eq!(bucket.failed, 0);
    }

    #[tokio::test]
    async fn test_campaign_daily_reset_only_touches_today_counter() {
        let store = MemoryStore::new();
        let campaign = CampaignRepository::create(
            &store,
            CreateCampaign {
                owner_id: Uuid::new_v4(),
                name: "c".to_string(),
                description: None,
                message: "hello".to_string(),
                variant_pool: None,
                ai_enabled: None,
                ai_tone: None,
                contact_list_id: Uuid::new_v4(),
                device_id: Uuid::new_v4(),
                interval_min_secs: None,
                interval_max_secs: None,
                daily_message_limit: None,
                send_window: None,
            },
        )
        .await
        .unwrap();

        store
            .increment_counter(campaign.id, StatCounter::Sent)
            .await
            .unwrap();
        CampaignRepository::reset_daily_counters(&store).await.unwrap();

        let campaign = CampaignRepository::get(&store, campaign.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(campaign.sent_today, 0);
        assert_eq!(campaign.sent_count, 1);
    }
}
