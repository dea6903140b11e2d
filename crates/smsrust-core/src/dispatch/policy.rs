//! Daily-cap enforcement
//!
//! Two caps gate every dispatch: the campaign's own daily message limit and
//! the shared daily cap of the device it sends through. The campaign cap is a
//! read against the freshly loaded campaign row; the device cap is an atomic
//! reserve so concurrent campaigns on one device cannot overshoot it.

use crate::stores::Stores;
use smsrust_common::{Error, Result};
use smsrust_storage::Campaign;

/// Checks both caps and reserves the device slot
pub struct RateCapPolicy {
    stores: Stores,
}

impl RateCapPolicy {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Check the campaign cap, then atomically reserve against the device cap.
    ///
    /// A capped campaign or exhausted device yields
    /// [`Error::CapacityExceeded`]; the campaign cap is checked first so a
    /// capped campaign never consumes device budget. A reserved slot is not
    /// returned on later send failure; the attempt still counted against the
    /// hardware's day.
    pub async fn check_and_reserve(&self, campaign: &Campaign) -> Result<()> {
        if campaign.sent_today >= campaign.daily_message_limit {
            return Err(Error::CapacityExceeded(format!(
                "campaign {} reached its daily limit of {}",
                campaign.id, campaign.daily_message_limit
            )));
        }

        if !self.stores.devices.try_reserve_send(campaign.device_id).await? {
            return Err(Error::CapacityExceeded(format!(
                "device {} has no sending capacity left today",
                campaign.device_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use smsrust_storage::CreateDevice;

    fn campaign_with(sent_today: i32, limit: i32, device_id: uuid::Uuid) -> Campaign {
        Campaign {
            id: uuid::Uuid::new_v4(),
            owner_id: uuid::Uuid::new_v4(),
            name: "caps".to_string(),
            description: None,
            message: "m".to_string(),
            variant_pool: serde_json::json!([]),
            ai_enabled: false,
            ai_tone: None,
            contact_list_id: uuid::Uuid::new_v4(),
            device_id,
            interval_min_secs: 30,
            interval_max_secs: 90,
            daily_message_limit: limit,
            send_window: serde_json::Value::Null,
            status: "active".to_string(),
            pause_reason: None,
            sent_count: sent_today,
            delivered_count: 0,
            failed_count: 0,
            sent_today,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_campaign_cap_checked_before_device_reserve() {
        let stores = Stores::memory();
        let device = stores
            .devices
            .create(CreateDevice {
                name: "gw".to_string(),
                endpoint: "http://gw".to_string(),
                daily_limit: Some(10),
            })
            .await
            .unwrap();

        let policy = RateCapPolicy::new(stores.clone());
        let capped = campaign_with(300, 300, device.id);
        let err = policy.check_and_reserve(&capped).await.unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(_)));

        // Rejection consumed no device budget
        let device = stores.devices.get(device.id).await.unwrap().unwrap();
        assert_eq!(device.daily_sent, 0);
    }

    #[tokio::test]
    async fn test_device_cap_rejects_when_exhausted() {
        let stores = Stores::memory();
        let device = stores
            .devices
            .create(CreateDevice {
                name: "gw".to_string(),
                endpoint: "http://gw".to_string(),
                daily_limit: Some(1),
            })
            .await
            .unwrap();

        let policy = RateCapPolicy::new(stores);
        let campaign = campaign_with(0, 300, device.id);

        assert!(policy.check_and_reserve(&campaign).await.is_ok());
        let err = policy.check_and_reserve(&campaign).await.unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(_)));
    }
}
