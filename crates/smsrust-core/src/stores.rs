//! Repository bundle handed to the engine components

use smsrust_storage::{
    CampaignRepository, CampaignStatsRepository, ContactRepository, DatabasePool,
    DbCampaignRepository, DbCampaignStatsRepository, DbContactRepository, DbDeviceRepository,
    DbMessageDetailRepository, DeviceRepository, MemoryStore, MessageDetailRepository,
};
use std::sync::Arc;

/// The set of repositories the engine operates on.
///
/// Components take a clone of this bundle instead of individual repository
/// handles, so wiring stays in one place and tests can substitute the
/// in-memory backend wholesale.
#[derive(Clone)]
pub struct Stores {
    pub campaigns: Arc<dyn CampaignRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub devices: Arc<dyn DeviceRepository>,
    pub details: Arc<dyn MessageDetailRepository>,
    pub stats: Arc<dyn CampaignStatsRepository>,
}

impl Stores {
    /// Build the bundle over a PostgreSQL pool
    pub fn postgres(pool: DatabasePool) -> Self {
        Self {
            campaigns: Arc::new(DbCampaignRepository::new(pool.clone())),
            contacts: Arc::new(DbContactRepository::new(pool.clone())),
            devices: Arc::new(DbDeviceRepository::new(pool.clone())),
            details: Arc::new(DbMessageDetailRepository::new(pool.clone())),
            stats: Arc::new(DbCampaignStatsRepository::new(pool)),
        }
    }

    /// Build the bundle over a single shared in-memory store
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            campaigns: store.clone(),
            contacts: store.clone(),
            devices: store.clone(),
            details: store.clone(),
            stats: store,
        }
    }
}
