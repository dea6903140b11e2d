//! Repository layer for data access

pub mod campaign_stats;
pub mod campaigns;
pub mod contacts;
pub mod devices;
pub mod message_details;

// Re-export repository traits
pub use campaign_stats::CampaignStatsRepository;
pub use campaigns::CampaignRepository;
pub use contacts::ContactRepository;
pub use devices::DeviceRepository;
pub use message_details::MessageDetailRepository;

// Re-export database implementations
pub use campaign_stats::DbCampaignStatsRepository;
pub use campaigns::DbCampaignRepository;
pub use contacts::DbContactRepository;
pub use devices::DbDeviceRepository;
pub use message_details::DbMessageDetailRepository;
