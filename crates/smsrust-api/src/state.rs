//! Shared API state

use smsrust_common::config::Config;
use smsrust_core::{CampaignOrchestrator, MessageStatusTracker, Stores};
use smsrust_storage::DatabasePool;
use std::sync::Arc;

/// State shared by every handler
pub struct AppState {
    pub stores: Stores,
    pub orchestrator: Arc<CampaignOrchestrator>,
    pub tracker: Arc<MessageStatusTracker>,
    pub config: Config,
    /// Present only on the postgres backend; drives the readiness probe
    pub db_pool: Option<DatabasePool>,
}
