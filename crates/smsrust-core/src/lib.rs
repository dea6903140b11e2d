//! SmsRust Core - the campaign dispatch engine
//!
//! This crate holds the moving parts of the system: per-campaign dispatch
//! queues and workers, pacing and daily-cap enforcement, content selection,
//! the device transport, the message status tracker fed by gateway webhooks,
//! the campaign orchestrator and the background scheduled tasks.

pub mod content;
pub mod dispatch;
pub mod orchestrator;
pub mod scheduled;
pub mod stores;
pub mod tracker;
pub mod transport;

pub use content::{ContentProvider, ContentSelector, GeneratedVariant, SelectedContent};
pub use dispatch::{DispatchJob, DispatchQueue, DispatchRegistry, RateCapPolicy, WorkerContext};
pub use orchestrator::{CampaignError, CampaignOrchestrator, CampaignStatsSummary};
pub use scheduled::{DailyResetTask, TaskHandle, TimeRestrictionMonitor};
pub use stores::Stores;
pub use tracker::{DeliveryReport, MessageStatusTracker, ReportOutcome};
pub use transport::{DeviceTransport, HttpDeviceTransport};
