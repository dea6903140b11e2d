//! Per-campaign dispatch queues and workers
//!
//! Every running campaign owns one [`DispatchQueue`] of time-ordered jobs and
//! one worker draining it. The [`DispatchRegistry`] holds the queue and the
//! worker handle for each campaign and is the only place they are created,
//! paused, resumed or torn down.

pub mod policy;
pub mod queue;
pub mod registry;
pub mod worker;

pub use policy::RateCapPolicy;
pub use queue::{DispatchJob, DispatchQueue};
pub use registry::DispatchRegistry;
pub use worker::{CampaignWorker, WorkerContext};
