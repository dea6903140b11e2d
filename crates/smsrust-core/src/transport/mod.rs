//! Device transport boundary
//!
//! The gateway hardware is reached over its HTTP API. Everything the engine
//! needs from it sits behind [`DeviceTransport`], so workers and tests never
//! touch the wire directly.

pub mod http;

pub use http::HttpDeviceTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smsrust_common::Result;
use smsrust_storage::Device;

/// One message handed to the gateway
#[derive(Debug, Clone, Serialize)]
pub struct TaskSubmission {
    /// Caller-chosen idempotency key, echoed back by the gateway
    pub key: String,
    pub number: String,
    pub content: String,
    /// Preferred SIM slot, when the contact has an affinity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<i32>,
}

/// Per-task acknowledgement from the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReceipt {
    /// Gateway-assigned task id; delivery reports correlate on this
    pub id: String,
    pub code: i32,
    #[serde(default)]
    pub reason: Option<String>,
}

impl TaskReceipt {
    /// Whether the gateway accepted the task for sending
    pub fn accepted(&self) -> bool {
        self.code == 0
    }
}

/// Snapshot of the device and its ports
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatusSnapshot {
    pub online: bool,
    #[serde(default)]
    pub ports: Vec<PortStatus>,
}

/// State of a single SIM port
#[derive(Debug, Clone, Deserialize)]
pub struct PortStatus {
    pub slot: i32,
    pub active: bool,
    #[serde(default)]
    pub signal: Option<i32>,
}

/// Operations the engine performs against a gateway device.
///
/// Errors from any method are transport failures and feed the caller's retry
/// policy; implementations never retry internally.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Submit a batch of message tasks, one receipt per task in order
    async fn send_batch(&self, device: &Device, tasks: &[TaskSubmission])
        -> Result<Vec<TaskReceipt>>;

    /// Pause queued tasks on the device
    async fn pause_tasks(&self, device: &Device, task_ids: &[String]) -> Result<()>;

    /// Resume previously paused tasks
    async fn resume_tasks(&self, device: &Device, task_ids: &[String]) -> Result<()>;

    /// Remove tasks the gateway has not sent yet
    async fn remove_tasks(&self, device: &Device, task_ids: &[String]) -> Result<()>;

    /// Current device and port state
    async fn get_status(&self, device: &Device) -> Result<DeviceStatusSnapshot>;
}
