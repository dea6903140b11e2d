//! Gateway webhook payload types

use serde::{Deserialize, Serialize};

/// Top-level webhook body posted by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub statuses: Vec<TaskStatusReport>,
}

impl DeliveryReport {
    /// The only report kind the tracker understands
    pub const SMS_SENT_STATUS: &'static str = "sms-sent-status";
}

/// Aggregate status for one gateway task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusReport {
    /// Gateway task id assigned at submission
    pub tid: String,
    #[serde(default)]
    pub sent: i32,
    #[serde(default)]
    pub failed: i32,
    #[serde(default)]
    pub unsent: i32,
    /// Successful delivery receipts
    #[serde(default)]
    pub sdr: Vec<DeliveredEntry>,
    /// Failed delivery receipts
    #[serde(default)]
    pub fdr: Vec<FailedEntry>,
}

/// One successful delivery receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredEntry {
    pub number: String,
    /// Event time, Unix epoch seconds
    pub ts: i64,
    #[serde(default)]
    pub code: Option<i32>,
}

/// One failed delivery receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedEntry {
    pub number: String,
    /// Event time, Unix epoch seconds
    pub ts: i64,
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub gsm_cause: Option<i32>,
}

/// Summary of one processed webhook call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportOutcome {
    /// Receipt entries applied to a matched message
    pub processed: usize,
    /// Entries whose task id matched nothing
    pub unmatched: usize,
}
