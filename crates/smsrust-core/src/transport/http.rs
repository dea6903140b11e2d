//! HTTP implementation of the device transport

use super::{DeviceStatusSnapshot, DeviceTransport, TaskReceipt, TaskSubmission};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smsrust_common::{Error, Result};
use smsrust_storage::Device;
use std::time::Duration;
use tracing::debug;

/// Talks to the gateway hardware's HTTP API
#[derive(Clone)]
pub struct HttpDeviceTransport {
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    tasks: &'a [TaskSubmission],
}

#[derive(Deserialize)]
struct SubmitResponse {
    results: Vec<TaskReceipt>,
}

#[derive(Serialize)]
struct TaskIdsRequest<'a> {
    ids: &'a [String],
}

impl HttpDeviceTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn url(device: &Device, path: &str) -> String {
        format!("{}{}", device.endpoint.trim_end_matches('/'), path)
    }

    async fn post_ids(&self, device: &Device, path: &str, task_ids: &[String]) -> Result<()> {
        self.client
            .post(Self::url(device, path))
            .json(&TaskIdsRequest { ids: task_ids })
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl DeviceTransport for HttpDeviceTransport {
    async fn send_batch(
        &self,
        device: &Device,
        tasks: &[TaskSubmission],
    ) -> Result<Vec<TaskReceipt>> {
        debug!(device = %device.id, count = tasks.len(), "Submitting tasks to gateway");

        let response = self
            .client
            .post(Self::url(device, "/api/v1/sms/tasks"))
            .json(&SubmitRequest { tasks })
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Invalid gateway response: {}", e)))?;

        if body.results.len() != tasks.len() {
            return Err(Error::Transport(format!(
                "Gateway returned {} receipts for {} tasks",
                body.results.len(),
                tasks.len()
            )));
        }

        Ok(body.results)
    }

    async fn pause_tasks(&self, device: &Device, task_ids: &[String]) -> Result<()> {
        self.post_ids(device, "/api/v1/sms/tasks/pause", task_ids).await
    }

    async fn resume_tasks(&self, device: &Device, task_ids: &[String]) -> Result<()> {
        self.post_ids(device, "/api/v1/sms/tasks/resume", task_ids).await
    }

    async fn remove_tasks(&self, device: &Device, task_ids: &[String]) -> Result<()> {
        self.post_ids(device, "/api/v1/sms/tasks/remove", task_ids).await
    }

    async fn get_status(&self, device: &Device) -> Result<DeviceStatusSnapshot> {
        self.client
            .get(Self::url(device, "/api/v1/status"))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Invalid gateway response: {}", e)))
    }
}
