//! HTTP variant-generation provider

use super::{ContentProvider, GeneratedVariant, GenerationConstraints};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smsrust_common::config::ContentConfig;
use smsrust_common::{Error, Result};
use std::time::Duration;

/// Calls an external generation service over HTTP
pub struct HttpContentProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    constraints: &'a GenerationConstraints,
}

#[derive(Deserialize)]
struct GenerateResponse {
    variants: Vec<GeneratedVariant>,
}

impl HttpContentProvider {
    /// Build from config; returns `None` when no endpoint is configured
    pub fn from_config(config: &ContentConfig) -> Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Some(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        }))
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<Vec<GeneratedVariant>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt, constraints });

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body: GenerateResponse = request
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Invalid provider response: {}", e)))?;

        Ok(body.variants)
    }
}
