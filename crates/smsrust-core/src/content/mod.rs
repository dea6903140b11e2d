//! Message content selection
//!
//! Each dispatch picks its content through a fixed fallback chain: an AI
//! variant when the campaign enables it and a provider is configured, then a
//! random pick from the campaign's pre-generated variant pool, then the
//! static base message. Provider failures fall through silently so a flaky
//! provider never blocks sending.

pub mod provider;

pub use provider::HttpContentProvider;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smsrust_common::Result;
use smsrust_storage::{Campaign, Contact};
use std::sync::Arc;
use tracing::{debug, warn};

/// Constraints passed to the variant generator
#[derive(Debug, Clone, Serialize)]
pub struct GenerationConstraints {
    pub max_characters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// One generated message variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedVariant {
    pub content: String,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub character_count: Option<i64>,
    #[serde(default)]
    pub spam_score: Option<f64>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Generates message variants from a prompt
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<Vec<GeneratedVariant>>;
}

/// The content chosen for one dispatch
#[derive(Debug, Clone)]
pub struct SelectedContent {
    pub content: String,
    /// Where the content came from: `ai`, `pool-N`, or none for the static message
    pub variant_id: Option<String>,
    pub tone: Option<String>,
    pub language: Option<String>,
    /// Encoding claimed by the generator; the dispatcher derives its own
    /// when absent
    pub encoding: Option<String>,
    /// Generation cost billed by the provider; zero for pool and static picks
    pub cost: f64,
}

/// Applies the AI -> variant pool -> static message fallback chain
pub struct ContentSelector {
    provider: Option<Arc<dyn ContentProvider>>,
}

impl ContentSelector {
    pub fn new(provider: Option<Arc<dyn ContentProvider>>) -> Self {
        Self { provider }
    }

    /// Pick the content for one contact of a campaign
    pub async fn select(&self, campaign: &Campaign, contact: &Contact) -> SelectedContent {
        if campaign.ai_enabled {
            if let Some(provider) = &self.provider {
                let prompt = build_prompt(campaign, contact);
                let constraints = GenerationConstraints {
                    max_characters: 160,
                    tone: campaign.ai_tone.clone(),
                };

                match provider.generate(&prompt, &constraints).await {
                    Ok(variants) => {
                        if let Some(variant) = variants.into_iter().next() {
                            return SelectedContent {
                                content: variant.content,
                                variant_id: Some("ai".to_string()),
                                tone: variant.tone.or_else(|| campaign.ai_tone.clone()),
                                language: variant.language,
                                encoding: variant.encoding,
                                cost: variant.cost.unwrap_or(0.0),
                            };
                        }
                        debug!(campaign = %campaign.id, "Provider returned no variants");
                    }
                    Err(e) => {
                        warn!(campaign = %campaign.id, error = %e, "Content provider failed, falling back");
                    }
                }
            }
        }

        let pool = campaign.variants_vec();
        if !pool.is_empty() {
            let idx = rand::thread_rng().gen_range(0..pool.len());
            return SelectedContent {
                content: pool[idx].clone(),
                variant_id: Some(format!("pool-{}", idx)),
                tone: None,
                language: None,
                encoding: None,
                cost: 0.0,
            };
        }

        SelectedContent {
            content: campaign.message.clone(),
            variant_id: None,
            tone: None,
            language: None,
            encoding: None,
            cost: 0.0,
        }
    }
}

fn build_prompt(campaign: &Campaign, contact: &Contact) -> String {
    match contact.name.as_deref() {
        Some(name) => format!(
            "Write one SMS for the campaign \"{}\" addressed to {}. Base message: {}",
            campaign.name, name, campaign.message
        ),
        None => format!(
            "Write one SMS for the campaign \"{}\". Base message: {}",
            campaign.name, campaign.message
        ),
    }
}

/// SHA-256 hex digest of the content, stored for variant analytics
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive the SMS encoding and segment count for a message body.
///
/// ASCII bodies fit the GSM-7 alphabet (160 chars single, 153 per part);
/// anything else goes out as UCS-2 (70 single, 67 per part).
pub fn encoding_and_segments(content: &str) -> (&'static str, i32) {
    let chars = content.chars().count();
    if content.is_ascii() {
        let segments = if chars <= 160 { 1 } else { chars.div_ceil(153) };
        ("gsm7", segments as i32)
    } else {
        let segments = if chars <= 70 { 1 } else { chars.div_ceil(67) };
        ("ucs2", segments as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use smsrust_common::Error;

    fn campaign(message: &str, pool: Vec<&str>, ai: bool) -> Campaign {
        Campaign {
            id: uuid::Uuid::new_v4(),
            owner_id: uuid::Uuid::new_v4(),
            name: "spring sale".to_string(),
            description: None,
            message: message.to_string(),
            variant_pool: serde_json::json!(pool),
            ai_enabled: ai,
            ai_tone: Some("friendly".to_string()),
            contact_list_id: uuid::Uuid::new_v4(),
            device_id: uuid::Uuid::new_v4(),
            interval_min_secs: 30,
            interval_max_secs: 90,
            daily_message_limit: 300,
            send_window: serde_json::Value::Null,
            status: "active".to_string(),
            pause_reason: None,
            sent_count: 0,
            delivered_count: 0,
            failed_count: 0,
            sent_today: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    fn contact() -> Contact {
        Contact {
            id: uuid::Uuid::new_v4(),
            contact_list_id: uuid::Uuid::new_v4(),
            phone_number: "+14165550199".to_string(),
            name: Some("Sam".to_string()),
            opted_in: true,
            sim_device_id: None,
            sim_slot: None,
            attributes: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct FixedProvider(Vec<GeneratedVariant>);

    #[async_trait]
    impl ContentProvider for FixedProvider {
        async fn generate(
            &self,
            _prompt: &str,
            _constraints: &GenerationConstraints,
        ) -> Result<Vec<GeneratedVariant>> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ContentProvider for FailingProvider {
        async fn generate(
            &self,
            _prompt: &str,
            _constraints: &GenerationConstraints,
        ) -> Result<Vec<GeneratedVariant>> {
            Err(Error::Transport("provider down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_ai_variant_preferred() {
        let provider = Arc::new(FixedProvider(vec![GeneratedVariant {
            content: "Generated!".to_string(),
            tone: Some("upbeat".to_string()),
            language: Some("en".to_string()),
            character_count: Some(10),
            spam_score: None,
            encoding: Some("gsm7".to_string()),
            cost: Some(0.002),
        }]));
        let selector = ContentSelector::new(Some(provider));

        let selected = selector
            .select(&campaign("base", vec!["v1"], true), &contact())
            .await;
        assert_eq!(selected.content, "Generated!");
        assert_eq!(selected.variant_id.as_deref(), Some("ai"));
        assert_eq!(selected.tone.as_deref(), Some("upbeat"));
        assert_eq!(selected.language.as_deref(), Some("en"));
        assert_eq!(selected.encoding.as_deref(), Some("gsm7"));
        assert_eq!(selected.cost, 0.002);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_through_to_pool() {
        let selector = ContentSelector::new(Some(Arc::new(FailingProvider)));

        let selected = selector
            .select(&campaign("base", vec!["only variant"], true), &contact())
            .await;
        assert_eq!(selected.content, "only variant");
        assert_eq!(selected.variant_id.as_deref(), Some("pool-0"));
        assert_eq!(selected.cost, 0.0);
        assert_eq!(selected.language, None);
    }

    #[tokio::test]
    async fn test_empty_pool_falls_through_to_static() {
        let selector = ContentSelector::new(None);

        let selected = selector
            .select(&campaign("the base message", vec![], true), &contact())
            .await;
        assert_eq!(selected.content, "the base message");
        assert_eq!(selected.variant_id, None);
    }

    #[tokio::test]
    async fn test_pool_pick_stays_in_pool() {
        let selector = ContentSelector::new(None);
        let campaign = campaign("base", vec!["a", "b", "c"], false);

        for _ in 0..20 {
            let selected = selector.select(&campaign, &contact()).await;
            assert!(["a", "b", "c"].contains(&selected.content.as_str()));
            let id = selected.variant_id.unwrap();
            assert!(id.starts_with("pool-"));
        }
    }

    #[test]
    fn test_encoding_and_segments() {
        assert_eq!(encoding_and_segments("short"), ("gsm7", 1));
        assert_eq!(encoding_and_segments(&"x".repeat(160)), ("gsm7", 1));
        assert_eq!(encoding_and_segments(&"x".repeat(161)), ("gsm7", 2));
        assert_eq!(encoding_and_segments(&"x".repeat(306)), ("gsm7", 2));
        assert_eq!(encoding_and_segments(&"x".repeat(307)), ("gsm7", 3));
        assert_eq!(encoding_and_segments("héllo"), ("ucs2", 1));
        assert_eq!(encoding_and_segments(&"é".repeat(71)), ("ucs2", 2));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello "));
        assert_eq!(content_hash("hello").len(), 64);
    }
}
