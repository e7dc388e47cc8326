//! Text and JSON generation.
//!
//! Every AI call site (proposal prose, business insights, business setup)
//! goes through [`generate_or_fallback`], which retries with the configured
//! policy and substitutes a deterministic fallback when generation keeps
//! failing.

mod openai;
mod scripted;

pub use openai::OpenAiCompatibleProvider;
pub use scripted::ScriptedGenerator;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::retry::RetryPolicy;

/// A text/JSON generation backend.
#[async_trait]
pub trait GenerationService: Send + Sync {
    fn provider_name(&self) -> &str;

    /// Generate a JSON object constrained by `schema`.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError>;

    /// Generate free text, optionally allowing the model to draw on outside knowledge.
    async fn generate_text(
        &self,
        prompt: &str,
        use_external_knowledge: bool,
    ) -> Result<String, LlmError>;
}

/// Used when no provider is configured. Every call fails, so callers fall back.
#[derive(Debug, Default, Clone)]
pub struct DisabledGenerator;

#[async_trait]
impl GenerationService for DisabledGenerator {
    fn provider_name(&self) -> &str {
        "disabled"
    }

    async fn generate_json(
        &self,
        _prompt: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        Err(disabled())
    }

    async fn generate_text(
        &self,
        _prompt: &str,
        _use_external_knowledge: bool,
    ) -> Result<String, LlmError> {
        Err(disabled())
    }
}

fn disabled() -> LlmError {
    LlmError::RequestFailed {
        provider: "disabled".to_string(),
        reason: "no generation provider configured".to_string(),
    }
}

/// Create the generation service from configuration.
///
/// Without an API key the service is [`DisabledGenerator`] and every AI
/// feature uses its deterministic fallback.
pub fn create_generation_service(config: &LlmConfig) -> Arc<dyn GenerationService> {
    match OpenAiCompatibleProvider::new(config.clone()) {
        Ok(provider) => {
            tracing::info!(
                "Using OpenAI-compatible generation at {} ({})",
                config.base_url,
                config.model
            );
            Arc::new(provider)
        }
        Err(e) => {
            tracing::warn!("Generation disabled: {}", e);
            Arc::new(DisabledGenerator)
        }
    }
}

/// A generated value, or the fallback that replaced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub value: T,
    pub used_fallback: bool,
}

/// Generate JSON and decode it into `T`, retrying on failure.
///
/// A response that does not decode counts as a failed attempt.
pub async fn generate_structured<T: DeserializeOwned>(
    service: &dyn GenerationService,
    policy: &RetryPolicy,
    label: &str,
    prompt: &str,
    schema: &serde_json::Value,
) -> Result<T, LlmError> {
    policy
        .run(label, move || async move {
            let value = service.generate_json(prompt, schema).await?;
            serde_json::from_value(value).map_err(|e| LlmError::InvalidResponse {
                provider: service.provider_name().to_string(),
                reason: e.to_string(),
            })
        })
        .await
}

/// Like [`generate_structured`], but never fails: exhausting the retries
/// yields `fallback()` with `used_fallback` set.
pub async fn generate_or_fallback<T, F>(
    service: &dyn GenerationService,
    policy: &RetryPolicy,
    label: &str,
    prompt: &str,
    schema: &serde_json::Value,
    fallback: F,
) -> Generated<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match generate_structured(service, policy, label, prompt, schema).await {
        Ok(value) => Generated {
            value,
            used_fallback: false,
        },
        Err(e) => {
            tracing::warn!("{} unavailable, using fallback: {}", label, e);
            Generated {
                value: fallback(),
                used_fallback: true,
            }
        }
    }
}

/// Pull the outermost JSON object out of a model reply.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}
