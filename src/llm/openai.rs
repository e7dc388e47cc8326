//! OpenAI-compatible chat completions provider.
//!
//! Works against any endpoint that implements `/chat/completions` with
//! bearer-token auth. Strict JSON mode is requested via `response_format`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::{GenerationService, extract_json};
use crate::config::LlmConfig;
use crate::error::LlmError;

const PROVIDER: &str = "openai-compatible";

const JSON_SYSTEM_PROMPT: &str = "You are a business assistant for contractors and service \
    businesses. Reply with a single JSON object that matches the requested schema and nothing else.";

const TEXT_SYSTEM_PROMPT: &str =
    "You are a friendly business assistant for contractors and service businesses.";

const EXTERNAL_KNOWLEDGE_HINT: &str = "You may draw on current industry pricing, regional \
    market rates and general public knowledge when it helps the answer.";

pub struct OpenAiCompatibleProvider {
    client: Client,
    config: LlmConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.is_none() {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn api_key(&self) -> String {
        self.config
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .unwrap_or_default()
    }

    fn json_request(&self, prompt: &str, schema: &serde_json::Value) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatCompletionMessage::new("system", JSON_SYSTEM_PROMPT),
                ChatCompletionMessage::new("user", prompt),
            ],
            temperature: Some(0.4),
            response_format: Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: Some(JsonSchemaSpec {
                    name: "response".to_string(),
                    schema: schema.clone(),
                }),
            }),
        }
    }

    fn text_request(&self, prompt: &str, use_external_knowledge: bool) -> ChatCompletionRequest {
        let system = if use_external_knowledge {
            format!("{} {}", TEXT_SYSTEM_PROMPT, EXTERNAL_KNOWLEDGE_HINT)
        } else {
            TEXT_SYSTEM_PROMPT.to_string()
        };
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatCompletionMessage::new("system", system),
                ChatCompletionMessage::new("user", prompt),
            ],
            temperature: Some(0.7),
            response_format: None,
        }
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, LlmError> {
        let url = self.api_url("chat/completions");

        tracing::debug!("Sending generation request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key()))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Generation request failed: {}", e);
                LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let response_text = response.text().await.unwrap_or_default();

        tracing::debug!("Generation response status: {}", status);

        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                });
            }
            if status.as_u16() == 429 {
                let retry_after = headers
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);

                return Err(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                    retry_after,
                });
            }
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {}: {}", status, response_text),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: format!("JSON parse error: {}. Raw: {}", e, response_text),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "No content in response".to_string(),
            })
    }
}

/// Parse the JSON object out of a reply, tolerating code fences and chatter.
fn parse_json_reply(content: &str) -> Result<serde_json::Value, LlmError> {
    let json = extract_json(content).ok_or_else(|| LlmError::InvalidResponse {
        provider: PROVIDER.to_string(),
        reason: "Reply did not contain a JSON object".to_string(),
    })?;
    serde_json::from_str(json).map_err(|e| LlmError::InvalidResponse {
        provider: PROVIDER.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl GenerationService for OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let content = self.send_request(&self.json_request(prompt, schema)).await?;
        parse_json_reply(&content)
    }

    async fn generate_text(
        &self,
        prompt: &str,
        use_external_knowledge: bool,
    ) -> Result<String, LlmError> {
        self.send_request(&self.text_request(prompt, use_external_knowledge))
            .await
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<JsonSchemaSpec>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec {
    name: String,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;

    fn provider() -> OpenAiCompatibleProvider {
        let config = LlmConfig {
            base_url: "https://llm.example.com/v1/".to_string(),
            api_key: Some(SecretString::from("test-key".to_string())),
            ..LlmConfig::default()
        };
        OpenAiCompatibleProvider::new(config).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let result = OpenAiCompatibleProvider::new(LlmConfig::default());
        assert!(matches!(result, Err(LlmError::AuthFailed { .. })));
    }

    #[test]
    fn test_api_url_joins_cleanly() {
        assert_eq!(
            provider().api_url("/chat/completions"),
            "https://llm.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_json_request_carries_schema() {
        let schema = json!({"type": "object"});
        let body = serde_json::to_value(provider().json_request("Write it", &schema)).unwrap();
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["schema"], schema);
        assert_eq!(body["messages"][1]["content"], "Write it");
    }

    #[test]
    fn test_text_request_external_knowledge() {
        let body = serde_json::to_value(provider().text_request("Hi", true)).unwrap();
        assert!(body.get("response_format").is_none());
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("industry pricing"));
    }

    #[test]
    fn test_parse_json_reply() {
        let value = parse_json_reply("```json\n{\"ok\": true}\n```").unwrap();
        assert_eq!(value, json!({"ok": true}));
        assert!(parse_json_reply("sorry").is_err());
    }
}
