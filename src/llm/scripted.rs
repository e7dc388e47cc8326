//! Generation service that replays queued replies.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use super::GenerationService;
use crate::error::LlmError;

/// Replays queued replies in order. An empty queue fails the call.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<serde_json::Value, String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, value: serde_json::Value) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(value));
        }
    }

    pub fn push_error(&self, reason: &str) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(reason.to_string()));
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next(&self, prompt: &str) -> Result<serde_json::Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let reply = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match reply {
            Some(Ok(value)) => Ok(value),
            Some(Err(reason)) => Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason,
            }),
            None => Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "no scripted reply left".to_string(),
            }),
        }
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn generate_json(
        &self,
        prompt: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        self.next(prompt)
    }

    async fn generate_text(
        &self,
        prompt: &str,
        _use_external_knowledge: bool,
    ) -> Result<String, LlmError> {
        self.next(prompt).map(|value| match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
    }
}
