use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::GenerationProvider;
use super::types::{ChatMessage, GenerationOptions};
use crate::errors::RagError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_SYSTEM: &str = "You are a helpful AI assistant.";

/// Anthropic messages API. Available whenever an API key is configured.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: Client::new(),
        }
    }

    /// Collapse the conversation into one system string and one user turn.
    ///
    /// Prior assistant turns are folded into the accumulated user content as
    /// `Assistant: ...` lines instead of being sent as native turns. The
    /// folding is lossy: the backend sees a transcript, not alternating
    /// turns.
    fn fold_messages(messages: &[ChatMessage]) -> (String, String) {
        let mut system = String::new();
        let mut transcript: Vec<String> = Vec::new();

        for message in messages {
            match message.role.as_str() {
                "system" => system = message.content.clone(),
                "user" => transcript.push(message.content.clone()),
                "assistant" => transcript.push(format!("Assistant: {}", message.content)),
                _ => {}
            }
        }

        if system.is_empty() {
            system = DEFAULT_SYSTEM.to_string();
        }

        (system, transcript.join("\n"))
    }
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, RagError> {
        let (system, user_content) = Self::fold_messages(messages);

        let body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "system": system,
            "messages": [{ "role": "user", "content": user_content }],
        });

        let res = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| RagError::generation(self.name(), err))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::generation(
                self.name(),
                format!("status {status}: {text}"),
            ));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| RagError::generation(self.name(), err))?;

        payload["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RagError::generation(self.name(), "message content missing"))
    }
}
