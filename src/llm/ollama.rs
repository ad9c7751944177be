use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::GenerationProvider;
use super::types::{ChatMessage, GenerationOptions};
use crate::errors::RagError;

const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Local Ollama runtime, spoken to via its native `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: Client::new(),
        }
    }

    fn format_prompt(messages: &[ChatMessage]) -> String {
        let mut formatted = String::new();
        for message in messages {
            match message.role.as_str() {
                "system" => formatted.push_str(&format!("<|system|>\n{}\n<|end|>\n", message.content)),
                "user" => formatted.push_str(&format!("<|user|>\n{}\n<|end|>\n", message.content)),
                "assistant" => {
                    formatted.push_str(&format!("<|assistant|>\n{}\n<|end|>\n", message.content))
                }
                _ => {}
            }
        }
        formatted.push_str("<|assistant|>\n");
        formatted
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(LIVENESS_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, RagError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": Self::format_prompt(messages),
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_tokens,
            },
        });

        let res = self
            .client
            .post(&url)
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

        payload["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RagError::generation(self.name(), "response field missing"))
    }
}
