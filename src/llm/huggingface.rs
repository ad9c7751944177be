use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::GenerationProvider;
use super::types::{ChatMessage, GenerationOptions};
use crate::errors::RagError;

/// HuggingFace Inference API. Available whenever an API key is configured.
#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    api_key: String,
    api_url: String,
    client: Client,
}

impl HuggingFaceProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_url: format!("https://api-inference.huggingface.co/models/{model}"),
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
impl GenerationProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, RagError> {
        let body = json!({
            "inputs": Self::format_prompt(messages),
            "parameters": {
                "max_new_tokens": options.max_tokens,
                "temperature": options.temperature,
                "do_sample": true,
            },
        });

        let res = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
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

        payload[0]["generated_text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RagError::generation(self.name(), "generated_text missing"))
    }
}
