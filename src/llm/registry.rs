use std::sync::Arc;
use std::time::Duration;

use super::provider::GenerationProvider;
use super::types::{ChatMessage, GenerationOptions};
use super::{AnthropicProvider, HuggingFaceProvider, OllamaProvider, OpenAiProvider};
use crate::config::RagConfig;
use crate::errors::RagError;

/// Holds the interchangeable generation backends.
///
/// Availability is probed at call time and never cached: a provider can go
/// from reachable to unreachable between two requests. The registry never
/// retries and never substitutes a provider inside `generate`; substitution
/// happens only in `resolve`, and only when no provider was requested.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn GenerationProvider>>,
    default_provider: String,
    timeout: Duration,
}

impl ProviderRegistry {
    pub fn new(default_provider: &str, timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            default_provider: default_provider.to_string(),
            timeout,
        }
    }

    /// Build the deployment registry: ollama first, then the hosted APIs.
    pub fn from_config(config: &RagConfig) -> Self {
        let mut registry = Self::new(&config.default_provider, config.generation_timeout);
        registry.register(Arc::new(OllamaProvider::new(
            &config.ollama_base_url,
            &config.ollama_model,
        )));
        registry.register(Arc::new(OpenAiProvider::new(
            &config.openai_api_key,
            &config.openai_model,
        )));
        registry.register(Arc::new(AnthropicProvider::new(
            &config.anthropic_api_key,
            &config.anthropic_model,
        )));
        registry.register(Arc::new(HuggingFaceProvider::new(
            &config.huggingface_api_key,
            &config.huggingface_model,
        )));
        registry
    }

    /// Registration order is preserved; it doubles as fallback order.
    pub fn register(&mut self, provider: Arc<dyn GenerationProvider>) {
        self.providers.push(provider);
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn GenerationProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Probe every registered provider, in registration order.
    pub async fn available_providers(&self) -> Vec<String> {
        let mut available = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                available.push(provider.name().to_string());
            }
        }
        available
    }

    /// Pick a provider for one generation call.
    ///
    /// An explicit request always resolves to its provider regardless of
    /// availability (the availability check happens in `generate`), or fails
    /// with `UnknownProvider`. Without a request: the configured default if
    /// available, else the first available provider, else an error.
    pub async fn resolve(
        &self,
        requested: Option<&str>,
    ) -> Result<Arc<dyn GenerationProvider>, RagError> {
        if let Some(name) = requested {
            return self
                .find(name)
                .cloned()
                .ok_or_else(|| RagError::UnknownProvider(name.to_string()));
        }

        if let Some(default) = self.find(&self.default_provider) {
            if default.is_available().await {
                return Ok(default.clone());
            }
        }

        for provider in &self.providers {
            if provider.is_available().await {
                return Ok(provider.clone());
            }
        }

        Err(RagError::NoProviderAvailable)
    }

    /// Resolve, re-check availability, then dispatch under the timeout
    /// ceiling. A timeout is reported like any other generation failure.
    pub async fn generate(
        &self,
        messages: &[ChatMessage],
        provider_name: Option<&str>,
        options: &GenerationOptions,
    ) -> Result<String, RagError> {
        let provider = self.resolve(provider_name).await?;

        if !provider.is_available().await {
            return Err(RagError::ProviderUnavailable(provider.name().to_string()));
        }

        tracing::debug!(provider = provider.name(), "dispatching generation");
        match tokio::time::timeout(self.timeout, provider.generate(messages, options)).await {
            Ok(result) => result,
            Err(_) => Err(RagError::generation(
                provider.name(),
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct StubProvider {
        name: &'static str,
        available: bool,
        reply: &'static str,
    }

    #[async_trait]
    impl GenerationProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        async fn generate(
            &self,
            _messages: &[ChatMessage],
            _options: &GenerationOptions,
        ) -> Result<String, RagError> {
            Ok(self.reply.to_string())
        }
    }

    fn registry(default: &str, providers: Vec<StubProvider>) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new(default, Duration::from_secs(5));
        for provider in providers {
            registry.register(Arc::new(provider));
        }
        registry
    }

    #[tokio::test]
    async fn available_providers_keep_registration_order() {
        let registry = registry(
            "beta",
            vec![
                StubProvider { name: "alpha", available: true, reply: "a" },
                StubProvider { name: "beta", available: false, reply: "b" },
                StubProvider { name: "gamma", available: true, reply: "g" },
            ],
        );

        assert_eq!(registry.available_providers().await, vec!["alpha", "gamma"]);
    }

    #[tokio::test]
    async fn explicit_request_resolves_even_when_unavailable() {
        let registry = registry(
            "alpha",
            vec![
                StubProvider { name: "alpha", available: true, reply: "a" },
                StubProvider { name: "beta", available: false, reply: "b" },
            ],
        );

        let provider = registry.resolve(Some("beta")).await.unwrap();
        assert_eq!(provider.name(), "beta");
    }

    #[tokio::test]
    async fn explicit_request_for_unknown_provider_fails() {
        let registry = registry("alpha", vec![]);
        let err = registry.resolve(Some("nope")).await.unwrap_err();
        assert!(matches!(err, RagError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn default_falls_back_to_first_available() {
        let registry = registry(
            "beta",
            vec![
                StubProvider { name: "alpha", available: false, reply: "a" },
                StubProvider { name: "beta", available: false, reply: "b" },
                StubProvider { name: "gamma", available: true, reply: "g" },
            ],
        );

        let provider = registry.resolve(None).await.unwrap();
        assert_eq!(provider.name(), "gamma");
    }

    #[tokio::test]
    async fn resolve_fails_when_nothing_is_available() {
        let registry = registry(
            "alpha",
            vec![StubProvider { name: "alpha", available: false, reply: "a" }],
        );

        let err = registry.resolve(None).await.unwrap_err();
        assert!(matches!(err, RagError::NoProviderAvailable));
    }

    #[tokio::test]
    async fn generate_refuses_unavailable_explicit_provider() {
        let registry = registry(
            "alpha",
            vec![
                StubProvider { name: "alpha", available: true, reply: "a" },
                StubProvider { name: "beta", available: false, reply: "b" },
            ],
        );

        let err = registry
            .generate(&[ChatMessage::user("hi")], Some("beta"), &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::ProviderUnavailable(name) if name == "beta"));
    }

    #[tokio::test]
    async fn generate_uses_default_when_no_provider_requested() {
        let registry = registry(
            "beta",
            vec![
                StubProvider { name: "alpha", available: true, reply: "from alpha" },
                StubProvider { name: "beta", available: true, reply: "from beta" },
            ],
        );

        let reply = registry
            .generate(&[ChatMessage::user("hi")], None, &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "from beta");
    }

    #[derive(Debug)]
    struct SlowProvider;

    #[async_trait]
    impl GenerationProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(
            &self,
            _messages: &[ChatMessage],
            _options: &GenerationOptions,
        ) -> Result<String, RagError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn generate_times_out_like_any_other_failure() {
        let mut registry = ProviderRegistry::new("slow", Duration::from_millis(50));
        registry.register(Arc::new(SlowProvider));

        let err = registry
            .generate(&[ChatMessage::user("hi")], None, &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Generation { provider, .. } if provider == "slow"));
    }
}
