//! Bridge types for interoperability with the `llm` crate.

use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;
use llm::LLMProvider;
use tokio_util::sync::CancellationToken;

use super::completion::{CompletionBackend, CompletionRequest};
use super::error::{RunError, StoreError};
use crate::core::config::ProviderSpec;

/// [`CompletionBackend`] over any provider the `llm` crate speaks.
///
/// The provider itself is built per request, because the request carries
/// the sampling parameters and system instruction and those are fixed at
/// build time in the `llm` builder.
pub struct LlmBackend {
    backend: LLMBackend,
    default_model: String,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl LlmBackend {
    /// A backend with no credentials attached; suitable for local
    /// providers like Ollama.
    pub fn new(backend: LLMBackend, default_model: impl Into<String>) -> Self {
        Self {
            backend,
            default_model: default_model.into(),
            api_key: None,
            base_url: None,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Build from a configured provider, resolving its API key from the
    /// environment.
    pub fn from_spec(name: &str, spec: &ProviderSpec) -> Result<Self, RunError> {
        let api_key = spec
            .resolve_api_key(name)
            .map_err(StoreError::Configuration)?;
        let mut backend = Self::new(spec.backend.clone(), spec.model.clone());
        if let Some(key) = api_key {
            backend = backend.api_key(key);
        }
        if let Some(url) = &spec.base_url {
            backend = backend.base_url(url.clone());
        }
        Ok(backend)
    }

    fn build_provider(
        &self,
        request: &CompletionRequest,
    ) -> Result<Box<dyn LLMProvider>, RunError> {
        let model = if request.config.model.is_empty() {
            self.default_model.clone()
        } else {
            request.config.model.clone()
        };

        let mut builder = LLMBuilder::new()
            .backend(self.backend.clone())
            .model(model)
            .temperature(request.config.temperature)
            .max_tokens(request.config.max_tokens)
            .top_p(request.config.top_p)
            .top_k(request.config.top_k);

        if let Some(key) = &self.api_key {
            builder = builder.api_key(key.clone());
        }
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url.clone());
        }
        if let Some(system) = &request.system_instruction {
            builder = builder.system(system.clone());
        }

        Ok(builder.build()?)
    }

    fn build_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(request.examples.len() * 2 + 1);
        for example in &request.examples {
            messages.push(ChatMessage::user().content(&example.input).build());
            messages.push(ChatMessage::assistant().content(&example.output).build());
        }
        messages.push(ChatMessage::user().content(&request.prompt).build());
        messages
    }
}

#[async_trait]
impl CompletionBackend for LlmBackend {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, RunError> {
        let provider = self.build_provider(request)?;
        let messages = Self::build_messages(request);

        tokio::select! {
            _ = cancel.cancelled() => Err(RunError::Cancelled),
            response = provider.chat(&messages) => {
                Ok(response?.text().unwrap_or_default())
            }
        }
    }
}
