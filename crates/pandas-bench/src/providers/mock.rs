use super::base::{Completion, Provider, ProviderUsage, Usage};
use super::configs::ModelConfig;
use super::errors::ProviderError;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    model_config: ModelConfig,
    responses: Mutex<Vec<String>>,
    responder: Option<Responder>,
    failures: Mutex<Vec<ProviderError>>,
    prompts: Mutex<Vec<String>>,
    usage: Usage,
}

impl MockProvider {
    /// Create a mock that replies with `responses` in order, then with empty text
    pub fn new(model_name: &str, responses: Vec<String>) -> Self {
        Self {
            model_config: ModelConfig::new(model_name.to_string()),
            responses: Mutex::new(responses),
            responder: None,
            failures: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            usage: Usage::new(Some(1), Some(1), Some(2)),
        }
    }

    /// Create a mock whose reply is computed from the prompt
    pub fn with_responder(
        model_name: &str,
        responder: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        let mut provider = Self::new(model_name, Vec::new());
        provider.responder = Some(Box::new(responder));
        provider
    }

    /// Errors returned, in order, before any response is produced
    pub fn with_failures(self, failures: Vec<ProviderError>) -> Self {
        *self.failures.lock().unwrap_or_else(PoisonError::into_inner) = failures;
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Every prompt received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn get_model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    async fn complete(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<(Completion, ProviderUsage), ProviderError> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(prompt.to_string());

        {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        let text = match &self.responder {
            Some(responder) => responder(prompt),
            None => {
                let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
                if responses.is_empty() {
                    String::new()
                } else {
                    responses.remove(0)
                }
            }
        };

        Ok((
            Completion::new(text, Some("stop".to_string())),
            ProviderUsage::new(self.model_id(), self.usage),
        ))
    }
}
