use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use super::configs::ModelConfig;
use super::errors::ProviderError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub model: String,
    pub usage: Usage,
}

impl ProviderUsage {
    pub fn new(model: String, usage: Usage) -> Self {
        Self { model, usage }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Usage {
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<i64>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i64>,
        output_tokens: Option<i64>,
        total_tokens: Option<i64>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            reasoning_tokens: None,
        }
    }

    pub fn with_reasoning_tokens(mut self, tokens: Option<i64>) -> Self {
        self.reasoning_tokens = tokens;
        self
    }

    /// Field-wise sum, where a missing value on one side keeps the other
    pub fn add(&self, other: &Usage) -> Usage {
        fn sum(a: Option<i64>, b: Option<i64>) -> Option<i64> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a + b),
                (a, None) => a,
                (None, b) => b,
            }
        }
        Usage {
            input_tokens: sum(self.input_tokens, other.input_tokens),
            output_tokens: sum(self.output_tokens, other.output_tokens),
            total_tokens: sum(self.total_tokens, other.total_tokens),
            reasoning_tokens: sum(self.reasoning_tokens, other.reasoning_tokens),
        }
    }
}

/// Text of a single model completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Completion {
    pub text: String,
    pub stop_reason: Option<String>,
}

impl Completion {
    pub fn new(text: impl Into<String>, stop_reason: Option<String>) -> Self {
        Self {
            text: text.into(),
            stop_reason,
        }
    }
}

/// Base trait for model providers (OpenAI, Anthropic, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider prefix used in `provider/model` identifiers
    fn name(&self) -> &str;

    /// Get the model configuration
    fn get_model_config(&self) -> &ModelConfig;

    /// Generate a single completion for `prompt`
    ///
    /// # Arguments
    /// * `system` - The system prompt, ignored when empty
    /// * `prompt` - The user message
    ///
    /// # Returns
    /// The completion and the usage reported by the provider
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<(Completion, ProviderUsage), ProviderError>;

    /// The `provider/model` identifier written to logs
    fn model_id(&self) -> String {
        format!("{}/{}", self.name(), self.get_model_config().model_name)
    }
}

/// Backoff settings for retryable provider failures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30000,
        }
    }
}

/// Call `provider.complete`, retrying rate limits and server errors with
/// exponential backoff.
pub async fn complete_with_retry(
    provider: &dyn Provider,
    system: &str,
    prompt: &str,
    retry: &RetryConfig,
) -> Result<(Completion, ProviderUsage), ProviderError> {
    let mut attempts = 0;
    let mut backoff_ms = retry.initial_backoff_ms;

    loop {
        attempts += 1;

        match provider.complete(system, prompt).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !err.is_retryable() || attempts > retry.max_retries {
                    return Err(err);
                }

                tracing::warn!(
                    "{} request failed (attempt {}/{}), retrying in {} ms: {}",
                    provider.model_id(),
                    attempts,
                    retry.max_retries,
                    backoff_ms,
                    err
                );

                sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(retry.max_backoff_ms);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use serde_json::json;

    #[test]
    fn test_usage_serialization() -> anyhow::Result<()> {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        let json_value = serde_json::to_value(usage)?;
        assert_eq!(json_value["input_tokens"], json!(10));
        assert_eq!(json_value["output_tokens"], json!(20));
        assert_eq!(json_value["total_tokens"], json!(30));
        assert!(json_value.get("reasoning_tokens").is_none());
        Ok(())
    }

    #[test]
    fn test_usage_add() {
        let a = Usage::new(Some(10), Some(20), Some(30)).with_reasoning_tokens(Some(5));
        let b = Usage::new(Some(1), None, Some(1));
        let total = a.add(&b);
        assert_eq!(total.input_tokens, Some(11));
        assert_eq!(total.output_tokens, Some(20));
        assert_eq!(total.total_tokens, Some(31));
        assert_eq!(total.reasoning_tokens, Some(5));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_rate_limit() {
        let provider = MockProvider::new("solver", vec![])
            .with_failures(vec![ProviderError::RateLimitExceeded("busy".to_string())]);
        let retry = RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        };

        let (completion, _) = complete_with_retry(&provider, "", "hi", &retry)
            .await
            .unwrap();
        assert_eq!(completion.text, "");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_on_auth_error() {
        let provider = MockProvider::new("solver", vec![])
            .with_failures(vec![ProviderError::Authentication("bad key".to_string())]);

        let result = complete_with_retry(&provider, "", "hi", &RetryConfig::default()).await;
        assert!(matches!(result, Err(ProviderError::Authentication(_))));
        assert_eq!(provider.call_count(), 1);
    }
}
