use crate::dataset::Sample;
use crate::errors::BenchResult;
use crate::eval_log::ModelOutput;
use crate::providers::{complete_with_retry, Provider, RetryConfig};
use async_trait::async_trait;

/// Produces the model's answer to one sample
#[async_trait]
pub trait Solver: Send + Sync {
    async fn solve(
        &self,
        provider: &dyn Provider,
        sample: &Sample,
        retry: &RetryConfig,
    ) -> BenchResult<ModelOutput>;
}

/// Send the sample input as a single user turn and keep the reply
pub struct Generate {
    system_prompt: Option<String>,
}

impl Generate {
    pub fn new(system_prompt: Option<String>) -> Self {
        Self { system_prompt }
    }
}

#[async_trait]
impl Solver for Generate {
    async fn solve(
        &self,
        provider: &dyn Provider,
        sample: &Sample,
        retry: &RetryConfig,
    ) -> BenchResult<ModelOutput> {
        let system = self.system_prompt.as_deref().unwrap_or_default();
        let (completion, usage) = complete_with_retry(provider, system, &sample.input, retry).await?;

        tracing::debug!(
            "Sample {} answered by {} ({:?} total tokens)",
            sample.id,
            usage.model,
            usage.usage.total_tokens
        );

        // usage.model is the API's name; the output keeps the requested id
        Ok(ModelOutput {
            model: provider.model_id(),
            completion: completion.text,
            usage: usage.usage.into(),
            stop_reason: completion.stop_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SampleId;
    use crate::providers::mock::MockProvider;
    use crate::providers::Usage;
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_returns_model_output() {
        let provider = MockProvider::new("solver", vec!["df.dropna()".to_string()])
            .with_usage(Usage::new(Some(40), Some(10), Some(50)));
        let sample = Sample {
            id: SampleId::Number(1),
            input: "Drop rows with missing values".to_string(),
            target: "df = df.dropna()".to_string(),
            metadata: json!({}),
        };

        let output = Generate::new(None)
            .solve(&provider, &sample, &RetryConfig::default())
            .await
            .unwrap();

        assert_eq!(output.model, "mock/solver");
        assert_eq!(output.completion, "df.dropna()");
        assert_eq!(output.usage.prompt_tokens, Some(40));
        assert_eq!(output.usage.completion_tokens, Some(10));
        assert_eq!(output.usage.total_tokens, Some(50));
        assert_eq!(provider.prompts(), vec!["Drop rows with missing values"]);
    }
}
