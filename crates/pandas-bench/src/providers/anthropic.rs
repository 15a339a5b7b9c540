use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::base::{Completion, Provider, ProviderUsage, Usage};
use super::configs::ModelConfig;
use super::errors::ProviderError;
use super::utils::{emit_debug_trace, get_i64, get_model, handle_response};

pub const ANTHROPIC_DEFAULT_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: i32 = 4096;

#[derive(Debug, serde::Serialize)]
pub struct AnthropicProvider {
    #[serde(skip)]
    client: Client,
    host: String,
    #[serde(skip)]
    api_key: String,
    model: ModelConfig,
}

impl AnthropicProvider {
    pub fn new(host: String, api_key: String, model: ModelConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self {
            client,
            host,
            api_key,
            model,
        })
    }

    fn create_request(&self, system: &str, prompt: &str) -> Value {
        let mut max_tokens = self.model.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.model.model_name));
        payload.insert(
            "messages".to_string(),
            json!([{
                "role": "user",
                "content": [{"type": "text", "text": prompt}]
            }]),
        );

        if !system.is_empty() {
            payload.insert("system".to_string(), json!(system));
        }

        match self.model.reasoning_tokens {
            Some(budget) if budget > 0 => {
                // The thinking budget counts against max_tokens, and thinking
                // requests reject a custom temperature.
                if max_tokens <= budget {
                    max_tokens = budget + DEFAULT_MAX_TOKENS;
                }
                payload.insert(
                    "thinking".to_string(),
                    json!({"type": "enabled", "budget_tokens": budget}),
                );
            }
            _ => {
                if let Some(temp) = self.model.temperature {
                    payload.insert("temperature".to_string(), json!(temp));
                }
            }
        }

        payload.insert("max_tokens".to_string(), json!(max_tokens));
        Value::Object(payload)
    }

    fn parse_response(response: &Value) -> Result<Completion, ProviderError> {
        let content_blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ProviderError::ResponseParseError(
                    "Invalid response format: missing content array".to_string(),
                )
            })?;

        // Thinking blocks are not part of the answer
        let text = content_blocks
            .iter()
            .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        let stop_reason = response
            .get("stop_reason")
            .and_then(|r| r.as_str())
            .map(str::to_string);

        Ok(Completion::new(text, stop_reason))
    }

    pub fn get_usage(data: &Value) -> Usage {
        match data.get("usage") {
            Some(usage) => {
                let input_tokens = get_i64(usage, "input_tokens");
                let output_tokens = get_i64(usage, "output_tokens");
                let total_tokens = match (input_tokens, output_tokens) {
                    (Some(i), Some(o)) => Some(i + o),
                    _ => None,
                };
                Usage::new(input_tokens, output_tokens, total_tokens)
            }
            None => Usage::default(),
        }
    }

    async fn post(&self, payload: &Value) -> Result<Value, ProviderError> {
        let url = format!("{}/v1/messages", self.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(payload)
            .send()
            .await?;

        handle_response(payload, response).await
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn get_model_config(&self) -> &ModelConfig {
        &self.model
    }

    #[tracing::instrument(skip(self, system, prompt), fields(model = %self.model.model_name))]
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<(Completion, ProviderUsage), ProviderError> {
        let payload = self.create_request(system, prompt);
        let response = self.post(&payload).await?;

        let completion = Self::parse_response(&response)?;
        let usage = Self::get_usage(&response);
        let model = format!("{}/{}", self.name(), get_model(&response));
        emit_debug_trace(&self.model, &payload, &response, &usage);
        Ok((completion, ProviderUsage::new(model, usage)))
    }
}
