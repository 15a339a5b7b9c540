use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::base::{Completion, Provider, ProviderUsage, Usage};
use super::configs::ModelConfig;
use super::errors::ProviderError;
use super::utils::{emit_debug_trace, get_i64, get_model, handle_response};

pub const OPEN_AI_DEFAULT_HOST: &str = "https://api.openai.com";

#[derive(Debug, serde::Serialize)]
pub struct OpenAiProvider {
    #[serde(skip)]
    client: Client,
    host: String,
    #[serde(skip)]
    api_key: String,
    model: ModelConfig,
}

impl OpenAiProvider {
    pub fn new(host: String, api_key: String, model: ModelConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self {
            client,
            host,
            api_key,
            model,
        })
    }

    fn create_request(&self, system: &str, prompt: &str) -> Value {
        let reasoning = self.model.is_openai_reasoning_model();
        let mut messages = Vec::new();
        if !system.is_empty() {
            // Reasoning models take instructions through the developer role
            let role = if reasoning { "developer" } else { "system" };
            messages.push(json!({"role": role, "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.model.model_name));
        payload.insert("messages".to_string(), json!(messages));

        if let Some(tokens) = self.model.max_tokens {
            payload.insert("max_completion_tokens".to_string(), json!(tokens));
        }
        if reasoning {
            if let Some(effort) = &self.model.reasoning_effort {
                payload.insert("reasoning_effort".to_string(), json!(effort));
            }
        } else if let Some(temp) = self.model.temperature {
            payload.insert("temperature".to_string(), json!(temp));
        }

        Value::Object(payload)
    }

    fn parse_response(response: &Value) -> Result<Completion, ProviderError> {
        let choice = response
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| {
                ProviderError::ResponseParseError("missing choices in response".to_string())
            })?;
        let text = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        let stop_reason = choice
            .get("finish_reason")
            .and_then(|r| r.as_str())
            .map(str::to_string);
        Ok(Completion::new(text, stop_reason))
    }

    pub fn get_usage(data: &Value) -> Usage {
        match data.get("usage") {
            Some(usage) => {
                let reasoning = usage
                    .get("completion_tokens_details")
                    .and_then(|d| get_i64(d, "reasoning_tokens"));
                Usage::new(
                    get_i64(usage, "prompt_tokens"),
                    get_i64(usage, "completion_tokens"),
                    get_i64(usage, "total_tokens"),
                )
                .with_reasoning_tokens(reasoning)
            }
            None => Usage::default(),
        }
    }

    async fn post(&self, payload: &Value) -> Result<Value, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(payload)
            .send()
            .await?;

        handle_response(payload, response).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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

        if let Some(error) = response.get("error") {
            return Err(ProviderError::RequestFailed(format!(
                "OpenAI API error: {}",
                error
            )));
        }

        let completion = Self::parse_response(&response)?;
        let usage = Self::get_usage(&response);
        let model = format!("{}/{}", self.name(), get_model(&response));
        emit_debug_trace(&self.model, &payload, &response, &usage);
        Ok((completion, ProviderUsage::new(model, usage)))
    }
}
