use super::anthropic::{AnthropicProvider, ANTHROPIC_DEFAULT_HOST};
use super::base::Provider;
use super::configs::ModelConfig;
use super::mock::MockProvider;
use super::openai::{OpenAiProvider, OPEN_AI_DEFAULT_HOST};
use crate::config_manager::ConfigManager;
use crate::errors::{BenchError, BenchResult};
use std::sync::Arc;

pub fn providers() -> Vec<&'static str> {
    vec!["anthropic", "mock", "openai"]
}

/// Split a `provider/model` identifier. The model part may itself contain `/`.
pub fn parse_model_id(model_id: &str) -> BenchResult<(&str, &str)> {
    match model_id.split_once('/') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => Err(BenchError::ConfigError(format!(
            "Invalid model '{}', expected provider/model",
            model_id
        ))),
    }
}

/// Build a provider for `model_id`. `model` supplies generation settings;
/// its model_name is replaced by the model part of the identifier.
pub fn create(
    model_id: &str,
    model: ModelConfig,
    env: &ConfigManager,
) -> BenchResult<Arc<dyn Provider>> {
    let (provider, model_name) = parse_model_id(model_id)?;
    let model = ModelConfig {
        model_name: model_name.to_string(),
        ..model
    };

    match provider {
        "openai" => {
            let api_key = env.require_env("OPENAI_API_KEY")?.clone();
            let host = env
                .get_env("OPENAI_HOST")
                .cloned()
                .unwrap_or_else(|| OPEN_AI_DEFAULT_HOST.to_string());
            Ok(Arc::new(OpenAiProvider::new(host, api_key, model)?))
        }
        "anthropic" => {
            let api_key = env.require_env("ANTHROPIC_API_KEY")?.clone();
            let host = env
                .get_env("ANTHROPIC_HOST")
                .cloned()
                .unwrap_or_else(|| ANTHROPIC_DEFAULT_HOST.to_string());
            Ok(Arc::new(AnthropicProvider::new(host, api_key, model)?))
        }
        "mock" => Ok(Arc::new(MockProvider::new(&model.model_name, Vec::new()))),
        _ => Err(BenchError::ConfigError(format!(
            "Unknown provider: {} (available: {})",
            provider,
            providers().join(", ")
        ))),
    }
}
