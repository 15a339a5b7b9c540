use serde::{Deserialize, Serialize};

/// Configuration for model-specific generation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// The name of the model to use, without the provider prefix
    pub model_name: String,
    /// Optional temperature setting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Optional maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,
    /// Token budget for extended thinking, on providers that support it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<i32>,
    /// Reasoning effort hint for OpenAI reasoning models (`low`, `medium`, `high`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

impl ModelConfig {
    pub fn new(model_name: String) -> Self {
        Self {
            model_name,
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temp: Option<f32>) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: Option<i32>) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_reasoning_tokens(mut self, tokens: Option<i32>) -> Self {
        self.reasoning_tokens = tokens;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort;
        self
    }

    /// OpenAI o-series and gpt-5 models reject `temperature` and accept `reasoning_effort`
    pub fn is_openai_reasoning_model(&self) -> bool {
        let name = self.model_name.as_str();
        name.starts_with('o') && name.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
            || name.starts_with("gpt-5")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ModelConfig::new("claude-sonnet-4-20250514".to_string())
            .with_temperature(Some(0.5))
            .with_max_tokens(Some(2048))
            .with_reasoning_tokens(Some(1024));

        assert_eq!(config.model_name, "claude-sonnet-4-20250514");
        assert_eq!(config.temperature, Some(0.5));
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.reasoning_tokens, Some(1024));
        assert_eq!(config.reasoning_effort, None);
    }

    #[test]
    fn test_reasoning_model_detection() {
        assert!(ModelConfig::new("o3-mini-2025-04-16".to_string()).is_openai_reasoning_model());
        assert!(ModelConfig::new("o1".to_string()).is_openai_reasoning_model());
        assert!(ModelConfig::new("gpt-5-mini".to_string()).is_openai_reasoning_model());
        assert!(!ModelConfig::new("gpt-4o".to_string()).is_openai_reasoning_model());
        assert!(!ModelConfig::new("ollama".to_string()).is_openai_reasoning_model());
    }
}
