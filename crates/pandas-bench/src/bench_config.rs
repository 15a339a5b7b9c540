use crate::errors::{BenchError, BenchResult};
use crate::providers::base::RetryConfig;
use crate::providers::configs::ModelConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_TASK: &str = "ds_pandas";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// On-disk format of evaluation logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
}

impl FromStr for LogFormat {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            other => Err(BenchError::ConfigError(format!(
                "Unsupported log format '{}', only 'json' is available",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Options for one evaluation run, loadable from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Registered task name
    pub task: String,
    /// Model under test, as `provider/model`
    pub model: Option<String>,
    /// Grader model, as `provider/model`. The task default applies when unset.
    pub grader_model: Option<String>,
    /// Dataset location overriding the task's own
    pub dataset: Option<String>,
    pub log_dir: PathBuf,
    pub log_format: LogFormat,
    pub reasoning_tokens: Option<i32>,
    pub reasoning_effort: Option<String>,
    pub max_tokens: Option<i32>,
    pub temperature: Option<f32>,
    /// Evaluate only the first N samples after filtering
    pub limit: Option<usize>,
    /// Upper bound on samples in flight
    pub max_connections: usize,
    pub max_retries: u32,
    /// Dotenv file with API keys, overriding the process environment
    pub env_file: Option<PathBuf>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            task: DEFAULT_TASK.to_string(),
            model: None,
            grader_model: None,
            dataset: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_format: LogFormat::Json,
            reasoning_tokens: None,
            reasoning_effort: None,
            max_tokens: None,
            temperature: None,
            limit: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_retries: RetryConfig::default().max_retries,
            env_file: None,
        }
    }
}

impl EvalConfig {
    pub fn from_string(config: String) -> BenchResult<Self> {
        let config: EvalConfig = toml::from_str(&config)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> BenchResult<Self> {
        if !path.is_file() {
            return Err(BenchError::FileNotFound(path.to_path_buf()));
        }
        Self::from_string(fs::read_to_string(path)?)
    }

    pub fn to_string(&self) -> BenchResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BenchError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Check the options that would otherwise fail deep inside a run
    pub fn validate(&self) -> BenchResult<()> {
        if self.model.as_deref().map_or(true, str::is_empty) {
            return Err(BenchError::ConfigError(
                "No model specified. Pass --model provider/model".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(BenchError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if let Some(effort) = &self.reasoning_effort {
            if !["low", "medium", "high"].contains(&effort.as_str()) {
                return Err(BenchError::ConfigError(format!(
                    "reasoning_effort must be one of low, medium, high (got '{}')",
                    effort
                )));
            }
        }
        if matches!(self.reasoning_tokens, Some(tokens) if tokens <= 0) {
            return Err(BenchError::ConfigError(
                "reasoning_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Generation settings for the model under test
    pub fn solver_model_config(&self, model_name: &str) -> ModelConfig {
        ModelConfig::new(model_name.to_string())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_reasoning_tokens(self.reasoning_tokens)
            .with_reasoning_effort(self.reasoning_effort.clone())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            ..RetryConfig::default()
        }
    }
}
