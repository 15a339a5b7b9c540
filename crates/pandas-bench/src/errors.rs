use crate::providers::errors::ProviderError;
use polars::error::PolarsError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for evaluation runs and score reporting
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Failed to parse configuration: {0}")]
    ConfigError(String),

    #[error("Failed to load dataset: {0}")]
    DatasetError(String),

    #[error("Model provider error: {0}")]
    ProviderError(#[from] ProviderError),

    #[error("Failed to run evaluation: {0}")]
    EvaluationError(String),

    #[error("Failed to process results: {0}")]
    ResultsProcessingError(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("DataFrame error: {0}")]
    DataFrameError(String),

    #[error("Chart rendering error: {0}")]
    ChartError(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for benchmark operations
pub type BenchResult<T> = Result<T, BenchError>;

/// Utility functions for working with BenchError
pub mod util {
    use super::*;
    use std::path::Path;

    /// Check if a directory exists, returning a FileNotFound error if it doesn't
    pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> BenchResult<()> {
        let path_ref = path.as_ref();
        if !path_ref.is_dir() {
            return Err(BenchError::FileNotFound(path_ref.to_path_buf()));
        }
        Ok(())
    }

    /// Convert a generic error to a BenchError
    pub fn to_bench_error<E: fmt::Display>(e: E, context: &str) -> BenchError {
        BenchError::Other(format!("{}: {}", context, e))
    }
}

impl From<anyhow::Error> for BenchError {
    fn from(err: anyhow::Error) -> Self {
        BenchError::Other(err.to_string())
    }
}

impl From<PolarsError> for BenchError {
    fn from(err: PolarsError) -> Self {
        BenchError::DataFrameError(err.to_string())
    }
}

impl From<toml::de::Error> for BenchError {
    fn from(err: toml::de::Error) -> Self {
        BenchError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempdir().unwrap();
        assert!(util::ensure_dir_exists(dir.path()).is_ok());

        let missing = dir.path().join("missing");
        match util::ensure_dir_exists(&missing) {
            Err(BenchError::FileNotFound(path)) => assert_eq!(path, missing),
            other => panic!("Expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: BenchError = ProviderError::RateLimitExceeded("slow down".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Model provider error: Rate limit exceeded: slow down"
        );
    }
}
