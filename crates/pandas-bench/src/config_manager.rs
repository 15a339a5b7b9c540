use crate::bench_config::EvalConfig;
use crate::errors::{BenchError, BenchResult};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Holds the run configuration together with the environment providers read
/// their API keys and hosts from
pub struct ConfigManager {
    config: EvalConfig,
    env_vars: HashMap<String, String>,
}

impl ConfigManager {
    /// Create a ConfigManager, loading the process environment and the
    /// config's env_file
    pub fn new(config: EvalConfig) -> BenchResult<Self> {
        let mut manager = Self {
            config,
            env_vars: HashMap::new(),
        };
        manager.load_environment_variables()?;
        Ok(manager)
    }

    /// Create a ConfigManager with an explicit environment, ignoring the process one
    pub fn with_env(config: EvalConfig, env_vars: HashMap<String, String>) -> Self {
        Self { config, env_vars }
    }

    /// Get a reference to the underlying configuration
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    fn load_environment_variables(&mut self) -> BenchResult<()> {
        self.env_vars.extend(env::vars());

        if let Some(env_file) = &self.config.env_file {
            // Environment file variables override system environment
            let file_vars = Self::parse_env_file(env_file)?;
            self.env_vars.extend(file_vars);
        }

        Ok(())
    }

    fn parse_env_file(path: &Path) -> BenchResult<Vec<(String, String)>> {
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            BenchError::ConfigError(format!("Failed to open env file at {:?}: {}", path, e))
        })?;

        iter.map(|item| {
            item.map_err(|e| {
                BenchError::ConfigError(format!("Invalid entry in env file {:?}: {}", path, e))
            })
        })
        .collect()
    }

    /// Get specific environment variable
    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env_vars.get(key).filter(|v| !v.is_empty())
    }

    /// Get an environment variable or fail with a message naming it
    pub fn require_env(&self, key: &str) -> BenchResult<&String> {
        self.get_env(key).ok_or_else(|| {
            BenchError::ConfigError(format!(
                "{} is not set. Export it or add it to an env file",
                key
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_env_file_overrides_process_env() {
        let dir = tempdir().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(
            &env_file,
            "# keys\nOPENAI_API_KEY=\"from-file\"\nANTHROPIC_HOST=http://localhost:9\n",
        )
        .unwrap();

        temp_env::with_var("OPENAI_API_KEY", Some("from-process"), || {
            let config = EvalConfig {
                env_file: Some(env_file.clone()),
                ..Default::default()
            };
            let manager = ConfigManager::new(config).unwrap();
            assert_eq!(manager.get_env("OPENAI_API_KEY").unwrap(), "from-file");
            assert_eq!(
                manager.get_env("ANTHROPIC_HOST").unwrap(),
                "http://localhost:9"
            );
        });
    }

    #[test]
    #[serial]
    fn test_process_env_is_loaded() {
        temp_env::with_var("PANDAS_BENCH_TEST_VAR", Some("value"), || {
            let manager = ConfigManager::new(EvalConfig::default()).unwrap();
            assert_eq!(manager.get_env("PANDAS_BENCH_TEST_VAR").unwrap(), "value");
        });
    }

    #[test]
    fn test_missing_env_file() {
        let config = EvalConfig {
            env_file: Some("/nonexistent/.env".into()),
            ..Default::default()
        };
        assert!(matches!(
            ConfigManager::new(config),
            Err(BenchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_require_env_treats_empty_as_missing() {
        let manager = ConfigManager::with_env(
            EvalConfig::default(),
            HashMap::from([("OPENAI_API_KEY".to_string(), String::new())]),
        );
        assert!(manager.require_env("OPENAI_API_KEY").is_err());
    }
}
