use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use pandas_bench::bench_config::LogFormat;
use pandas_bench::{ConfigManager, EvalConfig, EvalRunner};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Default)]
pub struct EvalArgs {
    /// Task to run (see `pandas-bench list`)
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    #[arg(
        short,
        long,
        help = "Model under test (e.g., 'openai/o3-mini-2025-04-16')",
        long_help = "Model under test as provider/model. Supported providers: openai, anthropic, mock."
    )]
    pub model: Option<String>,

    #[arg(long, help = "Grader model as provider/model")]
    pub grader_model: Option<String>,

    #[arg(long, value_name = "DIR", help = "Directory for evaluation logs")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, help = "Log format (only 'json')")]
    pub log_format: Option<LogFormat>,

    #[arg(long, help = "Thinking budget for models that support it")]
    pub reasoning_tokens: Option<i32>,

    #[arg(long, help = "Reasoning effort for OpenAI reasoning models (low, medium, high)")]
    pub reasoning_effort: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<i32>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long, help = "Evaluate only the first N pandas samples")]
    pub limit: Option<usize>,

    #[arg(long, help = "Maximum samples in flight")]
    pub max_connections: Option<usize>,

    #[arg(
        long,
        value_name = "LOCATION",
        help = "Dataset path, URL or hf://datasets/... location"
    )]
    pub dataset: Option<String>,

    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "TOML file with eval options",
        long_help = "TOML file with eval options. Flags given on the command line take precedence."
    )]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Dotenv file with API keys")]
    pub env_file: Option<PathBuf>,
}

impl EvalArgs {
    /// Load the config file, if any, then apply flags on top
    pub fn into_config(self) -> Result<EvalConfig> {
        let mut config = match &self.config {
            Some(path) => EvalConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => EvalConfig::default(),
        };

        if let Some(task) = self.task {
            config.task = task;
        }
        if self.model.is_some() {
            config.model = self.model;
        }
        if self.grader_model.is_some() {
            config.grader_model = self.grader_model;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = log_dir;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if self.reasoning_tokens.is_some() {
            config.reasoning_tokens = self.reasoning_tokens;
        }
        if self.reasoning_effort.is_some() {
            config.reasoning_effort = self.reasoning_effort;
        }
        if self.max_tokens.is_some() {
            config.max_tokens = self.max_tokens;
        }
        if self.temperature.is_some() {
            config.temperature = self.temperature;
        }
        if self.limit.is_some() {
            config.limit = self.limit;
        }
        if let Some(max_connections) = self.max_connections {
            config.max_connections = max_connections;
        }
        if self.dataset.is_some() {
            config.dataset = self.dataset;
        }
        if self.env_file.is_some() {
            config.env_file = self.env_file;
        }

        Ok(config)
    }
}

pub async fn handle_eval(args: EvalArgs) -> Result<()> {
    let config = args.into_config()?;
    let manager = ConfigManager::new(config)?;
    let runner = EvalRunner::new(&manager)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message(format!("Evaluating {}", manager.config().task));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = runner.run().await;
    spinner.finish_and_clear();
    let (path, log) = outcome?;

    if let Some(results) = &log.results {
        println!(
            "{} {} on {}: accuracy {:.3} (stderr {:.3}, {}/{} samples scored)",
            style("✔").green(),
            log.eval.task,
            style(&log.eval.model).cyan(),
            results.accuracy,
            results.stderr,
            results.completed_samples,
            results.total_samples
        );
    }
    if let Some(error) = &log.error {
        println!("{} {}", style("Run failed:").red(), error);
    }
    println!("Log written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eval.toml");
        fs::write(
            &path,
            "task = \"ds_pandas_partial\"\nmodel = \"openai/gpt-4o\"\nlimit = 5\nmax_connections = 4\n",
        )
        .unwrap();

        let config = EvalArgs {
            model: Some("anthropic/claude-3-7-sonnet-latest".to_string()),
            reasoning_tokens: Some(2048),
            config: Some(path),
            ..EvalArgs::default()
        }
        .into_config()
        .unwrap();

        assert_eq!(config.task, "ds_pandas_partial");
        assert_eq!(config.model.as_deref(), Some("anthropic/claude-3-7-sonnet-latest"));
        assert_eq!(config.limit, Some(5));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.reasoning_tokens, Some(2048));
    }

    #[test]
    fn test_missing_config_file_fails() {
        let args = EvalArgs {
            config: Some(PathBuf::from("/nonexistent/eval.toml")),
            ..EvalArgs::default()
        };
        assert!(args.into_config().is_err());
    }
}
