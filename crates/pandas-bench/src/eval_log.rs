//! Typed JSON evaluation logs.
//!
//! The report side reads logs as untyped JSON (see `dataframe_handler`) so it
//! tolerates logs with missing fields. These types describe what the eval
//! runner writes.

use crate::dataset::SampleId;
use crate::errors::{BenchError, BenchResult};
use crate::providers::Usage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const LOG_VERSION: u32 = 2;
pub const MODEL_GRADED_QA: &str = "model_graded_qa";

/// Graded outcome of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreValue {
    #[serde(rename = "C")]
    Correct,
    #[serde(rename = "P")]
    PartiallyCorrect,
    #[serde(rename = "I")]
    Incorrect,
}

impl ScoreValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreValue::Correct => "C",
            ScoreValue::PartiallyCorrect => "P",
            ScoreValue::Incorrect => "I",
        }
    }

    /// Numeric value used for accuracy
    pub fn as_f64(&self) -> f64 {
        match self {
            ScoreValue::Correct => 1.0,
            ScoreValue::PartiallyCorrect => 0.5,
            ScoreValue::Incorrect => 0.0,
        }
    }
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreValue {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "C" => Ok(ScoreValue::Correct),
            "P" => Ok(ScoreValue::PartiallyCorrect),
            "I" => Ok(ScoreValue::Incorrect),
            other => Err(BenchError::Other(format!("Unknown score value '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelUsage {
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<i64>,
}

impl From<Usage> for ModelUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            reasoning_tokens: usage.reasoning_tokens,
        }
    }
}

impl From<ModelUsage> for Usage {
    fn from(usage: ModelUsage) -> Self {
        Usage::new(
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens,
        )
        .with_reasoning_tokens(usage.reasoning_tokens)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelOutput {
    pub model: String,
    pub completion: String,
    pub usage: ModelUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: ScoreValue,
    /// The answer that was graded
    pub answer: String,
    /// Grader output
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSample {
    pub id: SampleId,
    pub epoch: u32,
    pub input: String,
    pub target: String,
    pub metadata: Value,
    pub output: ModelOutput,
    pub scores: BTreeMap<String, Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvalSample {
    pub fn score(&self) -> Option<&Score> {
        self.scores.get(MODEL_GRADED_QA)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalDataset {
    pub name: String,
    pub location: String,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvalRunConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub partial_credit: bool,
    pub max_connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSpec {
    pub run_id: String,
    pub task: String,
    pub task_version: u32,
    pub created: DateTime<Utc>,
    pub model: String,
    pub grader_model: String,
    pub dataset: EvalDataset,
    pub config: EvalRunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResults {
    pub total_samples: usize,
    pub completed_samples: usize,
    pub accuracy: f64,
    pub stderr: f64,
}

impl EvalResults {
    /// Mean score and its standard error over the graded samples. Samples
    /// that failed carry no score and are left out.
    pub fn from_samples(samples: &[EvalSample]) -> Self {
        let values: Vec<f64> = samples
            .iter()
            .filter(|s| s.error.is_none())
            .filter_map(|s| s.score().map(|score| score.value.as_f64()))
            .collect();
        let n = values.len();
        let accuracy = if n == 0 {
            0.0
        } else {
            values.iter().sum::<f64>() / n as f64
        };
        let stderr = if n < 2 {
            0.0
        } else {
            let variance = values
                .iter()
                .map(|v| (v - accuracy).powi(2))
                .sum::<f64>()
                / (n - 1) as f64;
            variance.sqrt() / (n as f64).sqrt()
        };

        Self {
            total_samples: samples.len(),
            completed_samples: n,
            accuracy,
            stderr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalStats {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub model_usage: BTreeMap<String, ModelUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalLog {
    pub version: u32,
    pub status: EvalStatus,
    pub eval: EvalSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<EvalResults>,
    pub stats: EvalStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub samples: Vec<EvalSample>,
}

impl EvalLog {
    /// `<timestamp>_<task>_<run_id>.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.eval.created.format("%Y-%m-%dT%H-%M-%S"),
            self.eval.task,
            self.eval.run_id
        )
    }
}

/// Write `log` into `log_dir`, creating the directory, and return the file path
pub fn write_eval_log(log: &EvalLog, log_dir: &Path) -> BenchResult<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log.file_name());

    // Write through a temporary file so readers never see a partial log
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, serde_json::to_string_pretty(log)?)?;
    fs::rename(&temp_path, &path)?;

    tracing::info!("Wrote evaluation log to {}", path.display());
    Ok(path)
}

pub fn read_eval_log(path: &Path) -> BenchResult<EvalLog> {
    if !path.is_file() {
        return Err(BenchError::FileNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
