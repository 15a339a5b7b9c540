//! Benchmark samples and the JSONL loader that produces them.

use crate::errors::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// The DS-1000 test split on the Hugging Face hub
pub const DS1000_LOCATION: &str = "hf://datasets/xlangai/DS-1000/test.jsonl";
/// Value of `metadata.library` on pandas problems
pub const PANDAS_LIBRARY: &str = "Pandas";

const HF_PREFIX: &str = "hf://datasets/";
const HF_RESOLVE_BASE: &str = "https://huggingface.co/datasets";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleId::Number(n) => write!(f, "{}", n),
            SampleId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One benchmark unit: a prompt, the reference answer, and free-form metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub input: String,
    pub target: String,
    pub metadata: Value,
}

/// Which record fields feed each sample field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub input: String,
    pub target: String,
    /// Field holding the sample id. Positional ids are used when unset.
    pub id: Option<String>,
    /// Fields copied, under their own names, into the sample metadata
    pub metadata: Vec<String>,
}

impl Default for FieldSpec {
    fn default() -> Self {
        Self {
            input: "prompt".to_string(),
            target: "reference_code".to_string(),
            id: None,
            metadata: vec!["metadata".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub location: String,
    pub samples: Vec<Sample>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Keep the samples from `library`, see [`filter_by_library`]
    pub fn retain_library(self, library: &str) -> Self {
        Self {
            samples: filter_by_library(self.samples, library),
            ..self
        }
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        if let Some(n) = limit {
            self.samples.truncate(n);
        }
        self
    }
}

/// Where a dataset location points
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetSource {
    Local(PathBuf),
    Remote(String),
}

/// Resolve `hf://datasets/<owner>/<name>/<file>` to its download URL;
/// http(s) URLs pass through and anything else is a local path.
pub fn resolve_location(location: &str) -> BenchResult<DatasetSource> {
    if let Some(rest) = location.strip_prefix(HF_PREFIX) {
        let mut parts = rest.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), Some(file))
                if !owner.is_empty() && !name.is_empty() && !file.is_empty() =>
            {
                Ok(DatasetSource::Remote(format!(
                    "{}/{}/{}/resolve/main/{}",
                    HF_RESOLVE_BASE, owner, name, file
                )))
            }
            _ => Err(BenchError::DatasetError(format!(
                "Invalid hub location '{}', expected hf://datasets/<owner>/<name>/<file>",
                location
            ))),
        }
    } else if location.starts_with("http://") || location.starts_with("https://") {
        Ok(DatasetSource::Remote(location.to_string()))
    } else {
        Ok(DatasetSource::Local(PathBuf::from(location)))
    }
}

fn dataset_name(location: &str) -> String {
    if let Some(rest) = location.strip_prefix(HF_PREFIX) {
        if let Some(name) = rest.split('/').nth(1) {
            return name.to_string();
        }
    }
    let file = location.rsplit('/').next().unwrap_or(location);
    file.split('.').next().unwrap_or(file).to_string()
}

/// Load a JSONL dataset from a local path, URL or hub location
pub async fn load_json_dataset(location: &str, spec: &FieldSpec) -> BenchResult<Dataset> {
    let content = match resolve_location(location)? {
        DatasetSource::Local(path) => {
            if !path.is_file() {
                return Err(BenchError::FileNotFound(path));
            }
            fs::read_to_string(&path)?
        }
        DatasetSource::Remote(url) => {
            tracing::info!("Downloading dataset from {}", url);
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()?;
            client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?
        }
    };

    let samples = parse_jsonl(&content, spec)?;
    tracing::info!("Loaded {} samples from {}", samples.len(), location);

    Ok(Dataset {
        name: dataset_name(location),
        location: location.to_string(),
        samples,
    })
}

/// Parse JSONL records into samples. Blank lines are skipped and do not
/// count toward the 1-based record position used as the default id.
pub fn parse_jsonl(content: &str, spec: &FieldSpec) -> BenchResult<Vec<Sample>> {
    let mut samples = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = line_idx + 1;
        let record: Value = serde_json::from_str(line).map_err(|e| {
            BenchError::DatasetError(format!("Invalid JSON on line {}: {}", line_no, e))
        })?;
        let record = record.as_object().ok_or_else(|| {
            BenchError::DatasetError(format!("Line {} is not a JSON object", line_no))
        })?;

        let position = samples.len() + 1;
        samples.push(record_to_sample(record, spec, position, line_no)?);
    }

    Ok(samples)
}

fn record_to_sample(
    record: &Map<String, Value>,
    spec: &FieldSpec,
    position: usize,
    line_no: usize,
) -> BenchResult<Sample> {
    let input = match record.get(&spec.input) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => {
            return Err(BenchError::DatasetError(format!(
                "Line {} has no '{}' field",
                line_no, spec.input
            )))
        }
    };

    let target = match record.get(&spec.target) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let id = spec
        .id
        .as_ref()
        .and_then(|field| record.get(field))
        .and_then(|v| match v {
            Value::Number(n) => n.as_i64().map(SampleId::Number),
            Value::String(s) => Some(SampleId::Text(s.clone())),
            _ => None,
        })
        .unwrap_or(SampleId::Number(position as i64));

    let metadata = if spec.metadata.is_empty() {
        Value::Null
    } else {
        let fields = spec
            .metadata
            .iter()
            .filter_map(|name| record.get(name).map(|v| (name.clone(), v.clone())))
            .collect::<Map<_, _>>();
        Value::Object(fields)
    };

    Ok(Sample {
        id,
        input,
        target,
        metadata,
    })
}

/// True when the sample's `metadata.metadata.library` is the string `library`.
/// Anything that is not an object at either level does not match.
pub fn is_library_sample(sample: &Sample, library: &str) -> bool {
    sample
        .metadata
        .as_object()
        .and_then(|outer| outer.get("metadata"))
        .and_then(Value::as_object)
        .and_then(|inner| inner.get("library"))
        .and_then(Value::as_str)
        == Some(library)
}

/// Keep, in order, the samples whose nested metadata names `library`
pub fn filter_by_library(samples: Vec<Sample>, library: &str) -> Vec<Sample> {
    samples
        .into_iter()
        .filter(|s| is_library_sample(s, library))
        .collect()
}
