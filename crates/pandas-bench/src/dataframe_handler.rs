//! Flattens evaluation logs into a per-sample score table.
//!
//! Logs are read as untyped JSON, so a log written by an older version or by
//! another tool still loads: any field that is missing or has the wrong type
//! becomes a null cell.

use crate::errors::util::ensure_dir_exists;
use crate::errors::{BenchError, BenchResult};
use crate::eval_log::MODEL_GRADED_QA;
use polars::{io::csv::QuoteStyle, prelude::*};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const ID_COLUMN: &str = "id";
pub const MODEL_COLUMN: &str = "model";
pub const SCORE_COLUMN: &str = "score";
pub const SCORE_ORDER_COLUMN: &str = "score_order";
pub const TOKEN_COLUMNS: [&str; 3] = ["prompt_tokens", "completion_tokens", "total_tokens"];

/// Handles DataFrame operations for evaluation log processing
pub struct DataFrameHandler;

impl DataFrameHandler {
    /// Score table of a single log file, one row per sample
    pub fn get_scores(path: &Path) -> BenchResult<DataFrame> {
        if !path.is_file() {
            return Err(BenchError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let log: Value = serde_json::from_str(&content).map_err(|e| {
            BenchError::ResultsProcessingError(format!(
                "Invalid JSON in {}: {}",
                path.display(),
                e
            ))
        })?;

        let samples = log
            .get("samples")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        tracing::debug!("Read {} samples from {}", samples.len(), path.display());
        Self::samples_to_dataframe(samples)
    }

    /// Score table of every `.json` log in `log_dir`, concatenated in file name order
    pub fn scores_from_log_dir(log_dir: &Path) -> BenchResult<DataFrame> {
        ensure_dir_exists(log_dir)?;
        let mut files: Vec<PathBuf> = fs::read_dir(log_dir)
            .map_err(|e| {
                BenchError::ResultsProcessingError(format!(
                    "Cannot read log directory {}: {}",
                    log_dir.display(),
                    e
                ))
            })?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let is_json = path.extension().map_or(false, |ext| ext == "json");
                (path.is_file() && is_json).then_some(path)
            })
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        tracing::info!(
            "Found {} log files in {}",
            files.len(),
            log_dir.display()
        );

        let frames = files
            .iter()
            .map(|path| Self::get_scores(path).map(IntoLazy::lazy))
            .collect::<BenchResult<Vec<LazyFrame>>>()?;

        if frames.is_empty() {
            return Self::samples_to_dataframe(&[]);
        }

        concat(frames, UnionArgs::default())
            .and_then(LazyFrame::collect)
            .map_err(|e| {
                BenchError::DataFrameError(format!("Failed to concatenate score tables: {}", e))
            })
    }

    fn samples_to_dataframe(samples: &[Value]) -> BenchResult<DataFrame> {
        let ids: Vec<Option<String>> = samples
            .iter()
            .map(|sample| match sample.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .collect();

        let models: Vec<Option<String>> = samples
            .iter()
            .map(|sample| string_at(sample, "/output/model"))
            .collect();

        let score_pointer = format!("/scores/{}/value", MODEL_GRADED_QA);
        let scores: Vec<Option<String>> = samples
            .iter()
            .map(|sample| string_at(sample, &score_pointer))
            .collect();

        let mut columns = vec![
            Series::new(ID_COLUMN, ids),
            Series::new(MODEL_COLUMN, models),
            Series::new(SCORE_COLUMN, scores),
        ];

        for name in TOKEN_COLUMNS {
            let pointer = format!("/output/usage/{}", name);
            let values: Vec<Option<i64>> = samples
                .iter()
                .map(|sample| sample.pointer(&pointer).and_then(Value::as_i64))
                .collect();
            columns.push(Series::new(name, values));
        }

        DataFrame::new(columns)
            .map_err(|e| BenchError::DataFrameError(format!("Failed to create DataFrame: {}", e)))
    }

    /// Stacking order of a score: correct first, then incorrect
    pub fn score_order(score: &str) -> Option<i32> {
        match score {
            "C" => Some(1),
            "I" => Some(0),
            _ => None,
        }
    }

    /// Copy of `df` with a nullable `score_order` column
    pub fn with_score_order(df: &DataFrame) -> BenchResult<DataFrame> {
        let orders: Vec<Option<i32>> = df
            .column(SCORE_COLUMN)?
            .utf8()?
            .into_iter()
            .map(|score| score.and_then(Self::score_order))
            .collect();

        let mut df = df.clone();
        df.with_column(Series::new(SCORE_ORDER_COLUMN, orders))?;
        Ok(df)
    }

    /// Per-model counts and token means, models in order of first appearance
    pub fn model_summary(df: &DataFrame) -> BenchResult<DataFrame> {
        let mut aggs = vec![
            count().cast(DataType::Int64).alias("samples"),
            col(SCORE_COLUMN)
                .eq(lit("C"))
                .sum()
                .cast(DataType::Int64)
                .alias("correct"),
            col(SCORE_COLUMN)
                .eq(lit("I"))
                .sum()
                .cast(DataType::Int64)
                .alias("incorrect"),
        ];
        for name in TOKEN_COLUMNS {
            aggs.push(col(name).mean().alias(&format!("mean_{}", name)));
        }

        df.clone()
            .lazy()
            .group_by_stable([col(MODEL_COLUMN)])
            .agg(aggs)
            .with_columns([
                (col("samples") - col("correct") - col("incorrect")).alias("other"),
                (col("correct").cast(DataType::Float64) * lit(100.0)
                    / col("samples").cast(DataType::Float64))
                .alias("pct_correct"),
            ])
            .select([
                col(MODEL_COLUMN),
                col("samples"),
                col("correct"),
                col("incorrect"),
                col("other"),
                col("pct_correct"),
                col("mean_prompt_tokens"),
                col("mean_completion_tokens"),
                col("mean_total_tokens"),
            ])
            .collect()
            .map_err(|e| {
                BenchError::DataFrameError(format!("Failed to summarize scores: {}", e))
            })
    }

    /// Write `df` as CSV, atomically through a temporary file
    pub fn write_csv(df: &DataFrame, path: &Path) -> BenchResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("csv.tmp");
        let file = fs::File::create(&temp_path)?;
        let mut df = df.clone();

        CsvWriter::new(&file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_style(QuoteStyle::NonNumeric)
            .finish(&mut df)
            .map_err(|e| BenchError::DataFrameError(format!("Failed to write CSV: {}", e)))?;

        fs::rename(&temp_path, path)?;
        tracing::info!("Wrote {} rows to {}", df.height(), path.display());
        Ok(())
    }
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample(id: Value, model: &str, score: &str, tokens: (i64, i64, i64)) -> Value {
        json!({
            "id": id,
            "output": {
                "model": model,
                "completion": "df.head()",
                "usage": {
                    "prompt_tokens": tokens.0,
                    "completion_tokens": tokens.1,
                    "total_tokens": tokens.2,
                }
            },
            "scores": { "model_graded_qa": { "value": score } }
        })
    }

    fn write_log(dir: &Path, name: &str, samples: Vec<Value>) {
        let log = json!({ "version": 2, "status": "success", "samples": samples });
        fs::write(dir.join(name), log.to_string()).unwrap();
    }

    fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        df.column(column)
            .unwrap()
            .utf8()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    fn ints(df: &DataFrame, column: &str) -> Vec<Option<i64>> {
        df.column(column).unwrap().i64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_get_scores_reproduces_sample_values() {
        let dir = tempdir().unwrap();
        let samples = (0..5)
            .map(|i| {
                let score = if i % 2 == 0 { "C" } else { "I" };
                sample(json!(i), &format!("openai/m{}", i % 2), score, (i, 2 * i, 3 * i))
            })
            .collect();
        write_log(dir.path(), "run.json", samples);

        let df = DataFrameHandler::get_scores(&dir.path().join("run.json")).unwrap();

        assert_eq!(df.height(), 5);
        assert_eq!(
            df.get_column_names(),
            vec!["id", "model", "score", "prompt_tokens", "completion_tokens", "total_tokens"]
        );
        for i in 0..5usize {
            assert_eq!(strings(&df, "id")[i], Some(i.to_string()));
            assert_eq!(strings(&df, "model")[i], Some(format!("openai/m{}", i % 2)));
            let expected = if i % 2 == 0 { "C" } else { "I" };
            assert_eq!(strings(&df, "score")[i].as_deref(), Some(expected));
            assert_eq!(ints(&df, "prompt_tokens")[i], Some(i as i64));
            assert_eq!(ints(&df, "completion_tokens")[i], Some(2 * i as i64));
            assert_eq!(ints(&df, "total_tokens")[i], Some(3 * i as i64));
        }
    }

    #[test]
    fn test_missing_fields_become_nulls() {
        let dir = tempdir().unwrap();
        write_log(
            dir.path(),
            "partial.json",
            vec![
                json!({ "id": "text-id" }),
                json!({ "id": [1], "output": { "model": 7, "usage": { "prompt_tokens": "many" } } }),
            ],
        );

        let df = DataFrameHandler::get_scores(&dir.path().join("partial.json")).unwrap();

        assert_eq!(strings(&df, "id"), vec![Some("text-id".to_string()), None]);
        assert_eq!(strings(&df, "model"), vec![None, None]);
        assert_eq!(strings(&df, "score"), vec![None, None]);
        assert_eq!(ints(&df, "prompt_tokens"), vec![None, None]);
    }

    #[test]
    fn test_log_without_samples_has_no_rows() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.json"), r#"{"status": "error"}"#).unwrap();

        let df = DataFrameHandler::get_scores(&dir.path().join("empty.json")).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 6);
    }

    #[test]
    fn test_log_dir_row_count_is_sum_of_samples() {
        let dir = tempdir().unwrap();
        write_log(
            dir.path(),
            "b.json",
            vec![
                sample(json!(3), "m2", "I", (1, 1, 2)),
                sample(json!(4), "m2", "C", (1, 1, 2)),
            ],
        );
        write_log(dir.path(), "a.json", vec![sample(json!(1), "m1", "C", (1, 1, 2))]);
        write_log(dir.path(), "c.json", vec![]);
        fs::write(dir.path().join("notes.txt"), "not a log").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let df = DataFrameHandler::scores_from_log_dir(dir.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(
            strings(&df, "id"),
            vec![Some("1".to_string()), Some("3".to_string()), Some("4".to_string())]
        );
    }

    #[test]
    fn test_empty_log_dir_keeps_schema() {
        let dir = tempdir().unwrap();
        let df = DataFrameHandler::scores_from_log_dir(dir.path()).unwrap();

        assert_eq!(df.height(), 0);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Utf8);
        assert_eq!(df.column("total_tokens").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_log_dir_errors() {
        let dir = tempdir().unwrap();
        assert!(DataFrameHandler::scores_from_log_dir(&dir.path().join("missing")).is_err());

        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        assert!(matches!(
            DataFrameHandler::scores_from_log_dir(dir.path()),
            Err(BenchError::ResultsProcessingError(_))
        ));
    }

    #[test]
    fn test_score_order() {
        assert_eq!(DataFrameHandler::score_order("C"), Some(1));
        assert_eq!(DataFrameHandler::score_order("I"), Some(0));
        assert_eq!(DataFrameHandler::score_order("P"), None);
        assert_eq!(DataFrameHandler::score_order("N/A"), None);

        let df = df!(
            "score" => &[Some("C"), Some("I"), Some("X"), None]
        )
        .unwrap();
        let ordered = DataFrameHandler::with_score_order(&df).unwrap();
        let orders: Vec<Option<i32>> = ordered
            .column("score_order")
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(orders, vec![Some(1), Some(0), None, None]);
    }

    #[test]
    fn test_model_summary() {
        let dir = tempdir().unwrap();
        write_log(
            dir.path(),
            "run.json",
            vec![
                sample(json!(1), "zeta", "C", (10, 5, 15)),
                sample(json!(2), "alpha", "I", (20, 5, 25)),
                sample(json!(3), "zeta", "I", (30, 5, 35)),
                sample(json!(4), "zeta", "P", (20, 5, 25)),
            ],
        );
        let df = DataFrameHandler::scores_from_log_dir(dir.path()).unwrap();

        let summary = DataFrameHandler::model_summary(&df).unwrap();

        assert_eq!(
            strings(&summary, "model"),
            vec![Some("zeta".to_string()), Some("alpha".to_string())]
        );
        assert_eq!(ints(&summary, "samples"), vec![Some(3), Some(1)]);
        assert_eq!(ints(&summary, "correct"), vec![Some(1), Some(0)]);
        assert_eq!(ints(&summary, "incorrect"), vec![Some(1), Some(1)]);
        assert_eq!(ints(&summary, "other"), vec![Some(1), Some(0)]);

        let pct: Vec<Option<f64>> = summary
            .column("pct_correct")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert!((pct[0].unwrap() - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(pct[1], Some(0.0));

        let mean_prompt: Vec<Option<f64>> = summary
            .column("mean_prompt_tokens")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(mean_prompt, vec![Some(20.0), Some(20.0)]);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempdir().unwrap();
        write_log(dir.path(), "run.json", vec![sample(json!(1), "m1", "C", (1, 2, 3))]);
        let df = DataFrameHandler::scores_from_log_dir(dir.path()).unwrap();

        let path = dir.path().join("out").join("scores.csv");
        DataFrameHandler::write_csv(&df, &path).unwrap();

        let csv = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("completion_tokens"));
        assert_eq!(lines[1], r#""1","m1","C",1,2,3"#);
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
