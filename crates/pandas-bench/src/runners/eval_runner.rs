use crate::bench_config::EvalConfig;
use crate::config_manager::ConfigManager;
use crate::dataset::Sample;
use crate::errors::{BenchError, BenchResult};
use crate::eval_log::{
    write_eval_log, EvalDataset, EvalLog, EvalResults, EvalRunConfig, EvalSample, EvalSpec,
    EvalStats, EvalStatus, ModelOutput, ModelUsage, LOG_VERSION,
};
use crate::eval_suites::{Evaluation, EvaluationFactory, Scorer, Solver};
use crate::providers::configs::ModelConfig;
use crate::providers::{self, Provider, ProviderUsage, RetryConfig, Usage};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs one task against one model and writes the evaluation log
pub struct EvalRunner {
    config: EvalConfig,
    task: Box<dyn Evaluation>,
    solver_provider: Arc<dyn Provider>,
    grader_provider: Arc<dyn Provider>,
}

/// A finished sample plus every model call it made
struct SampleRun {
    sample: EvalSample,
    usage: Vec<ProviderUsage>,
}

impl EvalRunner {
    /// Resolve the task and both providers from the manager's config and environment
    pub fn new(manager: &ConfigManager) -> BenchResult<Self> {
        let config = manager.config().clone();
        config.validate()?;

        let task = EvaluationFactory::create(&config.task).ok_or_else(|| {
            BenchError::EvaluationError(format!(
                "No task named '{}' (available: {})",
                config.task,
                EvaluationFactory::available_evaluations().join(", ")
            ))
        })?;

        let model = config.model.clone().unwrap_or_default();
        let solver_provider =
            providers::create(&model, config.solver_model_config(&model), manager)?;

        let grader_model = config
            .grader_model
            .clone()
            .unwrap_or_else(|| task.default_grader_model().to_string());
        let grader_provider =
            providers::create(&grader_model, ModelConfig::new(grader_model.clone()), manager)?;

        Ok(Self::with_providers(
            config,
            task,
            solver_provider,
            grader_provider,
        ))
    }

    /// Build a runner around providers that already exist
    pub fn with_providers(
        config: EvalConfig,
        task: Box<dyn Evaluation>,
        solver_provider: Arc<dyn Provider>,
        grader_provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            config,
            task,
            solver_provider,
            grader_provider,
        }
    }

    /// Solve and grade every sample, then write the log. Returns the log path
    /// and the log itself.
    pub async fn run(&self) -> BenchResult<(PathBuf, EvalLog)> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().simple().to_string();

        let dataset = self
            .task
            .dataset(self.config.dataset.as_deref())
            .await?
            .limit(self.config.limit);

        tracing::info!(
            "Evaluating {} on {} samples of {} (run {})",
            self.solver_provider.model_id(),
            dataset.len(),
            self.task.name(),
            run_id
        );

        let solver = self.task.solver();
        let scorer = self.task.scorer();
        let retry = self.config.retry_config();
        let max_connections = self.config.max_connections.max(1);

        let runs: Vec<SampleRun> = stream::iter(dataset.samples.iter().cloned())
            .map(|sample| self.evaluate_sample(solver.as_ref(), scorer.as_ref(), sample, &retry))
            .buffered(max_connections)
            .collect()
            .await;

        let mut model_usage: BTreeMap<String, Usage> = BTreeMap::new();
        let mut samples = Vec::with_capacity(runs.len());
        for run in runs {
            for call in run.usage {
                let total = model_usage.entry(call.model).or_default();
                *total = total.add(&call.usage);
            }
            samples.push(run.sample);
        }

        let failed = samples.iter().filter(|s| s.error.is_some()).count();
        let (status, error) = if !samples.is_empty() && failed == samples.len() {
            tracing::error!("All {} samples failed", failed);
            (
                EvalStatus::Error,
                Some(format!("All {} samples failed", failed)),
            )
        } else {
            if failed > 0 {
                tracing::warn!("{} of {} samples failed", failed, samples.len());
            }
            (EvalStatus::Success, None)
        };

        let results = EvalResults::from_samples(&samples);
        tracing::info!(
            "{}: accuracy {:.3} (stderr {:.3}) over {} samples",
            self.task.name(),
            results.accuracy,
            results.stderr,
            results.total_samples
        );

        let log = EvalLog {
            version: LOG_VERSION,
            status,
            eval: EvalSpec {
                run_id,
                task: self.task.name().to_string(),
                task_version: self.task.version(),
                created: started_at,
                model: self.solver_provider.model_id(),
                grader_model: self.grader_provider.model_id(),
                dataset: EvalDataset {
                    name: dataset.name.clone(),
                    location: dataset.location.clone(),
                    samples: dataset.len(),
                },
                config: self.run_config(),
            },
            results: Some(results),
            stats: EvalStats {
                started_at,
                completed_at: Utc::now(),
                model_usage: model_usage
                    .into_iter()
                    .map(|(model, usage)| (model, ModelUsage::from(usage)))
                    .collect(),
            },
            error,
            samples,
        };

        let path = write_eval_log(&log, &self.config.log_dir)?;
        Ok((path, log))
    }

    async fn evaluate_sample(
        &self,
        solver: &dyn Solver,
        scorer: &dyn Scorer,
        sample: Sample,
        retry: &RetryConfig,
    ) -> SampleRun {
        let mut usage = Vec::new();

        let output = match solver
            .solve(self.solver_provider.as_ref(), &sample, retry)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Sample {} failed while solving: {}", sample.id, e);
                let output = ModelOutput {
                    model: self.solver_provider.model_id(),
                    ..Default::default()
                };
                return SampleRun {
                    sample: failed_sample(sample, output, e.to_string()),
                    usage,
                };
            }
        };
        usage.push(ProviderUsage::new(
            output.model.clone(),
            Usage::from(output.usage),
        ));

        match scorer
            .score(self.grader_provider.as_ref(), &sample, &output, retry)
            .await
        {
            Ok(outcome) => {
                usage.push(outcome.usage);
                let scores = BTreeMap::from([(scorer.name().to_string(), outcome.score)]);
                SampleRun {
                    sample: EvalSample {
                        id: sample.id,
                        epoch: 1,
                        input: sample.input,
                        target: sample.target,
                        metadata: sample.metadata,
                        output,
                        scores,
                        error: None,
                    },
                    usage,
                }
            }
            Err(e) => {
                tracing::error!("Sample {} failed while grading: {}", sample.id, e);
                SampleRun {
                    sample: failed_sample(sample, output, e.to_string()),
                    usage,
                }
            }
        }
    }

    fn run_config(&self) -> EvalRunConfig {
        EvalRunConfig {
            reasoning_tokens: self.config.reasoning_tokens,
            reasoning_effort: self.config.reasoning_effort.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            partial_credit: self.task.partial_credit(),
            max_connections: self.config.max_connections,
            limit: self.config.limit,
        }
    }
}

/// A sample that could not be solved or graded keeps its error and no score
fn failed_sample(sample: Sample, output: ModelOutput, error: String) -> EvalSample {
    EvalSample {
        id: sample.id,
        epoch: 1,
        input: sample.input,
        target: sample.target,
        metadata: sample.metadata,
        output,
        scores: BTreeMap::new(),
        error: Some(error),
    }
}
