use super::scorer::{ModelGradedQa, Scorer};
use super::solver::{Generate, Solver};
use crate::dataset::{load_json_dataset, Dataset, FieldSpec, DS1000_LOCATION};
use crate::errors::BenchResult;
use async_trait::async_trait;

pub const DEFAULT_GRADER_MODEL: &str = "anthropic/claude-sonnet-4-20250514";

/// A benchmark task: where samples come from, which of them count, how the
/// model under test is prompted and how its answers are graded.
#[async_trait]
pub trait Evaluation: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> u32 {
        0
    }

    fn dataset_location(&self) -> &str {
        DS1000_LOCATION
    }

    fn field_spec(&self) -> FieldSpec {
        FieldSpec::default()
    }

    /// Keep only samples whose `metadata.library` is this value. All
    /// samples are kept when unset.
    fn library(&self) -> Option<&str> {
        None
    }

    fn default_grader_model(&self) -> &str {
        DEFAULT_GRADER_MODEL
    }

    fn partial_credit(&self) -> bool {
        false
    }

    fn solver(&self) -> Box<dyn Solver> {
        Box::new(Generate::new(None))
    }

    fn scorer(&self) -> Box<dyn Scorer> {
        Box::new(ModelGradedQa::new(self.partial_credit()))
    }

    /// Load the task's samples, from `location` when given
    async fn dataset(&self, location: Option<&str>) -> BenchResult<Dataset> {
        let location = location.unwrap_or(self.dataset_location());
        let dataset = load_json_dataset(location, &self.field_spec()).await?;
        let loaded = dataset.len();

        let dataset = match self.library() {
            Some(library) => dataset.retain_library(library),
            None => dataset,
        };
        tracing::info!(
            "Task {} kept {} of {} samples from {}",
            self.name(),
            dataset.len(),
            loaded,
            dataset.name
        );
        Ok(dataset)
    }
}
