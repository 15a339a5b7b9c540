use crate::dataset::Sample;
use crate::errors::{BenchError, BenchResult};
use crate::eval_log::{ModelOutput, Score, ScoreValue, MODEL_GRADED_QA};
use crate::providers::{complete_with_retry, Provider, ProviderUsage, RetryConfig};
use async_trait::async_trait;
use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use regex::Regex;

const GRADER_TEMPLATE_NAME: &str = "model_graded_qa.txt";
const GRADER_TEMPLATE: &str = include_str!("templates/model_graded_qa.txt");

static GRADE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)GRADE\s*:\s*([CPI])").expect("grade pattern is valid"));

/// A graded score plus what the grader spent producing it
#[derive(Debug, Clone)]
pub struct ScorerOutcome {
    pub score: Score,
    pub usage: ProviderUsage,
}

#[async_trait]
pub trait Scorer: Send + Sync {
    /// Key under which the score is stored in the sample log
    fn name(&self) -> &str;

    async fn score(
        &self,
        grader: &dyn Provider,
        sample: &Sample,
        output: &ModelOutput,
        retry: &RetryConfig,
    ) -> BenchResult<ScorerOutcome>;
}

/// Ask a grader model whether the answer meets the reference solution
pub struct ModelGradedQa {
    partial_credit: bool,
    env: Environment<'static>,
}

impl ModelGradedQa {
    pub fn new(partial_credit: bool) -> Self {
        let mut env = Environment::new();
        if let Err(e) = env.add_template(GRADER_TEMPLATE_NAME, GRADER_TEMPLATE) {
            tracing::error!("Invalid grader template: {}", e);
        }
        Self {
            partial_credit,
            env,
        }
    }

    pub fn partial_credit(&self) -> bool {
        self.partial_credit
    }

    pub fn render_prompt(&self, sample: &Sample, answer: &str) -> BenchResult<String> {
        let template = self
            .env
            .get_template(GRADER_TEMPLATE_NAME)
            .map_err(|e| BenchError::EvaluationError(format!("Grader template: {}", e)))?;
        template
            .render(context! {
                question => &sample.input,
                answer => answer,
                criterion => &sample.target,
                partial_credit => self.partial_credit,
            })
            .map_err(|e| BenchError::EvaluationError(format!("Failed to render grader prompt: {}", e)))
    }

    /// Extract the grade from grader output. The last `GRADE: X` wins. A
    /// `P` without partial credit counts as incorrect, and so does output
    /// with no grade at all.
    pub fn parse_grade(&self, grader_output: &str) -> Option<ScoreValue> {
        let letter = GRADE_PATTERN
            .captures_iter(grader_output)
            .last()
            .and_then(|caps| caps.get(1))?
            .as_str();

        match letter.parse::<ScoreValue>().ok()? {
            ScoreValue::PartiallyCorrect if !self.partial_credit => Some(ScoreValue::Incorrect),
            value => Some(value),
        }
    }
}

#[async_trait]
impl Scorer for ModelGradedQa {
    fn name(&self) -> &str {
        MODEL_GRADED_QA
    }

    async fn score(
        &self,
        grader: &dyn Provider,
        sample: &Sample,
        output: &ModelOutput,
        retry: &RetryConfig,
    ) -> BenchResult<ScorerOutcome> {
        let prompt = self.render_prompt(sample, &output.completion)?;
        let (completion, usage) = complete_with_retry(grader, "", &prompt, retry).await?;

        let (value, explanation) = match self.parse_grade(&completion.text) {
            Some(value) => (value, completion.text),
            None => {
                tracing::warn!("Grade not found in grader output for sample {}", sample.id);
                (
                    ScoreValue::Incorrect,
                    format!("Grade not found in model output: {}", completion.text),
                )
            }
        };

        Ok(ScorerOutcome {
            score: Score {
                value,
                answer: output.completion.clone(),
                explanation,
            },
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SampleId;
    use crate::providers::mock::MockProvider;
    use serde_json::json;
    use test_case::test_case;

    fn sample() -> Sample {
        Sample {
            id: SampleId::Number(3),
            input: "Sort df by column 'a'".to_string(),
            target: "result = df.sort_values('a')".to_string(),
            metadata: json!({}),
        }
    }

    #[test_case("Reasoning...\nGRADE: C", false, Some(ScoreValue::Correct))]
    #[test_case("grade : i", false, Some(ScoreValue::Incorrect))]
    #[test_case("GRADE: P", true, Some(ScoreValue::PartiallyCorrect))]
    #[test_case("GRADE: P", false, Some(ScoreValue::Incorrect))]
    #[test_case("Options are GRADE: C or GRADE: I.\nFinal answer GRADE: I", false, Some(ScoreValue::Incorrect))]
    #[test_case("Looks right to me.", false, None)]
    fn test_parse_grade(output: &str, partial: bool, expected: Option<ScoreValue>) {
        assert_eq!(ModelGradedQa::new(partial).parse_grade(output), expected);
    }

    #[test]
    fn test_new_compiles_grader_template() {
        for partial_credit in [false, true] {
            let scorer = ModelGradedQa::new(partial_credit);
            assert!(scorer.env.get_template(GRADER_TEMPLATE_NAME).is_ok());
        }
    }

    #[test]
    fn test_prompt_contains_task_submission_and_criterion() {
        let scorer = ModelGradedQa::new(false);
        let prompt = scorer.render_prompt(&sample(), "df.sort_values('a')").unwrap();

        assert!(prompt.contains("[Task]: Sort df by column 'a'"));
        assert!(prompt.contains("[Submission]: df.sort_values('a')"));
        assert!(prompt.contains("[Criterion]: result = df.sort_values('a')"));
        assert!(prompt.contains("one of CI."));
        assert!(!prompt.contains("partially correct"));

        let partial = ModelGradedQa::new(true)
            .render_prompt(&sample(), "x")
            .unwrap();
        assert!(partial.contains("one of CPI."));
        assert!(partial.contains("\"P\" for partially correct answers"));
    }

    #[tokio::test]
    async fn test_score_with_grader() {
        let grader = MockProvider::new("grader", vec!["Same result.\nGRADE: C".to_string()]);
        let output = ModelOutput {
            model: "mock/solver".to_string(),
            completion: "df.sort_values('a')".to_string(),
            ..Default::default()
        };

        let outcome = ModelGradedQa::new(false)
            .score(&grader, &sample(), &output, &RetryConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.score.value, ScoreValue::Correct);
        assert_eq!(outcome.score.answer, "df.sort_values('a')");
        assert_eq!(outcome.score.explanation, "Same result.\nGRADE: C");
        assert_eq!(outcome.usage.model, "mock/grader");
        assert!(grader.prompts()[0].contains("[Submission]: df.sort_values('a')"));
    }

    #[tokio::test]
    async fn test_missing_grade_scores_incorrect() {
        let grader = MockProvider::new("grader", vec!["I cannot tell.".to_string()]);
        let outcome = ModelGradedQa::new(false)
            .score(&grader, &sample(), &ModelOutput::default(), &RetryConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.score.value, ScoreValue::Incorrect);
        assert!(outcome.score.explanation.starts_with("Grade not found"));
    }
}
