use super::ds_pandas::DsPandas;
use super::Evaluation;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

type EvaluationConstructor = Box<dyn Fn() -> Box<dyn Evaluation> + Send + Sync>;

static EVALUATION_REGISTRY: OnceLock<RwLock<HashMap<&'static str, EvaluationConstructor>>> =
    OnceLock::new();

/// Initialize the registry with the built-in tasks if it hasn't been initialized
fn registry() -> &'static RwLock<HashMap<&'static str, EvaluationConstructor>> {
    EVALUATION_REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, EvaluationConstructor> = HashMap::new();
        map.insert(
            DsPandas::TASK,
            Box::new(|| Box::new(DsPandas::new()) as Box<dyn Evaluation>),
        );
        map.insert(
            DsPandas::PARTIAL_TASK,
            Box::new(|| Box::new(DsPandas::with_partial_credit()) as Box<dyn Evaluation>),
        );
        RwLock::new(map)
    })
}

/// Register a task under `name`, replacing any task already registered there
pub fn register_evaluation(
    name: &'static str,
    constructor: impl Fn() -> Box<dyn Evaluation> + Send + Sync + 'static,
) {
    if let Ok(mut map) = registry().write() {
        map.insert(name, Box::new(constructor));
    }
}

pub struct EvaluationFactory;

impl EvaluationFactory {
    pub fn create(name: &str) -> Option<Box<dyn Evaluation>> {
        let map = registry().read().ok()?;
        let constructor = map.get(name)?;
        Some(constructor())
    }

    pub fn available_evaluations() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = registry()
            .read()
            .map(|map| map.keys().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Custom;

    impl Evaluation for Custom {
        fn name(&self) -> &str {
            "custom_pandas"
        }
    }

    #[test]
    fn test_builtin_tasks_are_registered() {
        let names = EvaluationFactory::available_evaluations();
        assert!(names.contains(&"ds_pandas"));
        assert!(names.contains(&"ds_pandas_partial"));

        let task = EvaluationFactory::create("ds_pandas").unwrap();
        assert_eq!(task.name(), "ds_pandas");
        assert!(!task.partial_credit());
        assert!(EvaluationFactory::create("ds_numpy").is_none());
    }

    #[test]
    fn test_register_custom_task() {
        register_evaluation("custom_pandas", || Box::new(Custom));
        let task = EvaluationFactory::create("custom_pandas").unwrap();
        assert_eq!(task.name(), "custom_pandas");

        let names = EvaluationFactory::available_evaluations();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
