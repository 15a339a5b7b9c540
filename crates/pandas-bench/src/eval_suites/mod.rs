mod ds_pandas;
mod evaluation;
mod factory;
pub mod scorer;
pub mod solver;

pub use ds_pandas::DsPandas;
pub use evaluation::*;
pub use factory::{register_evaluation, EvaluationFactory};
pub use scorer::{ModelGradedQa, Scorer, ScorerOutcome};
pub use solver::{Generate, Solver};
