pub mod eval_runner;

pub use eval_runner::EvalRunner;
