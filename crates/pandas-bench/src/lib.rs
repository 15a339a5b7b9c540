pub mod bench_config;
pub mod config_manager;
pub mod dataframe_handler;
pub mod dataset;
pub mod errors;
pub mod eval_log;
pub mod eval_suites;
pub mod logging;
pub mod providers;
pub mod reporting;
pub mod runners;

// Re-export main components for easier use
pub use bench_config::EvalConfig;
pub use config_manager::ConfigManager;
pub use dataframe_handler::DataFrameHandler;
pub use errors::{BenchError, BenchResult};
pub use eval_log::{read_eval_log, write_eval_log, EvalLog, ScoreValue};
pub use runners::EvalRunner;
