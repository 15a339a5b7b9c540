pub mod anthropic;
pub mod base;
pub mod configs;
pub mod errors;
pub mod factory;
pub mod mock;
pub mod openai;
pub mod utils;

pub use base::{complete_with_retry, Completion, Provider, ProviderUsage, RetryConfig, Usage};
pub use factory::create;
