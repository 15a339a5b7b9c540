pub mod eval;
pub mod report;
