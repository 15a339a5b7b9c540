use super::evaluation::Evaluation;
use super::solver::{Generate, Solver};
use crate::dataset::PANDAS_LIBRARY;

const CONCISE_REASONING_PROMPT: &str = "You are an expert Python programmer. \
Think through the problem briefly, keep any reasoning short, and finish with \
the code that solves it.";

/// DS-1000 restricted to its pandas problems
pub struct DsPandas {
    partial_credit: bool,
}

impl DsPandas {
    pub const TASK: &'static str = "ds_pandas";
    pub const PARTIAL_TASK: &'static str = "ds_pandas_partial";

    pub fn new() -> Self {
        Self {
            partial_credit: false,
        }
    }

    /// Grader may award `P`, and the solver is asked to keep reasoning short
    pub fn with_partial_credit() -> Self {
        Self {
            partial_credit: true,
        }
    }
}

impl Default for DsPandas {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluation for DsPandas {
    fn name(&self) -> &str {
        if self.partial_credit {
            Self::PARTIAL_TASK
        } else {
            Self::TASK
        }
    }

    fn library(&self) -> Option<&str> {
        Some(PANDAS_LIBRARY)
    }

    fn partial_credit(&self) -> bool {
        self.partial_credit
    }

    fn solver(&self) -> Box<dyn Solver> {
        if self.partial_credit {
            Box::new(Generate::new(Some(CONCISE_REASONING_PROMPT.to_string())))
        } else {
            Box::new(Generate::new(None))
        }
    }
}
