pub mod chart;
pub mod report_generators;

pub use chart::{ScoreBar, ScoreChart, ScoreSegment};
pub use report_generators::{
    default_generators, ChartReportGenerator, CsvReportGenerator, ReportGenerator,
};
