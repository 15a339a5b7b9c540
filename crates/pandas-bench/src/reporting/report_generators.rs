use crate::dataframe_handler::DataFrameHandler;
use crate::errors::BenchResult;
use crate::reporting::chart::ScoreChart;
use polars::prelude::DataFrame;
use std::fs;
use std::path::Path;

pub const SCORES_CSV: &str = "scores.csv";
pub const SUMMARY_CSV: &str = "model_summary.csv";
pub const CHART_SVG: &str = "scores_chart.svg";

/// Trait for report generators
pub trait ReportGenerator {
    fn generate(&self, scores: &DataFrame, output_dir: &Path) -> BenchResult<()>;
}

/// Writes the score table, with stacking order, and the per-model summary
pub struct CsvReportGenerator;

impl ReportGenerator for CsvReportGenerator {
    fn generate(&self, scores: &DataFrame, output_dir: &Path) -> BenchResult<()> {
        fs::create_dir_all(output_dir)?;

        let ordered = DataFrameHandler::with_score_order(scores)?;
        DataFrameHandler::write_csv(&ordered, &output_dir.join(SCORES_CSV))?;

        let summary = DataFrameHandler::model_summary(scores)?;
        DataFrameHandler::write_csv(&summary, &output_dir.join(SUMMARY_CSV))?;

        Ok(())
    }
}

/// Renders the stacked score chart as SVG
pub struct ChartReportGenerator;

impl ReportGenerator for ChartReportGenerator {
    fn generate(&self, scores: &DataFrame, output_dir: &Path) -> BenchResult<()> {
        fs::create_dir_all(output_dir)?;

        let chart = ScoreChart::from_scores(scores)?;
        let svg = chart.render_svg()?;

        let path = output_dir.join(CHART_SVG);
        let temp_path = path.with_extension("svg.tmp");
        fs::write(&temp_path, svg)?;
        fs::rename(&temp_path, &path)?;

        tracing::info!(
            "Wrote chart of {} models to {}",
            chart.bars.len(),
            path.display()
        );
        Ok(())
    }
}

/// Every report the `report` command produces
pub fn default_generators() -> Vec<Box<dyn ReportGenerator>> {
    vec![Box::new(CsvReportGenerator), Box::new(ChartReportGenerator)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use tempfile::tempdir;

    fn scores() -> DataFrame {
        df!(
            "id" => &["1", "2"],
            "model" => &["m1", "m1"],
            "score" => &["C", "I"],
            "prompt_tokens" => &[10i64, 20],
            "completion_tokens" => &[1i64, 2],
            "total_tokens" => &[11i64, 22]
        )
        .unwrap()
    }

    #[test]
    fn test_generators_write_reports() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report");

        for generator in default_generators() {
            generator.generate(&scores(), &out).unwrap();
        }

        let scores_csv = fs::read_to_string(out.join(SCORES_CSV)).unwrap();
        assert!(scores_csv.lines().next().unwrap().contains("score_order"));
        assert_eq!(scores_csv.lines().count(), 3);

        let summary = fs::read_to_string(out.join(SUMMARY_CSV)).unwrap();
        assert!(summary.contains("\"m1\",2,1,1,0,50"));

        let svg = fs::read_to_string(out.join(CHART_SVG)).unwrap();
        assert!(svg.contains("m1"));
        assert!(!out.join("scores_chart.svg.tmp").exists());
    }
}
