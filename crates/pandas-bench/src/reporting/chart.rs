//! Horizontal 100%-stacked bar chart of score shares per model.

use crate::dataframe_handler::{DataFrameHandler, MODEL_COLUMN, SCORE_COLUMN};
use crate::errors::{BenchError, BenchResult};
use plotters::prelude::*;
use polars::prelude::DataFrame;
use std::cmp::Reverse;

pub const CHART_TITLE: &str = "Model performance on Python code generation";
pub const X_LABEL: &str = "Percent";
pub const LEGEND_TITLE: &str = "Score";
/// Label for a missing model or score
pub const MISSING_LABEL: &str = "NA";

pub const CORRECT_COLOR: RGBColor = RGBColor(0x6c, 0xae, 0xa7);
pub const INCORRECT_COLOR: RGBColor = RGBColor(0xef, 0x8a, 0x62);
pub const OTHER_COLOR: RGBColor = RGBColor(0x99, 0x99, 0x99);

const WIDTH: u32 = 900;
const BAR_HEIGHT: u32 = 48;
const CHROME_HEIGHT: u32 = 160;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSegment {
    pub score: String,
    pub count: usize,
    /// Share of the bar, in 0..=1
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBar {
    pub model: String,
    pub segments: Vec<ScoreSegment>,
}

impl ScoreBar {
    pub fn total(&self) -> usize {
        self.segments.iter().map(|s| s.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreChart {
    pub title: String,
    pub x_label: String,
    pub legend_title: String,
    pub bars: Vec<ScoreBar>,
}

pub fn score_color(score: &str) -> RGBColor {
    match score {
        "C" => CORRECT_COLOR,
        "I" => INCORRECT_COLOR,
        _ => OTHER_COLOR,
    }
}

/// Known scores by descending order, then unknown ones
fn stacking_key(score: &str) -> (bool, Reverse<i32>) {
    match DataFrameHandler::score_order(score) {
        Some(order) => (false, Reverse(order)),
        None => (true, Reverse(0)),
    }
}

fn chart_error(e: impl std::fmt::Display) -> BenchError {
    BenchError::ChartError(e.to_string())
}

impl ScoreChart {
    /// One bar per model in order of first appearance. Rows without a score
    /// count as `NA`.
    pub fn from_scores(df: &DataFrame) -> BenchResult<Self> {
        let models = df.column(MODEL_COLUMN)?.utf8()?;
        let scores = df.column(SCORE_COLUMN)?.utf8()?;

        let mut counts: Vec<(String, Vec<(String, usize)>)> = Vec::new();
        for (model, score) in models.into_iter().zip(scores.into_iter()) {
            let model = model.unwrap_or(MISSING_LABEL);
            let score = score.unwrap_or(MISSING_LABEL);

            let idx = match counts.iter().position(|(m, _)| m == model) {
                Some(idx) => idx,
                None => {
                    counts.push((model.to_string(), Vec::new()));
                    counts.len() - 1
                }
            };
            let by_score = &mut counts[idx].1;
            match by_score.iter_mut().find(|(s, _)| s == score) {
                Some((_, count)) => *count += 1,
                None => by_score.push((score.to_string(), 1)),
            }
        }

        let bars = counts
            .into_iter()
            .map(|(model, mut by_score)| {
                by_score.sort_by_key(|(score, _)| stacking_key(score));
                let total: usize = by_score.iter().map(|(_, c)| c).sum();
                let segments = by_score
                    .into_iter()
                    .map(|(score, count)| ScoreSegment {
                        proportion: count as f64 / total as f64,
                        score,
                        count,
                    })
                    .collect();
                ScoreBar { model, segments }
            })
            .collect();

        Ok(Self {
            title: CHART_TITLE.to_string(),
            x_label: X_LABEL.to_string(),
            legend_title: LEGEND_TITLE.to_string(),
            bars,
        })
    }

    /// Every score that appears in some bar, in stacking order
    pub fn legend_scores(&self) -> Vec<String> {
        let mut scores: Vec<String> = Vec::new();
        for segment in self.bars.iter().flat_map(|bar| &bar.segments) {
            if !scores.contains(&segment.score) {
                scores.push(segment.score.clone());
            }
        }
        scores.sort_by_key(|score| stacking_key(score));
        scores
    }

    /// Render to an SVG document
    pub fn render_svg(&self) -> BenchResult<String> {
        let rows = self.bars.len().max(1) as i32;
        let height = CHROME_HEIGHT + BAR_HEIGHT * rows as u32;
        let label_width = self
            .bars
            .iter()
            .map(|bar| bar.model.len() as u32 * 8 + 20)
            .max()
            .unwrap_or(60)
            .clamp(60, 360);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (WIDTH, height)).into_drawing_area();
            root.fill(&WHITE).map_err(chart_error)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(&self.title, ("sans-serif", 22))
                .margin(16)
                .x_label_area_size(40)
                .y_label_area_size(label_width)
                .build_cartesian_2d(0f64..1f64, (0..rows).into_segmented())
                .map_err(chart_error)?;

            // First model at the top
            let model_at = |value: &SegmentValue<i32>| -> String {
                match value {
                    SegmentValue::CenterOf(row) => self
                        .bars
                        .get((rows - 1 - row) as usize)
                        .map(|bar| bar.model.clone())
                        .unwrap_or_default(),
                    _ => String::new(),
                }
            };

            chart
                .configure_mesh()
                .disable_y_mesh()
                .x_desc(&self.x_label)
                .x_labels(6)
                .x_label_formatter(&|x| format!("{:.0}%", x * 100.0))
                .y_label_formatter(&model_at)
                .draw()
                .map_err(chart_error)?;

            for score in self.legend_scores() {
                let color = score_color(&score);
                let rects = self.bars.iter().enumerate().filter_map(|(idx, bar)| {
                    let row = rows - 1 - idx as i32;
                    let mut start = 0.0;
                    for segment in &bar.segments {
                        let end = start + segment.proportion;
                        if segment.score == score {
                            let mut rect = Rectangle::new(
                                [
                                    (start, SegmentValue::Exact(row)),
                                    (end, SegmentValue::Exact(row + 1)),
                                ],
                                color.filled(),
                            );
                            rect.set_margin(6, 6, 0, 0);
                            return Some(rect);
                        }
                        start = end;
                    }
                    None
                });

                chart
                    .draw_series(rects)
                    .map_err(chart_error)?
                    .label(format!("{}: {}", self.legend_title, score))
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                    });
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::LowerMiddle)
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK)
                .draw()
                .map_err(chart_error)?;

            root.present().map_err(chart_error)?;
        }

        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn scores(rows: &[(Option<&str>, Option<&str>)]) -> DataFrame {
        let models: Vec<Option<&str>> = rows.iter().map(|r| r.0).collect();
        let scores: Vec<Option<&str>> = rows.iter().map(|r| r.1).collect();
        df!("model" => models, "score" => scores).unwrap()
    }

    fn shares(bar: &ScoreBar) -> Vec<(&str, f64)> {
        bar.segments
            .iter()
            .map(|s| (s.score.as_str(), s.proportion))
            .collect()
    }

    #[test]
    fn test_single_model_half_correct() {
        let chart =
            ScoreChart::from_scores(&scores(&[(Some("m1"), Some("I")), (Some("m1"), Some("C"))]))
                .unwrap();

        assert_eq!(chart.bars.len(), 1);
        assert_eq!(chart.bars[0].model, "m1");
        assert_eq!(shares(&chart.bars[0]), vec![("C", 0.5), ("I", 0.5)]);
        assert_eq!(chart.title, "Model performance on Python code generation");
    }

    #[test]
    fn test_unknown_scores_stack_after_known() {
        let chart = ScoreChart::from_scores(&scores(&[
            (Some("b"), Some("X")),
            (Some("b"), Some("I")),
            (Some("a"), Some("C")),
            (Some("b"), None),
            (Some("b"), Some("C")),
            (None, Some("C")),
        ]))
        .unwrap();

        let models: Vec<&str> = chart.bars.iter().map(|b| b.model.as_str()).collect();
        assert_eq!(models, vec!["b", "a", "NA"]);

        let b = &chart.bars[0];
        let order: Vec<&str> = b.segments.iter().map(|s| s.score.as_str()).collect();
        assert_eq!(order, vec!["C", "I", "X", "NA"]);
        assert_eq!(b.total(), 4);

        for bar in &chart.bars {
            let sum: f64 = bar.segments.iter().map(|s| s.proportion).sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        assert_eq!(chart.legend_scores(), vec!["C", "I", "X", "NA"]);
    }

    #[test]
    fn test_palette() {
        assert_eq!(score_color("C"), RGBColor(0x6c, 0xae, 0xa7));
        assert_eq!(score_color("I"), RGBColor(0xef, 0x8a, 0x62));
        assert_eq!(score_color("P"), OTHER_COLOR);
    }

    #[test]
    fn test_render_svg() {
        let chart = ScoreChart::from_scores(&scores(&[
            (Some("openai/o3-mini"), Some("C")),
            (Some("openai/o3-mini"), Some("I")),
            (Some("anthropic/claude"), Some("weird")),
        ]))
        .unwrap();

        let svg = chart.render_svg().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Model performance on Python code generation"));
        assert!(svg.contains("openai/o3-mini"));
        assert!(svg.contains("Percent"));
        assert!(svg.contains("0%"));
        assert!(svg.contains("#6CAEA7") || svg.contains("#6caea7"));
    }

    #[test]
    fn test_render_empty_chart() {
        let chart = ScoreChart::from_scores(&scores(&[])).unwrap();
        assert!(chart.bars.is_empty());
        assert!(chart.render_svg().unwrap().contains("</svg>"));
    }
}
