use anyhow::{Context, Result};
use clap::Args;
use console::style;
use pandas_bench::reporting::default_generators;
use pandas_bench::DataFrameHandler;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(
        long,
        value_name = "DIR",
        default_value = "logs",
        help = "Directory holding evaluation logs"
    )]
    pub log_dir: PathBuf,

    #[arg(
        short,
        long,
        value_name = "DIR",
        help = "Write CSV tables and the SVG chart here"
    )]
    pub output_dir: Option<PathBuf>,
}

pub fn handle_report(args: ReportArgs) -> Result<()> {
    let scores = DataFrameHandler::scores_from_log_dir(&args.log_dir)
        .with_context(|| format!("Failed to read logs from {}", args.log_dir.display()))?;

    if scores.height() == 0 {
        println!("No samples found in {}", args.log_dir.display());
        return Ok(());
    }

    let summary = DataFrameHandler::model_summary(&scores)?;
    println!("{}", summary);

    if let Some(output_dir) = &args.output_dir {
        for generator in default_generators() {
            generator.generate(&scores, output_dir)?;
        }
        println!(
            "{} reports written to {}",
            style("✔").green(),
            output_dir.display()
        );
    }
    Ok(())
}
