use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use pandas_bench::eval_suites::EvaluationFactory;
use pandas_bench::logging::{configure_logger, LogLevel};
use std::path::PathBuf;

mod commands;

use commands::eval::{handle_eval, EvalArgs};
use commands::report::{handle_report, ReportArgs};

#[derive(Parser)]
#[command(author, version, about = "Evaluate language models on DS-1000 pandas problems", long_about = None)]
struct Cli {
    /// Increase console log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Solve and grade a task, writing a JSON evaluation log
    #[command(about = "Run an evaluation and write its log")]
    Eval(EvalArgs),

    /// Summarize evaluation logs and render the score chart
    #[command(about = "Summarize evaluation logs")]
    Report(ReportArgs),

    /// List registered tasks
    #[command(about = "List available tasks")]
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = configure_logger(
        LogLevel::from_verbosity(cli.verbose),
        LogLevel::Debug,
        cli.log_file.clone(),
    )?;

    match cli.command {
        Some(Command::Eval(args)) => handle_eval(args).await?,
        Some(Command::Report(args)) => handle_report(args)?,
        Some(Command::List) => {
            for name in EvaluationFactory::available_evaluations() {
                println!("{}", name);
            }
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }
    Ok(())
}
