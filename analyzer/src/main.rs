use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use log::error;

use commwatch_analyzer::{Analyzer, AnalyzerConfig};

/// Offline message leak analyzer for commwatch loop logs
#[derive(Parser)]
#[command(name = "commwatch-analyzer")]
#[command(about = "Checks per-iteration send/receive conservation across every process's loop log", long_about = None)]
struct Cli {
    /// Number of processes; logs `0..PROCESSES` are read
    processes: u32,

    /// Directory holding the per-process logs
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Consolidated report file
    #[arg(short, long, default_value = "leak_report.txt")]
    output: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let analyzer = Analyzer::new(AnalyzerConfig {
        processes: cli.processes,
        dir: cli.dir,
        output: cli.output,
    });

    match analyzer.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
