use clap::Parser;
use sqlship::cli::{self, Cli, Outcome};
use std::io;
use std::process::ExitCode;
use tracing::{error, info, Level};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the run report.
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    info!(client = %sqlship::client_tag(), "Starting sqlship...");

    let stdin = io::stdin();
    let stdout = io::stdout();
    match cli::run(&cli, stdin.lock(), &mut stdout.lock()) {
        Ok(Outcome::Completed(summary)) => {
            info!(?summary, "run completed");
            ExitCode::SUCCESS
        }
        Ok(Outcome::NothingToDo) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
