use std::process::ExitCode;

use clap::Parser;
use cli_bcheck::{Cli, error_exit_code, run};
use core_bcheck::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(if cli.verbose {
        "cli_bcheck=debug,core_bcheck=debug"
    } else {
        "cli_bcheck=warn,core_bcheck=warn"
    });

    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();

    match run(&cli, stdin, &mut stdout).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(error) => {
            tracing::debug!("Command failed: {:?}", error);
            eprintln!("ERROR: {:#}", error);
            ExitCode::from(error_exit_code(&error))
        }
    }
}
