//! Superstore ML - training entry point

use clap::Parser;
use superstore_ml::cli::{cmd_train, Cli};

fn main() {
    // Logs go to stderr; stdout carries the run summary
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "superstore_ml=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = cmd_train(&cli) {
        // `{:#}` renders "<stage>: <reason>"
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
