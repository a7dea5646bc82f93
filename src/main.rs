mod app;
mod cli;
mod config;
mod db;
mod models;
mod network;
mod repository;
mod screens;
mod tmdb;
mod viewmodel;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays machine readable
    let default_filter = if cli.output.verbose {
        "moviebox=debug"
    } else {
        "moviebox=info"
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting moviebox v{}", env!("CARGO_PKG_VERSION"));

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            cli::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
