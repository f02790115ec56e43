mod auth;
mod cli;
mod config;
mod coverage;
mod coveralls;
mod error;
mod flags;
mod github;
mod output;

use clap::Parser;
use cli::Cli;
use log::{error, info};

const FAILURE_EXIT_CODE: i32 = 1;

/// Single exit point for every fatal error: log the full cause chain and quit.
fn fail(err: &anyhow::Error) -> ! {
    error!("{err:#}");
    std::process::exit(FAILURE_EXIT_CODE)
}

fn init_logger(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.debug);

    output::print_banner();
    info!("Starting coveralls-action");

    if let Err(e) = cli.execute().await {
        fail(&e);
    }
}
