//! Roster CLI entry point.

use clap::Parser;

use roster::cli::{handle_error, run, Cli};
use roster::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => handle_error(err, json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, json),
    };

    if let Err(err) = run(cli, &config).await {
        handle_error(err, json);
    }
}
