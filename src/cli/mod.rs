//! Command-line interface.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::errors::DomainError;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::setup::build_context;
use commands::block::BlockArgs;
use commands::friend::FriendArgs;
use commands::init::InitArgs;
use commands::user::UserArgs;

#[derive(Parser, Debug)]
#[command(name = "roster", version, about = "Identity and relationship store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file to load instead of roster.yaml / roster.local.yaml
    #[arg(short, long, global = true, env = "ROSTER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default config file and create the database
    Init(InitArgs),
    /// User identity commands
    User(UserArgs),
    /// Friend relationship commands
    Friend(FriendArgs),
    /// Block list commands
    Block(BlockArgs),
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(),
        }
    }
}

/// Run a parsed command against `config`.
pub async fn run(cli: Cli, config: &Config) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Init(args) => commands::init::execute(args, config, json).await,
        Commands::User(args) => commands::user::execute(args, &build_context(config).await?, json).await,
        Commands::Friend(args) => commands::friend::execute(args, &build_context(config).await?, json).await,
        Commands::Block(args) => commands::block::execute(args, &build_context(config).await?, json).await,
    }
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DomainError>() {
        Some(DomainError::NotFound { .. }) => 2,
        Some(DomainError::Conflict(_) | DomainError::PolicyViolation(_)) => 3,
        Some(DomainError::ValidationFailed(_) | DomainError::InvalidCursor(_)) => 4,
        Some(e) if e.is_retryable() => 75,
        _ => 1,
    }
}

/// Report `err` on stderr (or stdout as JSON) and exit.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let code = exit_code(&err);
    if json_mode {
        let retryable = err.downcast_ref::<DomainError>().is_some_and(DomainError::is_retryable);
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
            "retryable": retryable,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(code)
}
