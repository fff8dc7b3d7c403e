//! Implementation of the `roster init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::setup::create_config_file;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long, short)]
    pub force: bool,

    /// Where to write the config file
    #[arg(long, default_value = "roster.yaml")]
    pub config_path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub config_written: bool,
    pub config_path: PathBuf,
    pub database_path: String,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.config_written {
            lines.push(format!("Wrote config to {}", self.config_path.display()));
        } else {
            lines.push(format!(
                "Config {} already exists (use --force to overwrite)",
                self.config_path.display()
            ));
        }
        lines.push(format!("Database ready at {}", self.database_path));
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let config_written = create_config_file(&args.config_path, args.force)?;

    let pool = initialize_database(&config.database)
        .await
        .with_context(|| format!("Failed to initialize database at {}", config.database.path))?;
    pool.close().await;

    let out = InitOutput {
        success: true,
        config_written,
        config_path: args.config_path,
        database_path: config.database.path.clone(),
    };
    output(&out, json_mode);
    Ok(())
}
