//! Block list CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::friend::{RelationListOutput, RelationOutput};
use crate::cli::output::{output, ActionOutput};
use crate::domain::models::Page;
use crate::infrastructure::setup::AppContext;

#[derive(Args, Debug)]
pub struct BlockArgs {
    #[command(subcommand)]
    pub command: BlockCommands,
}

#[derive(Subcommand, Debug)]
pub enum BlockCommands {
    /// Block a user
    Add {
        owner: String,
        target: String,
    },
    /// Lift a block
    Remove {
        owner: String,
        target: String,
    },
    /// List users the owner has blocked
    List {
        owner: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
}

pub async fn execute(args: BlockArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = &ctx.friends;

    match args.command {
        BlockCommands::Add { owner, target } => {
            let relation = service.block(&owner, &target).await?;
            output(&RelationOutput::from(&relation), json_mode);
        }

        BlockCommands::Remove { owner, target } => {
            let lifted = service.unblock(&owner, &target).await?;
            let message = if lifted {
                format!("Unblocked {target}")
            } else {
                format!("{target} was not blocked")
            };
            output(&ActionOutput::new(lifted, message), json_mode);
        }

        BlockCommands::List { owner, page, size } => {
            let (relations, total) = service.list_blocked(&owner, Page::new(page, size)).await?;
            output(&RelationListOutput::new(&relations, total), json_mode);
        }
    }

    Ok(())
}
