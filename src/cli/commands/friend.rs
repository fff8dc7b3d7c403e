//! Friend CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::output::{output, truncate, ActionOutput, CommandOutput};
use crate::domain::models::{Page, Relation, RelationState, SyncPage};
use crate::infrastructure::setup::AppContext;

#[derive(Args, Debug)]
pub struct FriendArgs {
    #[command(subcommand)]
    pub command: FriendCommands,
}

#[derive(Subcommand, Debug)]
pub enum FriendCommands {
    /// Befriend another user (writes both directions)
    Add {
        owner: String,
        peer: String,
        /// Where the request came from
        #[arg(long, default_value = "")]
        source: String,
    },
    /// Remove a friend from the owner's list only
    Remove {
        owner: String,
        peer: String,
    },
    /// Set the owner's private remark for a friend
    Remark {
        owner: String,
        peer: String,
        remark: String,
    },
    /// Put a friend in a group ("" clears it)
    Tag {
        owner: String,
        peer: String,
        tag: String,
    },
    /// List the owner's friends
    List {
        owner: String,
        /// Only friends carrying this group tag
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
    /// List the owner's group tags
    Tags {
        owner: String,
    },
    /// Show how the owner relates to a peer
    Status {
        owner: String,
        peer: String,
    },
    /// Fetch relationship changes since a cursor
    Sync {
        owner: String,
        /// Cursor from the previous call; omit for a full sync
        #[arg(long, default_value = "0")]
        cursor: String,
        /// Page size; 0 uses the configured default
        #[arg(long, default_value_t = 0)]
        limit: u32,
        /// Keep paging until the feed is exhausted
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct RelationOutput {
    pub id: i64,
    pub owner_uuid: String,
    pub peer_uuid: String,
    pub status: String,
    pub remark: String,
    pub group_tag: String,
    pub source: String,
    pub version: i64,
}

impl From<&Relation> for RelationOutput {
    fn from(relation: &Relation) -> Self {
        Self {
            id: relation.id,
            owner_uuid: relation.owner_uuid.clone(),
            peer_uuid: relation.peer_uuid.clone(),
            status: relation.status.as_str().to_string(),
            remark: relation.remark.clone(),
            group_tag: relation.group_tag.clone(),
            source: relation.source.clone(),
            version: relation.version(),
        }
    }
}

impl CommandOutput for RelationOutput {
    fn to_human(&self) -> String {
        let mut line = format!("{} -> {} ({})", self.owner_uuid, self.peer_uuid, self.status);
        if !self.remark.is_empty() {
            line.push_str(&format!(" remark={:?}", self.remark));
        }
        if !self.group_tag.is_empty() {
            line.push_str(&format!(" tag={:?}", self.group_tag));
        }
        line
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RelationListOutput {
    pub relations: Vec<RelationOutput>,
    pub total: u64,
}

impl RelationListOutput {
    pub fn new(relations: &[Relation], total: u64) -> Self {
        Self {
            relations: relations.iter().map(RelationOutput::from).collect(),
            total,
        }
    }
}

impl CommandOutput for RelationListOutput {
    fn to_human(&self) -> String {
        if self.relations.is_empty() {
            return "No relations found.".to_string();
        }

        let mut lines = vec![format!("Found {} relation(s):\n", self.total)];
        lines.push(format!("{:<36} {:<8} {:<20} {:<12}", "PEER", "STATUS", "REMARK", "TAG"));
        lines.push("-".repeat(79));

        for relation in &self.relations {
            lines.push(format!(
                "{:<36} {:<8} {:<20} {:<12}",
                relation.peer_uuid,
                relation.status,
                truncate(&relation.remark, 18),
                truncate(&relation.group_tag, 12)
            ));
        }

        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TagsOutput {
    pub tags: Vec<String>,
}

impl CommandOutput for TagsOutput {
    fn to_human(&self) -> String {
        if self.tags.is_empty() {
            "No tags.".to_string()
        } else {
            self.tags.join("\n")
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StatusOutput {
    pub owner: String,
    pub peer: String,
    pub state: RelationState,
    pub blocked_by_peer: bool,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut line = format!("{} -> {}: {}", self.owner, self.peer, self.state.as_str());
        if self.blocked_by_peer {
            line.push_str(" (blocked by peer)");
        }
        line
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SyncChangeOutput {
    pub change: String,
    pub relation: RelationOutput,
}

#[derive(Debug, serde::Serialize)]
pub struct SyncOutput {
    pub changes: Vec<SyncChangeOutput>,
    pub has_more: bool,
    pub latest_version: i64,
    pub next_cursor: String,
}

impl SyncOutput {
    fn absorb(&mut self, page: SyncPage) {
        self.changes.extend(page.changes.iter().map(|c| SyncChangeOutput {
            change: c.change_type.as_str().to_string(),
            relation: RelationOutput::from(&c.relation),
        }));
        self.has_more = page.has_more;
        self.latest_version = page.latest_version;
        self.next_cursor = page.next_cursor;
    }
}

impl CommandOutput for SyncOutput {
    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self
            .changes
            .iter()
            .map(|c| format!("{:<8} {}", c.change, c.relation.to_human()))
            .collect();
        if lines.is_empty() {
            lines.push("No changes.".to_string());
        }
        lines.push(format!(
            "\nlatest_version={} has_more={} next_cursor={}",
            self.latest_version, self.has_more, self.next_cursor
        ));
        lines.join("\n")
    }
}

pub async fn execute(args: FriendArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = &ctx.friends;

    match args.command {
        FriendCommands::Add { owner, peer, source } => {
            let (forward, _) = service.add_friend(&owner, &peer, &source).await?;
            output(&RelationOutput::from(&forward), json_mode);
        }

        FriendCommands::Remove { owner, peer } => {
            let removed = service.remove_friend(&owner, &peer).await?;
            let message = if removed {
                format!("Removed {peer} from {owner}'s friends")
            } else {
                format!("{peer} was not on {owner}'s friend list")
            };
            output(&ActionOutput::new(removed, message), json_mode);
        }

        FriendCommands::Remark { owner, peer, remark } => {
            let relation = service.set_remark(&owner, &peer, &remark).await?;
            output(&RelationOutput::from(&relation), json_mode);
        }

        FriendCommands::Tag { owner, peer, tag } => {
            let relation = service.set_group_tag(&owner, &peer, &tag).await?;
            output(&RelationOutput::from(&relation), json_mode);
        }

        FriendCommands::List { owner, tag, page, size } => {
            let (relations, total) = service
                .list_friends(&owner, tag.as_deref(), Page::new(page, size))
                .await?;
            output(&RelationListOutput::new(&relations, total), json_mode);
        }

        FriendCommands::Tags { owner } => {
            let tags = service.list_tags(&owner).await?;
            output(&TagsOutput { tags }, json_mode);
        }

        FriendCommands::Status { owner, peer } => {
            let out = StatusOutput {
                state: service.relation_status(&owner, &peer).await?,
                blocked_by_peer: service.is_blocked_by(&owner, &peer).await?,
                owner,
                peer,
            };
            output(&out, json_mode);
        }

        FriendCommands::Sync { owner, cursor, limit, all } => {
            let mut out = SyncOutput {
                changes: Vec::new(),
                has_more: false,
                latest_version: 0,
                next_cursor: cursor,
            };
            loop {
                let page = service.sync(&owner, &out.next_cursor, limit).await?;
                out.absorb(page);
                if !(all && out.has_more) {
                    break;
                }
            }
            output(&out, json_mode);
        }
    }

    Ok(())
}
