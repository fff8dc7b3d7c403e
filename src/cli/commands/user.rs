//! User CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Gender, Page, ProfilePatch, User};
use crate::infrastructure::setup::AppContext;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a new user
    Create {
        /// Phone number
        telephone: String,
        /// Display name
        nickname: String,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Show a user by identifier
    Get {
        uuid: String,
    },
    /// Show a user by phone number
    ByPhone {
        telephone: String,
    },
    /// Edit profile fields
    Update {
        uuid: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        /// male, female or unknown
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        signature: Option<String>,
        /// YYYY-MM-DD, or "" to clear
        #[arg(long)]
        birthday: Option<String>,
    },
    /// Move a user to a new phone number
    ChangePhone {
        uuid: String,
        telephone: String,
    },
    /// Look up several users at once
    Batch {
        #[arg(required = true)]
        uuids: Vec<String>,
    },
    /// Search active users by phone or nickname
    Search {
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct UserOutput {
    pub uuid: String,
    pub telephone: String,
    pub email: Option<String>,
    pub nickname: String,
    pub avatar: String,
    pub gender: String,
    pub signature: String,
    pub birthday: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserOutput {
    fn from(user: &User) -> Self {
        Self {
            uuid: user.uuid.clone(),
            telephone: user.telephone.clone(),
            email: user.email.clone(),
            nickname: user.nickname.clone(),
            avatar: user.avatar.clone(),
            gender: user.gender.as_str().to_string(),
            signature: user.signature.clone(),
            birthday: user.birthday.clone(),
            status: user.status.as_str().to_string(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for UserOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("User: {}", self.nickname),
            format!("UUID: {}", self.uuid),
            format!("Telephone: {}", self.telephone),
        ];
        if let Some(email) = &self.email {
            lines.push(format!("Email: {email}"));
        }
        lines.push(format!("Gender: {}", self.gender));
        if !self.birthday.is_empty() {
            lines.push(format!("Birthday: {}", self.birthday));
        }
        if !self.signature.is_empty() {
            lines.push(format!("Signature: {}", self.signature));
        }
        lines.push(format!("Status: {}", self.status));
        lines.push(format!("Updated: {}", self.updated_at));
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct UserListOutput {
    pub users: Vec<UserOutput>,
    pub total: u64,
}

impl CommandOutput for UserListOutput {
    fn to_human(&self) -> String {
        if self.users.is_empty() {
            return "No users found.".to_string();
        }

        let mut lines = vec![format!("Found {} user(s):\n", self.total)];
        lines.push(format!("{:<36} {:<16} {:<20} {:<8}", "UUID", "TELEPHONE", "NICKNAME", "STATUS"));
        lines.push("-".repeat(83));

        for user in &self.users {
            lines.push(format!(
                "{:<36} {:<16} {:<20} {:<8}",
                user.uuid,
                user.telephone,
                truncate(&user.nickname, 18),
                user.status
            ));
        }

        lines.join("\n")
    }
}

impl UserListOutput {
    fn from_users(users: &[User], total: u64) -> Self {
        Self {
            users: users.iter().map(UserOutput::from).collect(),
            total,
        }
    }
}

pub async fn execute(args: UserArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = &ctx.users;

    match args.command {
        UserCommands::Create { telephone, nickname, email } => {
            let user = service.register(&telephone, &nickname, email.as_deref()).await?;
            output(&UserOutput::from(&user), json_mode);
        }

        UserCommands::Get { uuid } => {
            let user = service.get_profile(&uuid).await?;
            output(&UserOutput::from(&user), json_mode);
        }

        UserCommands::ByPhone { telephone } => {
            let user = service.get_by_phone(&telephone).await?;
            output(&UserOutput::from(&user), json_mode);
        }

        UserCommands::Update { uuid, nickname, avatar, gender, signature, birthday } => {
            let gender = match gender {
                Some(g) => Some(Gender::from_str(&g).ok_or_else(|| anyhow::anyhow!("Invalid gender: {g}"))?),
                None => None,
            };
            let patch = ProfilePatch {
                nickname,
                avatar,
                gender,
                signature,
                birthday,
            };
            let user = service.update_profile(&uuid, patch).await?;
            output(&UserOutput::from(&user), json_mode);
        }

        UserCommands::ChangePhone { uuid, telephone } => {
            let user = service.change_phone(&uuid, &telephone).await?;
            output(&UserOutput::from(&user), json_mode);
        }

        UserCommands::Batch { uuids } => {
            let users = service.batch_get(&uuids).await?;
            let total = users.len() as u64;
            output(&UserListOutput::from_users(&users, total), json_mode);
        }

        UserCommands::Search { keyword, page, size } => {
            let (users, total) = service.search(&keyword, Page::new(page, size)).await?;
            output(&UserListOutput::from_users(&users, total), json_mode);
        }
    }

    Ok(())
}
