//! Identity record domain model.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
}

impl UserStatus {
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Active => 0,
            Self::Disabled => 1,
        }
    }

    pub const fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Active),
            1 => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Male => 0,
            Self::Female => 1,
            Self::Unknown => 2,
        }
    }

    /// Unrecognised codes decode as `Unknown`.
    pub const fn from_i64(v: i64) -> Self {
        match v {
            0 => Self::Male,
            1 => Self::Female,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unknown => "unknown",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "male" | "0" => Some(Self::Male),
            "female" | "1" => Some(Self::Female),
            "unknown" | "2" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A user identity record.
///
/// `uuid` never changes after creation. `telephone` is the secondary
/// lookup key and only changes through an explicit phone change.
/// Timestamps carry millisecond precision, matching what the store keeps,
/// so a record survives a store or cache round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: String,
    pub telephone: String,
    pub email: Option<String>,
    pub nickname: String,
    pub avatar: String,
    pub gender: Gender,
    pub signature: String,
    /// `YYYY-MM-DD`, empty when unset.
    pub birthday: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with a freshly assigned identifier.
    pub fn new(telephone: impl Into<String>, nickname: impl Into<String>) -> Self {
        let now = Utc::now().trunc_subsecs(3);
        Self {
            uuid: Uuid::new_v4().to_string(),
            telephone: telephone.into(),
            email: None,
            nickname: nickname.into(),
            avatar: String::new(),
            gender: Gender::Unknown,
            signature: String::new(),
            birthday: String::new(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Result of a store update: the record as persisted plus the phone
/// number it carried before the write.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub user: User,
    pub previous_telephone: String,
}

impl UserUpdate {
    pub fn phone_changed(&self) -> bool {
        self.previous_telephone != self.user.telephone
    }
}

/// Partial profile edit applied by the service layer.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<Gender>,
    pub signature: Option<String>,
    pub birthday: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none()
            && self.avatar.is_none()
            && self.gender.is_none()
            && self.signature.is_none()
            && self.birthday.is_none()
    }
}

/// Field-level edit of a stored user. Unset fields keep whatever the
/// store holds at write time, so an edit never carries other fields from
/// an older read.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub telephone: Option<String>,
    pub status: Option<UserStatus>,
    pub profile: ProfilePatch,
}

impl UserChanges {
    pub fn telephone(telephone: impl Into<String>) -> Self {
        Self {
            telephone: Some(telephone.into()),
            ..Default::default()
        }
    }

    pub fn status(status: UserStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.telephone.is_none() && self.status.is_none() && self.profile.is_empty()
    }
}

impl From<ProfilePatch> for UserChanges {
    fn from(profile: ProfilePatch) -> Self {
        Self {
            profile,
            ..Default::default()
        }
    }
}

/// Offset pagination for list and search operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub const fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    /// Pages are 1-based; page 0 is read as page 1.
    pub const fn offset(&self) -> i64 {
        let number = if self.number == 0 { 1 } else { self.number };
        (number as i64 - 1) * self.size as i64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 1, size: 20 }
    }
}
