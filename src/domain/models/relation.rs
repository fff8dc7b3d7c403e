//! Relationship record domain model.
//!
//! Relationships are directional: `(owner, peer)` and `(peer, owner)` are
//! separate rows. Befriending writes both rows in one transaction, while
//! unfriending only flips the owner's row to `Removed`. The peer keeps its
//! own row until it removes the owner itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted status of a relationship row.
///
/// "Never existed" is not a row status; see [`RelationState::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationStatus {
    Active,
    Blocked,
    Removed,
}

impl RelationStatus {
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Active => 0,
            Self::Blocked => 1,
            Self::Removed => 2,
        }
    }

    pub const fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Active),
            1 => Some(Self::Blocked),
            2 => Some(Self::Removed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Removed => "removed",
        }
    }

    /// Whether the peer counts as a friend of the owner.
    pub const fn is_friend(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A directional relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Store-assigned row id; tie-break key for sync ordering.
    pub id: i64,
    pub owner_uuid: String,
    pub peer_uuid: String,
    pub status: RelationStatus,
    pub remark: String,
    pub group_tag: String,
    /// Where the relationship came from (search, qr code, group...).
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relation {
    /// Sync version of this row (epoch milliseconds of `updated_at`).
    pub fn version(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }
}

/// Relationship of an owner towards a peer, including "no row at all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationState {
    None,
    Friend,
    Blocked,
    Removed,
}

impl RelationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Friend => "friend",
            Self::Blocked => "blocked",
            Self::Removed => "removed",
        }
    }
}

impl From<Option<&Relation>> for RelationState {
    fn from(relation: Option<&Relation>) -> Self {
        match relation.map(|r| r.status) {
            None => Self::None,
            Some(RelationStatus::Active) => Self::Friend,
            Some(RelationStatus::Blocked) => Self::Blocked,
            Some(RelationStatus::Removed) => Self::Removed,
        }
    }
}
