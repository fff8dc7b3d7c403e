//! Incremental relationship sync types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::relation::{Relation, RelationStatus};
use crate::domain::errors::DomainError;

/// Position in an owner's relationship change feed.
///
/// Rows are totally ordered by `(updated_at, id)`. A cursor names the last
/// row the client has consumed, so rows sharing a timestamp with it but
/// sorting later are still delivered on the next page. It also remembers
/// `since`, the version the current round started from, so every page of
/// a round classifies rows against what the client held before the round.
///
/// Text form is a bare `"{version}"` once a round completes (everything up
/// to and including `version` seen) and `"{version}:{last_id}:{since}"`
/// mid-round. The two-part `"{version}:{last_id}"` is read with `since`
/// equal to `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyncCursor {
    pub version: i64,
    pub last_id: i64,
    pub since: i64,
}

impl SyncCursor {
    /// Cursor for a full initial sync.
    pub const fn initial() -> Self {
        Self { version: 0, last_id: 0, since: 0 }
    }

    /// Cursor covering every row with `updated_at <= version`.
    pub const fn after_version(version: i64) -> Self {
        if version <= 0 {
            Self::initial()
        } else {
            Self { version, last_id: i64::MAX, since: version }
        }
    }

    /// Cursor positioned just after `relation`, within the same round.
    pub fn next_after(&self, relation: &Relation) -> Self {
        Self {
            version: relation.version(),
            last_id: relation.id,
            since: self.since,
        }
    }

    pub const fn is_initial(&self) -> bool {
        self.version == 0 && self.last_id == 0
    }

    const fn is_round_boundary(&self) -> bool {
        self.last_id == i64::MAX || self.is_initial()
    }
}

impl Default for SyncCursor {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for SyncCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_round_boundary() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}:{}:{}", self.version, self.last_id, self.since)
        }
    }
}

impl FromStr for SyncCursor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::initial());
        }

        let invalid = || DomainError::InvalidCursor(s.to_string());
        let parse = |part: &str| part.parse::<i64>().ok().filter(|v| *v >= 0).ok_or_else(invalid);

        let parts: Vec<&str> = s.split(':').collect();
        let cursor = match parts.as_slice() {
            [version] => return Ok(Self::after_version(parse(*version)?)),
            [version, last_id] => {
                let version = parse(*version)?;
                Self { version, last_id: parse(*last_id)?, since: version }
            }
            [version, last_id, since] => Self {
                version: parse(*version)?,
                last_id: parse(*last_id)?,
                since: parse(*since)?,
            },
            _ => return Err(invalid()),
        };

        if cursor.since > cursor.version || (cursor.version == 0 && cursor.last_id != 0) {
            return Err(invalid());
        }
        Ok(cursor)
    }
}

/// Raw rows read from the store for one sync call.
///
/// Both fields come from the same read snapshot.
#[derive(Debug, Clone, Default)]
pub struct ChangeSlice {
    pub rows: Vec<Relation>,
    /// Maximum `updated_at` (epoch millis) across all of the owner's rows.
    pub max_version: Option<i64>,
}

/// Response of one incremental sync call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPage {
    pub changes: Vec<RelationChange>,
    /// The client must call again with `next_cursor`.
    pub has_more: bool,
    /// High-water mark across the owner's whole relationship set.
    pub latest_version: i64,
    pub next_cursor: String,
}
