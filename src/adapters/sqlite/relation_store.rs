//! SQLite implementation of the RelationStore.
//!
//! Every write stamps the row with the owner's next version:
//! `MAX(now, highest updated_at among the owner's rows + 1)`. Versions are
//! therefore strictly increasing across an owner's whole relationship set,
//! so a write committed after a sync read always sorts after the
//! `latest_version` that read returned. The version is computed inside the
//! writing statement, which SQLite serialises.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

use super::{now_millis, parse_millis};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ChangeSlice, Page, Relation, RelationStatus, SyncCursor};
use crate::domain::ports::RelationStore;

const RELATION_COLUMNS: &str =
    "id, owner_uuid, peer_uuid, status, remark, group_tag, source, created_at, updated_at";

/// Next version for owner `?1` at wall-clock time `?2`.
const NEXT_VERSION: &str =
    "MAX(?2, (SELECT COALESCE(MAX(updated_at), 0) FROM user_relations WHERE owner_uuid = ?1) + 1)";

pub struct SqliteRelationStore {
    pool: SqlitePool,
}

impl SqliteRelationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an active row, or reactivate a removed one. Rows that are
    /// already active are returned unchanged.
    async fn activate(conn: &mut SqliteConnection, owner: &str, peer: &str, source: &str, now: i64) -> DomainResult<Relation> {
        // `WHERE true` keeps SQLite from parsing ON CONFLICT as a join constraint
        let upserted: Option<RelationRow> = sqlx::query_as(&format!(
            r#"INSERT INTO user_relations (owner_uuid, peer_uuid, status, remark, group_tag, source, created_at, updated_at)
               SELECT ?1, ?3, 0, '', '', ?4, v, v FROM (SELECT {NEXT_VERSION} AS v) WHERE true
               ON CONFLICT (owner_uuid, peer_uuid) DO UPDATE
                   SET status = 0,
                       source = excluded.source,
                       created_at = excluded.created_at,
                       updated_at = excluded.updated_at
                   WHERE user_relations.status = 2
               RETURNING {RELATION_COLUMNS}"#
        ))
        .bind(owner)
        .bind(now)
        .bind(peer)
        .bind(source)
        .fetch_optional(&mut *conn)
        .await?;

        match upserted {
            Some(row) => row.try_into(),
            None => Self::fetch(conn, owner, peer)
                .await?
                .ok_or_else(|| DomainError::relation_not_found(owner, peer)),
        }
    }

    async fn fetch(conn: &mut SqliteConnection, owner: &str, peer: &str) -> DomainResult<Option<Relation>> {
        let row: Option<RelationRow> = sqlx::query_as(&format!(
            "SELECT {RELATION_COLUMNS} FROM user_relations WHERE owner_uuid = ? AND peer_uuid = ?"
        ))
        .bind(owner)
        .bind(peer)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Move `owner -> peer` from status `from` to `to`. Returns whether a
    /// row changed.
    async fn transition(&self, owner: &str, peer: &str, from: RelationStatus, to: RelationStatus) -> DomainResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE user_relations SET status = ?4, updated_at = {NEXT_VERSION}
             WHERE owner_uuid = ?1 AND peer_uuid = ?3 AND status = ?5"
        ))
        .bind(owner)
        .bind(now_millis())
        .bind(peer)
        .bind(to.as_i64())
        .bind(from.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_text_column(&self, column: &'static str, owner: &str, peer: &str, value: &str) -> DomainResult<Relation> {
        let row: Option<RelationRow> = sqlx::query_as(&format!(
            "UPDATE user_relations SET {column} = ?4, updated_at = {NEXT_VERSION}
             WHERE owner_uuid = ?1 AND peer_uuid = ?3
             RETURNING {RELATION_COLUMNS}"
        ))
        .bind(owner)
        .bind(now_millis())
        .bind(peer)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| DomainError::relation_not_found(owner, peer))?.try_into()
    }
}

#[async_trait]
impl RelationStore for SqliteRelationStore {
    async fn get(&self, owner: &str, peer: &str) -> DomainResult<Option<Relation>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, owner, peer).await
    }

    async fn create_pair(&self, owner: &str, peer: &str, source: &str) -> DomainResult<(Relation, Relation)> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let forward = Self::activate(&mut tx, owner, peer, source, now).await?;
        let backward = Self::activate(&mut tx, peer, owner, source, now).await?;

        tx.commit().await?;
        Ok((forward, backward))
    }

    async fn remove(&self, owner: &str, peer: &str) -> DomainResult<bool> {
        if self.transition(owner, peer, RelationStatus::Active, RelationStatus::Removed).await? {
            return Ok(true);
        }

        match self.get(owner, peer).await? {
            Some(_) => Ok(false),
            None => Err(DomainError::relation_not_found(owner, peer)),
        }
    }

    async fn set_remark(&self, owner: &str, peer: &str, remark: &str) -> DomainResult<Relation> {
        self.set_text_column("remark", owner, peer, remark).await
    }

    async fn set_group_tag(&self, owner: &str, peer: &str, group_tag: &str) -> DomainResult<Relation> {
        self.set_text_column("group_tag", owner, peer, group_tag).await
    }

    async fn block(&self, owner: &str, target: &str) -> DomainResult<Relation> {
        let mut conn = self.pool.acquire().await?;

        let upserted: Option<RelationRow> = sqlx::query_as(&format!(
            r#"INSERT INTO user_relations (owner_uuid, peer_uuid, status, remark, group_tag, source, created_at, updated_at)
               SELECT ?1, ?3, 1, '', '', '', v, v FROM (SELECT {NEXT_VERSION} AS v) WHERE true
               ON CONFLICT (owner_uuid, peer_uuid) DO UPDATE
                   SET status = 1,
                       updated_at = excluded.updated_at
                   WHERE user_relations.status != 1
               RETURNING {RELATION_COLUMNS}"#
        ))
        .bind(owner)
        .bind(now_millis())
        .bind(target)
        .fetch_optional(&mut *conn)
        .await?;

        match upserted {
            Some(row) => row.try_into(),
            None => Self::fetch(&mut conn, owner, target)
                .await?
                .ok_or_else(|| DomainError::relation_not_found(owner, target)),
        }
    }

    async fn unblock(&self, owner: &str, target: &str) -> DomainResult<bool> {
        self.transition(owner, target, RelationStatus::Blocked, RelationStatus::Removed).await
    }

    async fn list(
        &self,
        owner: &str,
        status: RelationStatus,
        group_tag: Option<&str>,
        page: Page,
    ) -> DomainResult<(Vec<Relation>, u64)> {
        let filter = "owner_uuid = ?1 AND status = ?2 AND (?3 IS NULL OR group_tag = ?3)";

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM user_relations WHERE {filter}"))
            .bind(owner)
            .bind(status.as_i64())
            .bind(group_tag)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<RelationRow> = sqlx::query_as(&format!(
            "SELECT {RELATION_COLUMNS} FROM user_relations WHERE {filter}
             ORDER BY updated_at DESC, id DESC LIMIT ?4 OFFSET ?5"
        ))
        .bind(owner)
        .bind(status.as_i64())
        .bind(group_tag)
        .bind(i64::from(page.size))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let relations = rows.into_iter().map(TryInto::try_into).collect::<DomainResult<Vec<_>>>()?;
        Ok((relations, u64::try_from(total).unwrap_or(0)))
    }

    async fn list_tags(&self, owner: &str) -> DomainResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT group_tag FROM user_relations
             WHERE owner_uuid = ? AND status = 0 AND group_tag != '' ORDER BY group_tag"
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(tag,)| tag).collect())
    }

    async fn changes_since(&self, owner: &str, cursor: &SyncCursor, limit: u32) -> DomainResult<ChangeSlice> {
        // Both reads share one transaction so the page and the high-water
        // mark describe the same snapshot.
        let mut tx = self.pool.begin().await?;

        let (max_version,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(updated_at) FROM user_relations WHERE owner_uuid = ?")
                .bind(owner)
                .fetch_one(&mut *tx)
                .await?;

        let rows: Vec<RelationRow> = sqlx::query_as(&format!(
            "SELECT {RELATION_COLUMNS} FROM user_relations
             WHERE owner_uuid = ?1 AND (updated_at > ?2 OR (updated_at = ?2 AND id > ?3))
             ORDER BY updated_at ASC, id ASC
             LIMIT ?4"
        ))
        .bind(owner)
        .bind(cursor.version)
        .bind(cursor.last_id)
        .bind(i64::from(limit))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ChangeSlice {
            rows: rows.into_iter().map(TryInto::try_into).collect::<DomainResult<Vec<_>>>()?,
            max_version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RelationRow {
    id: i64,
    owner_uuid: String,
    peer_uuid: String,
    status: i64,
    remark: String,
    group_tag: String,
    source: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<RelationRow> for Relation {
    type Error = DomainError;

    fn try_from(row: RelationRow) -> Result<Self, Self::Error> {
        let status = RelationStatus::from_i64(row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid relation status: {}", row.status)))?;

        Ok(Relation {
            id: row.id,
            owner_uuid: row.owner_uuid,
            peer_uuid: row.peer_uuid,
            status,
            remark: row.remark,
            group_tag: row.group_tag,
            source: row.source,
            created_at: parse_millis(row.created_at)?,
            updated_at: parse_millis(row.updated_at)?,
        })
    }
}
