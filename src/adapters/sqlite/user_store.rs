//! SQLite implementation of the UserStore.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{now_millis, parse_millis};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Gender, Page, User, UserChanges, UserStatus, UserUpdate};
use crate::domain::ports::UserStore;

const USER_COLUMNS: &str =
    "uuid, telephone, email, nickname, avatar, gender, signature, birthday, status, created_at, updated_at";

pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &'static str, value: &str) -> DomainResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| DomainError::user_not_found(value))?.try_into()
    }
}

/// Empty emails are stored as NULL so the UNIQUE constraint ignores them.
fn email_column(email: Option<&String>) -> Option<&str> {
    email.map(String::as_str).filter(|e| !e.is_empty())
}

/// Escape LIKE wildcards so a keyword matches literally.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create(&self, user: &User) -> DomainResult<User> {
        sqlx::query(
            r#"INSERT INTO users (uuid, telephone, email, nickname, avatar, gender, signature, birthday, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(&user.uuid)
        .bind(&user.telephone)
        .bind(email_column(user.email.as_ref()))
        .bind(&user.nickname)
        .bind(&user.avatar)
        .bind(user.gender.as_i64())
        .bind(&user.signature)
        .bind(&user.birthday)
        .bind(user.status.as_i64())
        .bind(user.created_at.timestamp_millis())
        .bind(user.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        self.fetch_one_by("uuid", &user.uuid).await
    }

    async fn get_by_uuid(&self, uuid: &str) -> DomainResult<User> {
        self.fetch_one_by("uuid", uuid).await
    }

    async fn get_by_phone(&self, telephone: &str) -> DomainResult<User> {
        self.fetch_one_by("telephone", telephone).await
    }

    async fn get_many(&self, uuids: &[String]) -> DomainResult<Vec<User>> {
        if uuids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE uuid IN ("));
        let mut separated = qb.separated(", ");
        for uuid in uuids {
            separated.push_bind(uuid);
        }
        separated.push_unseparated(")");

        let rows: Vec<UserRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, uuid: &str, changes: &UserChanges) -> DomainResult<UserUpdate> {
        let mut tx = self.pool.begin().await?;

        // No-op write first: the transaction takes the write lock before it
        // reads, so it never has to upgrade a stale read snapshot.
        let previous: Option<(String,)> =
            sqlx::query_as("UPDATE users SET telephone = telephone WHERE uuid = ? RETURNING telephone")
                .bind(uuid)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((previous_telephone,)) = previous else {
            return Err(DomainError::user_not_found(uuid));
        };

        let profile = &changes.profile;
        let row: UserRow = sqlx::query_as(&format!(
            r#"UPDATE users
               SET telephone = COALESCE(?1, telephone),
                   nickname  = COALESCE(?2, nickname),
                   avatar    = COALESCE(?3, avatar),
                   gender    = COALESCE(?4, gender),
                   signature = COALESCE(?5, signature),
                   birthday  = COALESCE(?6, birthday),
                   status    = COALESCE(?7, status),
                   updated_at = MAX(?8, updated_at + 1)
               WHERE uuid = ?9
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(changes.telephone.as_deref())
        .bind(profile.nickname.as_deref())
        .bind(profile.avatar.as_deref())
        .bind(profile.gender.map(Gender::as_i64))
        .bind(profile.signature.as_deref())
        .bind(profile.birthday.as_deref())
        .bind(changes.status.map(UserStatus::as_i64))
        .bind(now_millis())
        .bind(uuid)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(UserUpdate {
            user: row.try_into()?,
            previous_telephone,
        })
    }

    async fn exists_by_phone(&self, telephone: &str) -> DomainResult<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE telephone = ?")
            .bind(telephone)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn exists_by_email(&self, email: &str) -> DomainResult<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn search(&self, keyword: &str, page: Page) -> DomainResult<(Vec<User>, u64)> {
        let pattern = like_pattern(keyword);
        let filter = r"status = 0 AND (telephone LIKE ?1 ESCAPE '\' OR nickname LIKE ?1 ESCAPE '\')";

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users WHERE {filter}"))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {filter} ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))
        .bind(&pattern)
        .bind(i64::from(page.size))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let users = rows.into_iter().map(TryInto::try_into).collect::<DomainResult<Vec<_>>>()?;
        Ok((users, u64::try_from(total).unwrap_or(0)))
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    uuid: String,
    telephone: String,
    email: Option<String>,
    nickname: String,
    avatar: String,
    gender: i64,
    signature: String,
    birthday: String,
    status: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let status = UserStatus::from_i64(row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid user status: {}", row.status)))?;

        Ok(User {
            uuid: row.uuid,
            telephone: row.telephone,
            email: row.email,
            nickname: row.nickname,
            avatar: row.avatar,
            gender: Gender::from_i64(row.gender),
            signature: row.signature,
            birthday: row.birthday,
            status,
            created_at: parse_millis(row.created_at)?,
            updated_at: parse_millis(row.updated_at)?,
        })
    }
}
