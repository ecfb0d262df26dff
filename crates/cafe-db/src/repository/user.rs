//! # User Repository
//!
//! Accounts, credentials, and owner membership.
//!
//! The password hash is read only by [`UserRepository::find_credentials`];
//! every other read returns a [`User`] without it.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, generate_id, to_json};
use cafe_core::{Permission, Role, User};

const USER_COLUMNS: &str =
    "id, owner_id, name, email, role, permissions, is_active, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    owner_id: Option<String>,
    name: String,
    email: String,
    role: Role,
    permissions: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> DbResult<Self> {
        Ok(User {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            email: row.email,
            role: row.role,
            permissions: from_json(&row.permissions)?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Fields for a new account. The caller hashes the password.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// `None` for a cafe owner registering itself.
    pub owner_id: Option<String>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account.
    ///
    /// ## Errors
    /// `UniqueViolation` on `email` if it is already registered (any case).
    pub async fn insert(&self, new: NewUser) -> DbResult<User> {
        let now = Utc::now();
        let user = User {
            id: generate_id(),
            owner_id: new.owner_id,
            name: new.name.trim().to_string(),
            email: new.email.trim().to_lowercase(),
            role: new.role,
            permissions: new.permissions,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %user.id, role = %user.role, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, owner_id, name, email, password_hash, role, permissions,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&user.id)
        .bind(&user.owner_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&new.password_hash)
        .bind(user.role)
        .bind(to_json(&user.permissions)?)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&user.email))?;

        Ok(user)
    }

    /// Looks up an account and its password hash by email.
    pub async fn find_credentials(&self, email: &str) -> DbResult<Option<(User, String)>> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE email = ?1",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some((User::try_from(row.user)?, row.password_hash))),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    pub async fn find(&self, id: &str) -> DbResult<User> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Accounts working under an owner, oldest first.
    pub async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE owner_id = ?1 ORDER BY created_at",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}
