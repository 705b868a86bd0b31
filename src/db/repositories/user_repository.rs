use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::auth_stores::{CredentialRecord, NewUser, StoreError, UserProfile, UserStore};
use crate::models::role::{Role, UserId};

#[derive(Debug, Clone, FromRow)]
struct CredentialRow {
    id: i64,
    email: String,
    role: String,
    password_hash: String,
}

#[derive(Debug, Clone, FromRow)]
struct ProfileRow {
    id: i64,
    email: String,
    username: String,
    role: String,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: UserId(row.id),
            email: row.email,
            username: row.username,
            role: parse_role(row.id, &row.role)?,
        })
    }
}

fn parse_role(id: i64, raw: &str) -> Result<Role, StoreError> {
    raw.parse::<Role>()
        .map_err(|e| StoreError::Corrupt(format!("user {}: {}", id, e)))
}

fn map_sqlx_error(context: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate("email is already registered".to_string());
        }
    }
    StoreError::Unavailable(format!("{}: {}", context, e))
}

/// `UserStore` over the `users` table.
#[derive(Clone)]
pub struct UserRepository {
    db_pool: PgPool,
}

impl UserRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn lookup_credential(&self, email: &str) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, email, role, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to fetch credentials", e))?;

        row.map(|row| -> Result<CredentialRecord, StoreError> {
            Ok(CredentialRecord {
                user_id: UserId(row.id),
                role: parse_role(row.id, &row.role)?,
                email: row.email,
                password_hash: row.password_hash,
            })
        })
        .transpose()
    }

    async fn lookup_role(&self, user_id: UserId) -> Result<Option<Role>, StoreError> {
        let role: Option<(String,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to fetch user role", e))?;

        role.map(|(raw,)| parse_role(user_id.0, &raw)).transpose()
    }

    async fn lookup_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, email, username, role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.0)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to fetch user", e))?;

        row.map(UserProfile::try_from).transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO users (email, username, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, role
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create user", e))?;

        UserProfile::try_from(row)
    }
}
