use axum::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// Fields for a user about to be inserted. The password arrives here already
/// hashed; plaintext never crosses this boundary.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    /// The storage-level unique constraint rejected the insert. Two
    /// concurrent registrations race here; the loser surfaces this.
    #[error("email or username already taken")]
    Duplicate { email: bool, username: bool },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, new_user: NewUser) -> Result<User, CreateUserError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, email, username, name, password_hash, created_at";

/// Maps a unique-violation constraint name to the colliding field. A 23505
/// from a constraint this store does not know about is not a duplicate the
/// client can act on, so it falls through to an internal error.
fn map_unique_violation(constraint: Option<&str>) -> Option<CreateUserError> {
    match constraint {
        Some("users_email_key") => Some(CreateUserError::Duplicate {
            email: true,
            username: false,
        }),
        Some("users_username_key") => Some(CreateUserError::Duplicate {
            email: false,
            username: true,
        }),
        _ => None,
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, CreateUserError> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, username, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                match map_unique_violation(db_err.constraint()) {
                    Some(duplicate) => Err(duplicate),
                    None => Err(CreateUserError::Other(
                        sqlx::Error::Database(db_err).into(),
                    )),
                }
            }
            Err(e) => Err(CreateUserError::Other(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_by_constraint_name() {
        assert!(matches!(
            map_unique_violation(Some("users_email_key")),
            Some(CreateUserError::Duplicate {
                email: true,
                username: false
            })
        ));
        assert!(matches!(
            map_unique_violation(Some("users_username_key")),
            Some(CreateUserError::Duplicate {
                email: false,
                username: true
            })
        ));
    }

    #[test]
    fn unrecognized_constraint_is_not_a_duplicate() {
        assert!(map_unique_violation(Some("users_pkey")).is_none());
        assert!(map_unique_violation(None).is_none());
    }
}
