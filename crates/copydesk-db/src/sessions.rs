//! Session lookup: resolves a bearer token to the current user and their
//! premium entitlement.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub user_id: Uuid,
    pub email: String,
    pub is_premium: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub is_premium: bool,
}

/// Hex-encoded SHA-256 of a raw session token. Only hashes are stored.
#[must_use]
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Returns the unexpired session for `token_hash`, joined with its user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_session(pool: &PgPool, token_hash: &str) -> Result<Option<SessionRow>, DbError> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT s.user_id, u.email, u.is_premium, s.expires_at \
         FROM user_sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token_hash = $1 AND s.expires_at > NOW()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Looks a user up by id, for callers that already trust the id (the CLI).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_user(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>("SELECT id, email, is_premium FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}
