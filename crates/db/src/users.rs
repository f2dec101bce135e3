//! User queries
//!
//! Users are created by the identity service; the engine only looks them up.

use common::models::User;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

/// Get user by ID
pub async fn get_by_id(executor: impl PgExecutor<'_>, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query("SELECT id, username, role, created_at FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|r| User {
        id: r.get("id"),
        username: r.get("username"),
        role: r.get("role"),
        created_at: r.get("created_at"),
    }))
}

/// Check if a user exists
pub async fn exists(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1) as exists")
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(row.get::<bool, _>("exists"))
}
