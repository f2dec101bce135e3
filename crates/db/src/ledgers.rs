//! Progress ledger queries
//!
//! A ledger row is created lazily with Bronze defaults. Every XP mutation goes
//! through [`lock`] inside a transaction so writes for one user serialize on
//! that user's row.

use common::models::ProgressLedger;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgExecutor, Row};
use uuid::Uuid;

const LEDGER_COLUMNS: &str =
    "user_id, xp, rank, level_name, goal_achieved, monthly_challenge_target, updated_at";

fn ledger_from_row(r: &PgRow) -> ProgressLedger {
    ProgressLedger {
        user_id: r.get("user_id"),
        xp: r.get("xp"),
        rank: r.get("rank"),
        level_name: r.get("level_name"),
        goal_achieved: r.get("goal_achieved"),
        monthly_challenge_target: r.get("monthly_challenge_target"),
        updated_at: r.get("updated_at"),
    }
}

/// Create the default ledger row if the user has none yet
pub async fn ensure(executor: impl PgExecutor<'_>, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO progress_ledgers (user_id)
        VALUES ($1)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get a user's ledger without creating it
pub async fn get(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Option<ProgressLedger>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM progress_ledgers WHERE user_id = $1",
        LEDGER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.as_ref().map(ledger_from_row))
}

/// Get a user's ledger, creating the default row on first access
pub async fn get_or_create(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<ProgressLedger, sqlx::Error> {
    ensure(&mut *conn, user_id).await?;
    let row = sqlx::query(&format!(
        "SELECT {} FROM progress_ledgers WHERE user_id = $1",
        LEDGER_COLUMNS
    ))
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(ledger_from_row(&row))
}

/// Lock a user's ledger row for the rest of the transaction, creating it if needed
pub async fn lock(conn: &mut PgConnection, user_id: Uuid) -> Result<ProgressLedger, sqlx::Error> {
    ensure(&mut *conn, user_id).await?;
    let row = sqlx::query(&format!(
        "SELECT {} FROM progress_ledgers WHERE user_id = $1 FOR UPDATE",
        LEDGER_COLUMNS
    ))
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(ledger_from_row(&row))
}

/// Persist new XP and level values. Caller must hold the row lock.
pub async fn update_progress(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    xp: i64,
    rank: i32,
    level_name: &str,
) -> Result<ProgressLedger, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE progress_ledgers
        SET xp = $2, rank = $3, level_name = $4, updated_at = NOW()
        WHERE user_id = $1
        RETURNING {}
        "#,
        LEDGER_COLUMNS
    ))
    .bind(user_id)
    .bind(xp)
    .bind(rank)
    .bind(level_name)
    .fetch_one(executor)
    .await?;

    Ok(ledger_from_row(&row))
}

/// Store the goal achievement flag
pub async fn set_goal_achieved(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    achieved: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE progress_ledgers
        SET goal_achieved = $2, updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(achieved)
    .execute(executor)
    .await?;

    Ok(())
}

/// Override (or clear, with `None`) the user's monthly challenge target
pub async fn set_monthly_target(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    target: Option<i32>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE progress_ledgers
        SET monthly_challenge_target = $2, updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(target)
    .execute(executor)
    .await?;

    Ok(())
}
