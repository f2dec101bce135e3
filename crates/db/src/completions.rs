//! Completion record queries

use chrono::{DateTime, Utc};
use common::models::CompletionRecord;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

fn record_from_row(r: &PgRow) -> CompletionRecord {
    CompletionRecord {
        id: r.get("id"),
        user_id: r.get("user_id"),
        workout_unit_id: r.get("workout_unit_id"),
        completed_at: r.get("completed_at"),
        xp_earned: r.get("xp_earned"),
    }
}

/// Aggregate completion numbers used by goal evaluation
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionTotals {
    pub completed_units: i64,
    pub total_duration_minutes: i64,
}

/// Get the completion record for a (user, unit) pair
pub async fn get(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    workout_unit_id: Uuid,
) -> Result<Option<CompletionRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, workout_unit_id, completed_at, xp_earned
        FROM completion_records
        WHERE user_id = $1 AND workout_unit_id = $2
        "#,
    )
    .bind(user_id)
    .bind(workout_unit_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.as_ref().map(record_from_row))
}

/// Insert a completion record.
///
/// Returns `None` when a record for the pair already exists, including when a
/// concurrent insert won the race.
pub async fn insert(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    workout_unit_id: Uuid,
    xp_earned: i64,
) -> Result<Option<CompletionRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO completion_records (id, user_id, workout_unit_id, completed_at, xp_earned)
        VALUES ($1, $2, $3, NOW(), $4)
        ON CONFLICT (user_id, workout_unit_id) DO NOTHING
        RETURNING id, user_id, workout_unit_id, completed_at, xp_earned
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(workout_unit_id)
    .bind(xp_earned)
    .fetch_optional(executor)
    .await?;

    Ok(row.as_ref().map(record_from_row))
}

/// List a user's completions since a point in time, newest first
pub async fn list_since(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<CompletionRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, workout_unit_id, completed_at, xp_earned
        FROM completion_records
        WHERE user_id = $1 AND completed_at >= $2
        ORDER BY completed_at DESC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(executor)
    .await?;

    Ok(rows.iter().map(record_from_row).collect())
}

/// Distinct UTC calendar days on which the user completed anything, newest first
pub async fn list_active_days(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Vec<chrono::NaiveDate>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT (completed_at AT TIME ZONE 'UTC')::date as day
        FROM completion_records
        WHERE user_id = $1
        ORDER BY day DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.iter().map(|r| r.get("day")).collect())
}

/// Count and summed duration of everything the user has completed
pub async fn totals_for_user(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<CompletionTotals, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) as completed_units,
               COALESCE(SUM(u.duration_minutes), 0)::bigint as total_duration
        FROM completion_records c
        JOIN workout_units u ON u.id = c.workout_unit_id
        WHERE c.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await?;

    Ok(CompletionTotals {
        completed_units: row.get("completed_units"),
        total_duration_minutes: row.get("total_duration"),
    })
}

/// Day numbers of a program where the user completed at least one unit, ascending
pub async fn completed_day_numbers(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    program_id: Uuid,
) -> Result<Vec<i32>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT u.day_number
        FROM completion_records c
        JOIN workout_units u ON u.id = c.workout_unit_id
        WHERE c.user_id = $1 AND u.program_id = $2
        ORDER BY u.day_number
        "#,
    )
    .bind(user_id)
    .bind(program_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.iter().map(|r| r.get("day_number")).collect())
}

/// XP the user earned from units of one program
pub async fn xp_for_program(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    program_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COALESCE(SUM(c.xp_earned), 0)::bigint as xp
        FROM completion_records c
        JOIN workout_units u ON u.id = c.workout_unit_id
        WHERE c.user_id = $1 AND u.program_id = $2
        "#,
    )
    .bind(user_id)
    .bind(program_id)
    .fetch_one(executor)
    .await?;

    Ok(row.get::<i64, _>("xp"))
}
