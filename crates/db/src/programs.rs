//! Program and workout unit queries (read-only)

use common::models::{Difficulty, Program, WorkoutUnit};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

fn program_from_row(r: &PgRow) -> Program {
    let difficulty: String = r.get("difficulty_level");
    Program {
        id: r.get("id"),
        coach_id: r.get("coach_id"),
        title: r.get("title"),
        difficulty: Difficulty::parse(&difficulty),
        category: r.get("category"),
        is_public: r.get("is_public"),
        level_access: r.get("level_access"),
        created_at: r.get("created_at"),
    }
}

fn unit_from_row(r: &PgRow) -> WorkoutUnit {
    WorkoutUnit {
        id: r.get("id"),
        program_id: r.get("program_id"),
        day_number: r.get("day_number"),
        title: r.get("title"),
        duration_minutes: r.get("duration_minutes"),
    }
}

/// Get a program by ID
pub async fn get_by_id(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<Program>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, coach_id, title, difficulty_level, category, is_public, level_access, created_at
        FROM programs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row.as_ref().map(program_from_row))
}

/// Get a workout unit by ID
pub async fn get_unit(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<WorkoutUnit>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, program_id, day_number, title, duration_minutes
        FROM workout_units
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row.as_ref().map(unit_from_row))
}

/// All units of a program scheduled on the same day
pub async fn list_units_for_day(
    executor: impl PgExecutor<'_>,
    program_id: Uuid,
    day_number: i32,
) -> Result<Vec<WorkoutUnit>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, program_id, day_number, title, duration_minutes
        FROM workout_units
        WHERE program_id = $1 AND day_number = $2
        ORDER BY id
        "#,
    )
    .bind(program_id)
    .bind(day_number)
    .fetch_all(executor)
    .await?;

    Ok(rows.iter().map(unit_from_row).collect())
}

/// Number of distinct day numbers a program spans
pub async fn count_days(executor: impl PgExecutor<'_>, program_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(DISTINCT day_number) as count
        FROM workout_units
        WHERE program_id = $1
        "#,
    )
    .bind(program_id)
    .fetch_one(executor)
    .await?;

    Ok(row.get::<i64, _>("count"))
}
