//! Assignment queries

use chrono::NaiveDate;
use common::models::{Assignment, AssignmentStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

use crate::decode_error;

fn assignment_from_row(r: &PgRow) -> Result<Assignment, sqlx::Error> {
    let status: String = r.try_get("status")?;
    Ok(Assignment {
        id: r.try_get("id")?,
        member_id: r.try_get("member_id")?,
        program_id: r.try_get("program_id")?,
        status: AssignmentStatus::parse(&status).ok_or_else(|| decode_error("status", &status))?,
        assigned_date: r.try_get("assigned_date")?,
        due_date: r.try_get("due_date")?,
        completed_date: r.try_get("completed_date")?,
    })
}

/// Create an assignment.
///
/// Returns `None` if the member already has this program assigned.
pub async fn insert(
    executor: impl PgExecutor<'_>,
    member_id: Uuid,
    program_id: Uuid,
    assigned_date: NaiveDate,
    due_date: Option<NaiveDate>,
) -> Result<Option<Assignment>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO assignments (id, member_id, program_id, status, assigned_date, due_date)
        VALUES ($1, $2, $3, 'assigned', $4, $5)
        ON CONFLICT (member_id, program_id) DO NOTHING
        RETURNING id, member_id, program_id, status, assigned_date, due_date, completed_date
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(member_id)
    .bind(program_id)
    .bind(assigned_date)
    .bind(due_date)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(assignment_from_row).transpose()
}

/// Get assignment by ID
pub async fn get_by_id(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<Assignment>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, member_id, program_id, status, assigned_date, due_date, completed_date
        FROM assignments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(assignment_from_row).transpose()
}

/// Get an assignment and lock it for the rest of the transaction
pub async fn lock(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<Assignment>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, member_id, program_id, status, assigned_date, due_date, completed_date
        FROM assignments
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(assignment_from_row).transpose()
}

/// Lock the member's assignment for a program, if there is one
pub async fn lock_for_member_program(
    executor: impl PgExecutor<'_>,
    member_id: Uuid,
    program_id: Uuid,
) -> Result<Option<Assignment>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, member_id, program_id, status, assigned_date, due_date, completed_date
        FROM assignments
        WHERE member_id = $1 AND program_id = $2
        FOR UPDATE
        "#,
    )
    .bind(member_id)
    .bind(program_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(assignment_from_row).transpose()
}

/// Find the member's assignment for a program
pub async fn find_for_member_program(
    executor: impl PgExecutor<'_>,
    member_id: Uuid,
    program_id: Uuid,
) -> Result<Option<Assignment>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, member_id, program_id, status, assigned_date, due_date, completed_date
        FROM assignments
        WHERE member_id = $1 AND program_id = $2
        "#,
    )
    .bind(member_id)
    .bind(program_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(assignment_from_row).transpose()
}

/// List a member's assignments, most recent first
pub async fn list_for_member(
    executor: impl PgExecutor<'_>,
    member_id: Uuid,
) -> Result<Vec<Assignment>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, member_id, program_id, status, assigned_date, due_date, completed_date
        FROM assignments
        WHERE member_id = $1
        ORDER BY assigned_date DESC, id
        "#,
    )
    .bind(member_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(assignment_from_row).collect()
}

/// The assignment a member should work on next: one already in progress,
/// otherwise the oldest not yet started. Paused and completed ones are skipped.
pub async fn next_active(
    executor: impl PgExecutor<'_>,
    member_id: Uuid,
) -> Result<Option<Assignment>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, member_id, program_id, status, assigned_date, due_date, completed_date
        FROM assignments
        WHERE member_id = $1 AND status IN ('pending', 'assigned', 'in_progress')
        ORDER BY (status = 'in_progress') DESC, assigned_date, id
        LIMIT 1
        "#,
    )
    .bind(member_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(assignment_from_row).transpose()
}

/// Write status and completion date together
pub async fn update_status(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    status: AssignmentStatus,
    completed_date: Option<NaiveDate>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE assignments
        SET status = $2, completed_date = $3
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(completed_date)
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete an assignment, returns true if a row was removed
pub async fn delete(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
