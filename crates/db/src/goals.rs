//! Fitness goal queries

use chrono::NaiveDate;
use common::models::{Goal, GoalType};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

use crate::decode_error;

fn goal_from_row(r: &PgRow) -> Result<Goal, sqlx::Error> {
    let goal_type: String = r.try_get("goal_type")?;
    Ok(Goal {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        goal_type: GoalType::parse(&goal_type)
            .ok_or_else(|| decode_error("goal_type", &goal_type))?,
        start_date: r.try_get("start_date")?,
        end_date: r.try_get("end_date")?,
    })
}

/// Goals with no end date
pub async fn list_active(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Vec<Goal>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, goal_type, start_date, end_date
        FROM goals
        WHERE user_id = $1 AND end_date IS NULL
        ORDER BY start_date DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(goal_from_row).collect()
}

/// Start an ongoing goal of this type.
///
/// Returns `None` if the user already has an ongoing goal of the same type.
pub async fn insert_active(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    goal_type: GoalType,
    start_date: NaiveDate,
) -> Result<Option<Goal>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO goals (id, user_id, goal_type, start_date, end_date)
        VALUES ($1, $2, $3, $4, NULL)
        ON CONFLICT (user_id, goal_type) WHERE end_date IS NULL DO NOTHING
        RETURNING id, user_id, goal_type, start_date, end_date
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(goal_type.as_str())
    .bind(start_date)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(goal_from_row).transpose()
}

/// The ongoing goal of one type
pub async fn find_active(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    goal_type: GoalType,
) -> Result<Option<Goal>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, goal_type, start_date, end_date
        FROM goals
        WHERE user_id = $1 AND goal_type = $2 AND end_date IS NULL
        "#,
    )
    .bind(user_id)
    .bind(goal_type.as_str())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(goal_from_row).transpose()
}

/// End one ongoing goal, returns false if no such active goal exists
pub async fn end_goal(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    goal_id: Uuid,
    end_date: NaiveDate,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE goals
        SET end_date = $3
        WHERE id = $1 AND user_id = $2 AND end_date IS NULL
        "#,
    )
    .bind(goal_id)
    .bind(user_id)
    .bind(end_date)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
