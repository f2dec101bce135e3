//! Assignment lifecycle
//!
//! `pending`/`assigned` -> `in_progress` -> `completed`, with `paused` on the
//! side. `overdue` is only ever a label computed when an assignment is read.

use chrono::{NaiveDate, Utc};
use common::models::{Assignment, AssignmentStatus};
use common::Error;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db_err;
use crate::ledger::{add_xp_in, ensure_user};
use crate::xp::COMPLETION_BONUS;

/// True when the due date has passed and the work isn't finished
pub fn is_overdue(assignment: &Assignment, today: NaiveDate) -> bool {
    assignment.status != AssignmentStatus::Completed
        && assignment.due_date.is_some_and(|due| due < today)
}

/// Status label shown to users
pub fn display_status(assignment: &Assignment, today: NaiveDate) -> &'static str {
    if is_overdue(assignment, today) {
        "overdue"
    } else {
        assignment.status.as_str()
    }
}

/// A due date, when given, must be strictly after today
pub fn validate_due_date(due_date: Option<NaiveDate>, today: NaiveDate) -> Result<(), Error> {
    match due_date {
        Some(due) if due <= today => Err(Error::Validation(
            "Due date must be in the future".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Status after a start request and whether it changed
pub fn start_transition(status: AssignmentStatus) -> (AssignmentStatus, bool) {
    match status {
        AssignmentStatus::Pending | AssignmentStatus::Assigned | AssignmentStatus::Paused => {
            (AssignmentStatus::InProgress, true)
        }
        AssignmentStatus::InProgress | AssignmentStatus::Completed => (status, false),
    }
}

/// Status after a pause request and whether it changed
pub fn pause_transition(status: AssignmentStatus) -> Result<(AssignmentStatus, bool), Error> {
    match status {
        AssignmentStatus::InProgress => Ok((AssignmentStatus::Paused, true)),
        AssignmentStatus::Paused => Ok((status, false)),
        AssignmentStatus::Completed => Err(Error::Validation(
            "A completed assignment cannot be paused".to_string(),
        )),
        AssignmentStatus::Pending | AssignmentStatus::Assigned => Err(Error::Validation(
            "Only an assignment in progress can be paused".to_string(),
        )),
    }
}

/// Outcome of comparing completed days against the program's days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTransition {
    /// Not all days are done yet
    Incomplete { completed_days: i64, total_days: i64 },
    /// This check moved the assignment into `completed`
    NewlyCompleted { completed_date: NaiveDate },
    /// It was already completed before
    AlreadyCompleted,
}

impl CompletionTransition {
    pub fn is_completed(&self) -> bool {
        !matches!(self, CompletionTransition::Incomplete { .. })
    }
}

/// Every day of a non-empty program has a completion
pub fn all_days_done(completed_days: i64, total_days: i64) -> bool {
    total_days > 0 && completed_days >= total_days
}

/// Decide whether an assignment is complete.
///
/// A program with no days is never complete. An assignment that is already
/// completed stays completed and keeps its original date.
pub fn evaluate_completion(
    assignment: &Assignment,
    completed_days: i64,
    total_days: i64,
    today: NaiveDate,
) -> CompletionTransition {
    if assignment.status == AssignmentStatus::Completed {
        return CompletionTransition::AlreadyCompleted;
    }
    if all_days_done(completed_days, total_days) {
        CompletionTransition::NewlyCompleted {
            completed_date: today,
        }
    } else {
        CompletionTransition::Incomplete {
            completed_days,
            total_days,
        }
    }
}

/// Apply a transition to an in-memory assignment
pub fn apply_transition(assignment: &mut Assignment, transition: &CompletionTransition) {
    if let CompletionTransition::NewlyCompleted { completed_date } = transition {
        assignment.status = AssignmentStatus::Completed;
        assignment.completed_date = Some(*completed_date);
    }
}

/// Result of a completion check, including any bonus paid
#[derive(Debug, Clone)]
pub struct CompletionCheck {
    pub assignment: Assignment,
    pub transition: CompletionTransition,
    pub bonus_awarded: i64,
    pub leveled_up: bool,
}

/// Check completion for a locked assignment inside an open transaction.
///
/// The caller must already hold the member's ledger lock. The bonus is paid
/// only on the transition into `completed`.
pub async fn check_completion_in(
    conn: &mut PgConnection,
    mut assignment: Assignment,
    today: NaiveDate,
) -> Result<CompletionCheck, Error> {
    let total_days = db::programs::count_days(&mut *conn, assignment.program_id)
        .await
        .map_err(db_err)?;
    let completed_days =
        db::completions::completed_day_numbers(&mut *conn, assignment.member_id, assignment.program_id)
            .await
            .map_err(db_err)?
            .len() as i64;

    let transition = evaluate_completion(&assignment, completed_days, total_days, today);
    let mut bonus_awarded = 0;
    let mut leveled_up = false;

    if let CompletionTransition::NewlyCompleted { completed_date } = transition {
        db::assignments::update_status(
            &mut *conn,
            assignment.id,
            AssignmentStatus::Completed,
            Some(completed_date),
        )
        .await
        .map_err(db_err)?;
        apply_transition(&mut assignment, &transition);

        let award = add_xp_in(&mut *conn, assignment.member_id, COMPLETION_BONUS).await?;
        bonus_awarded = COMPLETION_BONUS;
        leveled_up = award.leveled_up;
        info!(
            "🏁 Assignment {} completed by member {} (+{} XP)",
            assignment.id, assignment.member_id, COMPLETION_BONUS
        );
    } else {
        debug!(
            "Assignment {} check: {:?}",
            assignment.id, transition
        );
    }

    Ok(CompletionCheck {
        assignment,
        transition,
        bonus_awarded,
        leveled_up,
    })
}

/// Assignment as returned to callers, with the derived status label
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub display_status: &'static str,
}

impl AssignmentView {
    pub fn new(assignment: Assignment, today: NaiveDate) -> Self {
        let display_status = display_status(&assignment, today);
        Self {
            assignment,
            display_status,
        }
    }
}

/// Result of a create request
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Assignment),
    /// The member already had this program; the existing row is returned
    AlreadyAssigned(Assignment),
}

/// Result of a member action on an assignment
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub assignment_id: Uuid,
    pub status: &'static str,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp_awarded: Option<i64>,
    pub message: String,
}

/// Assignment operations over the pool
#[derive(Clone)]
pub struct AssignmentManager {
    pool: PgPool,
}

impl AssignmentManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Assign a program to a member (coach action)
    pub async fn create(
        &self,
        member_id: Uuid,
        program_id: Uuid,
        due_date: Option<NaiveDate>,
    ) -> Result<CreateOutcome, Error> {
        let today = Utc::now().date_naive();
        validate_due_date(due_date, today)?;

        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_user(&mut conn, member_id).await?;
        db::programs::get_by_id(&mut *conn, program_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound(format!("Program {} not found", program_id)))?;

        if let Some(created) =
            db::assignments::insert(&mut *conn, member_id, program_id, today, due_date)
                .await
                .map_err(db_err)?
        {
            info!("📋 Program {} assigned to member {}", program_id, member_id);
            return Ok(CreateOutcome::Created(created));
        }

        let existing = db::assignments::find_for_member_program(&mut *conn, member_id, program_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| {
                Error::Internal(format!(
                    "assignment for member {} and program {} vanished",
                    member_id, program_id
                ))
            })?;
        debug!("Program {} already assigned to member {}", program_id, member_id);
        Ok(CreateOutcome::AlreadyAssigned(existing))
    }

    /// Start (or resume) an assignment. Idempotent.
    pub async fn start(&self, assignment_id: Uuid) -> Result<ActionOutcome, Error> {
        let today = Utc::now().date_naive();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut assignment = self.lock(&mut tx, assignment_id).await?;

        let (status, changed) = start_transition(assignment.status);
        if changed {
            db::assignments::update_status(&mut *tx, assignment.id, status, None)
                .await
                .map_err(db_err)?;
            assignment.status = status;
        }
        tx.commit().await.map_err(db_err)?;

        let message = if changed {
            "Assignment started.".to_string()
        } else {
            format!("Assignment is already {}.", assignment.status.as_str())
        };
        Ok(ActionOutcome {
            assignment_id,
            status: display_status(&assignment, today),
            changed,
            xp_awarded: None,
            message,
        })
    }

    /// Pause an assignment in progress
    pub async fn pause(&self, assignment_id: Uuid) -> Result<ActionOutcome, Error> {
        let today = Utc::now().date_naive();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut assignment = self.lock(&mut tx, assignment_id).await?;

        let (status, changed) = pause_transition(assignment.status)?;
        if changed {
            db::assignments::update_status(&mut *tx, assignment.id, status, None)
                .await
                .map_err(db_err)?;
            assignment.status = status;
        }
        tx.commit().await.map_err(db_err)?;

        Ok(ActionOutcome {
            assignment_id,
            status: display_status(&assignment, today),
            changed,
            xp_awarded: None,
            message: if changed {
                "Assignment paused.".to_string()
            } else {
                "Assignment is already paused.".to_string()
            },
        })
    }

    /// Complete an assignment. Fails while days remain.
    pub async fn complete(&self, assignment_id: Uuid) -> Result<ActionOutcome, Error> {
        let today = Utc::now().date_naive();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Ledger before assignment, same order as day completion
        let member_id = db::assignments::get_by_id(&mut *tx, assignment_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound(format!("Assignment {} not found", assignment_id)))?
            .member_id;
        db::ledgers::lock(&mut tx, member_id).await.map_err(db_err)?;
        let assignment = self.lock(&mut tx, assignment_id).await?;

        let check = check_completion_in(&mut tx, assignment, today).await?;
        if let CompletionTransition::Incomplete {
            completed_days,
            total_days,
        } = check.transition
        {
            return Err(Error::Validation(format!(
                "Complete all workout days first ({}/{} days completed)",
                completed_days, total_days
            )));
        }
        tx.commit().await.map_err(db_err)?;

        let changed = matches!(check.transition, CompletionTransition::NewlyCompleted { .. });
        Ok(ActionOutcome {
            assignment_id,
            status: display_status(&check.assignment, today),
            changed,
            xp_awarded: Some(check.bonus_awarded),
            message: if changed {
                "Assignment completed.".to_string()
            } else {
                "Assignment is already completed.".to_string()
            },
        })
    }

    /// Remove an assignment (coach action)
    pub async fn remove(&self, assignment_id: Uuid) -> Result<(), Error> {
        let removed = db::assignments::delete(&self.pool, assignment_id)
            .await
            .map_err(db_err)?;
        if !removed {
            return Err(Error::NotFound(format!(
                "Assignment {} not found",
                assignment_id
            )));
        }
        info!("Assignment {} removed", assignment_id);
        Ok(())
    }

    /// All assignments of a member with their display status
    pub async fn list_for_member(
        &self,
        member_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<AssignmentView>, Error> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_user(&mut conn, member_id).await?;
        let assignments = db::assignments::list_for_member(&mut *conn, member_id)
            .await
            .map_err(db_err)?;
        Ok(assignments
            .into_iter()
            .map(|a| AssignmentView::new(a, today))
            .collect())
    }

    /// The member's next assignment to work on, if any
    pub async fn next_for_member(
        &self,
        member_id: Uuid,
        today: NaiveDate,
    ) -> Result<Option<AssignmentView>, Error> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_user(&mut conn, member_id).await?;
        let next = db::assignments::next_active(&mut *conn, member_id)
            .await
            .map_err(db_err)?;
        Ok(next.map(|a| AssignmentView::new(a, today)))
    }

    async fn lock(&self, conn: &mut PgConnection, assignment_id: Uuid) -> Result<Assignment, Error> {
        db::assignments::lock(&mut *conn, assignment_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound(format!("Assignment {} not found", assignment_id)))
    }
}
