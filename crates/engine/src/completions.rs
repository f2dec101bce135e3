//! Completion recording
//!
//! A (user, unit) pair is completed at most once. The unique constraint on
//! `completion_records` decides races; the loser takes the already-completed
//! path and awards nothing.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use common::models::{AssignmentStatus, CompletionRecord, Program, WorkoutUnit};
use common::Error;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::assignments::{all_days_done, check_completion_in};
use crate::db_err;
use crate::ledger::{add_xp_in, ensure_user};
use crate::xp::{calculate_xp, XpInput};

/// Midnight UTC at the start of a day
pub(crate) fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// A streak is active when the user completed something yesterday
pub fn streak_active(recent: &[CompletionRecord], today: NaiveDate) -> bool {
    let yesterday = today - Duration::days(1);
    recent
        .iter()
        .any(|r| r.completed_at.date_naive() == yesterday)
}

/// XP for one unit. The program bonus is never paid here; only the
/// assignment transition into `completed` pays it.
pub fn unit_xp(unit: &WorkoutUnit, program: &Program, streak: bool) -> i64 {
    calculate_xp(&XpInput {
        streak_active: streak,
        ..XpInput::new(unit.duration_minutes, program.difficulty)
    })
}

/// Result of completing a single unit
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub completed: bool,
    pub already_completed: bool,
    pub record: CompletionRecord,
    pub xp_awarded: i64,
    pub total_xp: i64,
    pub leveled_up: bool,
    pub current_level_name: String,
    pub goal_achieved: bool,
}

/// Result of completing every unit of a day
#[derive(Debug, Clone, Serialize)]
pub struct DayCompletionOutcome {
    pub completed: bool,
    pub day_number: i32,
    pub units_completed: usize,
    pub already_completed: bool,
    pub xp_awarded: i64,
    pub total_xp: i64,
    pub leveled_up: bool,
    pub current_level_name: String,
    pub goal_achieved: bool,
    pub program_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_status: Option<AssignmentStatus>,
}

/// Whether a user has completed a unit
#[derive(Debug, Clone, Serialize)]
pub struct CompletionStatus {
    pub completed: bool,
    pub xp_earned: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Records completions over the pool
#[derive(Clone)]
pub struct CompletionRecorder {
    pool: PgPool,
}

impl CompletionRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Complete one workout unit
    pub async fn record_completion(
        &self,
        user_id: Uuid,
        workout_unit_id: Uuid,
    ) -> Result<CompletionOutcome, Error> {
        let today = Utc::now().date_naive();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        ensure_user(&mut tx, user_id).await?;
        let (unit, program) = load_unit(&mut tx, workout_unit_id).await?;

        // Serializes all completions of this user
        let ledger = db::ledgers::lock(&mut tx, user_id).await.map_err(db_err)?;

        if let Some(existing) = db::completions::get(&mut *tx, user_id, workout_unit_id)
            .await
            .map_err(db_err)?
        {
            debug!("Unit {} already completed by user {}", workout_unit_id, user_id);
            return Ok(CompletionOutcome {
                completed: true,
                already_completed: true,
                record: existing,
                xp_awarded: 0,
                total_xp: ledger.xp,
                leveled_up: false,
                current_level_name: ledger.level_name,
                goal_achieved: ledger.goal_achieved,
            });
        }

        let recent = recent_completions(&mut tx, user_id, today).await?;
        let xp = unit_xp(&unit, &program, streak_active(&recent, today));

        let Some(record) = db::completions::insert(&mut *tx, user_id, workout_unit_id, xp)
            .await
            .map_err(db_err)?
        else {
            // Lost a race with a concurrent insert
            let existing = db::completions::get(&mut *tx, user_id, workout_unit_id)
                .await
                .map_err(db_err)?
                .ok_or_else(|| Error::Internal("completion record vanished".to_string()))?;
            return Ok(CompletionOutcome {
                completed: true,
                already_completed: true,
                record: existing,
                xp_awarded: 0,
                total_xp: ledger.xp,
                leveled_up: false,
                current_level_name: ledger.level_name,
                goal_achieved: ledger.goal_achieved,
            });
        };

        let award = add_xp_in(&mut tx, user_id, xp).await?;
        tx.commit().await.map_err(db_err)?;

        info!(
            "✅ User {} completed unit {} (+{} XP)",
            user_id, workout_unit_id, xp
        );
        Ok(CompletionOutcome {
            completed: true,
            already_completed: false,
            record,
            xp_awarded: xp,
            total_xp: award.ledger.xp,
            leveled_up: award.leveled_up,
            current_level_name: award.ledger.level_name,
            goal_achieved: award.ledger.goal_achieved,
        })
    }

    /// Complete every remaining unit sharing this unit's day, then check the
    /// member's assignment for the program
    pub async fn complete_day(
        &self,
        user_id: Uuid,
        workout_unit_id: Uuid,
    ) -> Result<DayCompletionOutcome, Error> {
        let today = Utc::now().date_naive();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        ensure_user(&mut tx, user_id).await?;
        let (unit, program) = load_unit(&mut tx, workout_unit_id).await?;

        let ledger = db::ledgers::lock(&mut tx, user_id).await.map_err(db_err)?;
        let starting_rank = ledger.rank;
        let assignment = db::assignments::lock_for_member_program(&mut *tx, user_id, program.id)
            .await
            .map_err(db_err)?;

        let day_units = db::programs::list_units_for_day(&mut *tx, program.id, unit.day_number)
            .await
            .map_err(db_err)?;

        let mut pending = Vec::new();
        for u in day_units {
            let done = db::completions::get(&mut *tx, user_id, u.id)
                .await
                .map_err(db_err)?;
            if done.is_none() {
                pending.push(u);
            }
        }

        let recent = recent_completions(&mut tx, user_id, today).await?;
        let streak = streak_active(&recent, today);

        let mut xp_total = 0;
        let mut units_completed = 0;
        for u in &pending {
            let xp = unit_xp(u, &program, streak);
            if db::completions::insert(&mut *tx, user_id, u.id, xp)
                .await
                .map_err(db_err)?
                .is_some()
            {
                xp_total += xp;
                units_completed += 1;
            }
        }

        let mut award = add_xp_in(&mut tx, user_id, xp_total).await?;

        let mut assignment_status = None;
        let program_completed = if let Some(assignment) = assignment {
            let check = check_completion_in(&mut tx, assignment, today).await?;
            xp_total += check.bonus_awarded;
            assignment_status = Some(check.assignment.status);
            if check.bonus_awarded > 0 {
                award.ledger = db::ledgers::get(&mut *tx, user_id)
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| Error::Internal("ledger vanished".to_string()))?;
            }
            check.transition.is_completed()
        } else {
            let completed_days =
                db::completions::completed_day_numbers(&mut *tx, user_id, program.id)
                    .await
                    .map_err(db_err)?;
            let total_days = db::programs::count_days(&mut *tx, program.id)
                .await
                .map_err(db_err)?;
            all_days_done(completed_days.len() as i64, total_days)
        };

        tx.commit().await.map_err(db_err)?;

        info!(
            "✅ User {} completed day {} of program {} ({} units, +{} XP)",
            user_id, unit.day_number, program.id, units_completed, xp_total
        );
        Ok(DayCompletionOutcome {
            completed: true,
            day_number: unit.day_number,
            units_completed,
            already_completed: units_completed == 0,
            xp_awarded: xp_total,
            total_xp: award.ledger.xp,
            leveled_up: award.ledger.rank != starting_rank,
            current_level_name: award.ledger.level_name,
            goal_achieved: award.ledger.goal_achieved,
            program_completed,
            assignment_status,
        })
    }

    /// Look up whether a unit has been completed
    pub async fn completion_status(
        &self,
        user_id: Uuid,
        workout_unit_id: Uuid,
    ) -> Result<CompletionStatus, Error> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_user(&mut conn, user_id).await?;
        db::programs::get_unit(&mut *conn, workout_unit_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound(format!("Workout unit {} not found", workout_unit_id)))?;

        let record = db::completions::get(&mut *conn, user_id, workout_unit_id)
            .await
            .map_err(db_err)?;
        Ok(CompletionStatus {
            completed: record.is_some(),
            xp_earned: record.as_ref().map(|r| r.xp_earned),
            completed_at: record.map(|r| r.completed_at),
        })
    }
}

async fn load_unit(
    conn: &mut PgConnection,
    workout_unit_id: Uuid,
) -> Result<(WorkoutUnit, Program), Error> {
    let unit = db::programs::get_unit(&mut *conn, workout_unit_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| Error::NotFound(format!("Workout unit {} not found", workout_unit_id)))?;
    let program = db::programs::get_by_id(&mut *conn, unit.program_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| Error::NotFound(format!("Program {} not found", unit.program_id)))?;
    Ok((unit, program))
}

async fn recent_completions(
    conn: &mut PgConnection,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<CompletionRecord>, Error> {
    let since = start_of_day(today - Duration::days(1));
    db::completions::list_since(&mut *conn, user_id, since)
        .await
        .map_err(db_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Difficulty;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record_at(at: DateTime<Utc>) -> CompletionRecord {
        CompletionRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            workout_unit_id: Uuid::new_v4(),
            completed_at: at,
            xp_earned: 30,
        }
    }

    fn program(difficulty: Difficulty) -> Program {
        Program {
            id: Uuid::new_v4(),
            coach_id: Uuid::new_v4(),
            title: "Test Program".to_string(),
            difficulty,
            category: "full_body".to_string(),
            is_public: true,
            level_access: "all".to_string(),
            created_at: Utc::now(),
        }
    }

    fn unit(program: &Program, day_number: i32, duration: i32) -> WorkoutUnit {
        WorkoutUnit {
            id: Uuid::new_v4(),
            program_id: program.id,
            day_number,
            title: None,
            duration_minutes: duration,
        }
    }

    #[test]
    fn test_streak_needs_yesterday() {
        let today = date(2026, 5, 10);
        let yesterday_evening = Utc.with_ymd_and_hms(2026, 5, 9, 21, 0, 0).unwrap();
        let this_morning = Utc.with_ymd_and_hms(2026, 5, 10, 7, 0, 0).unwrap();

        assert!(streak_active(&[record_at(yesterday_evening)], today));
        assert!(!streak_active(&[record_at(this_morning)], today));
        assert!(!streak_active(&[], today));
    }

    #[test]
    fn test_unit_xp_uses_program_difficulty() {
        let p = program(Difficulty::Medium);
        assert_eq!(unit_xp(&unit(&p, 1, 30), &p, false), 60);
        assert_eq!(unit_xp(&unit(&p, 1, 30), &p, true), 66);
    }

    #[test]
    fn test_unit_xp_never_includes_program_bonus() {
        // Finishing a one-day program through a unit still pays only the unit
        let p = program(Difficulty::Easy);
        assert_eq!(unit_xp(&unit(&p, 1, 30), &p, false), 30);
    }

    #[test]
    fn test_start_of_day_is_utc_midnight() {
        let start = start_of_day(date(2026, 5, 10));
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 5, 10, 0, 0, 0).unwrap());
    }
}
