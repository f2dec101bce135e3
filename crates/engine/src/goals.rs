//! Goal achievement evaluation

use chrono::{NaiveDate, Utc};
use common::models::{Goal, GoalType, ProgressLedger};
use common::Error;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::db_err;
use crate::ledger::ensure_user;

/// Numbers the goal criteria look at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalStats {
    pub completed_units: i64,
    pub total_duration_minutes: i64,
    pub rank: i32,
}

type Criterion = fn(&GoalStats) -> bool;

const GOAL_CRITERIA: &[(GoalType, Criterion)] = &[
    (GoalType::LoseWeight, |s| s.completed_units >= 5),
    (GoalType::BuildMuscle, |s| s.completed_units >= 10),
    (GoalType::ImproveEndurance, |s| s.total_duration_minutes >= 500),
    (GoalType::GeneralFitness, |s| s.rank >= 1 && s.completed_units >= 5),
    (GoalType::IncreaseFlexibility, |s| s.completed_units >= 15),
];

/// Check one goal type against the stats
pub fn goal_met(goal_type: GoalType, stats: &GoalStats) -> bool {
    GOAL_CRITERIA
        .iter()
        .find(|(g, _)| *g == goal_type)
        .is_some_and(|(_, criterion)| criterion(stats))
}

/// True if any ongoing goal is met. Ended goals are ignored.
pub fn any_goal_met(goals: &[Goal], stats: &GoalStats) -> bool {
    goals
        .iter()
        .filter(|g| g.is_active())
        .any(|g| goal_met(g.goal_type, stats))
}

/// Re-evaluate the goal flag for a ledger inside an open transaction.
///
/// Only writes when the flag changes. Returns the current value.
pub async fn refresh_in(conn: &mut PgConnection, ledger: &ProgressLedger) -> Result<bool, Error> {
    let goals = db::goals::list_active(&mut *conn, ledger.user_id)
        .await
        .map_err(db_err)?;

    let achieved = if goals.is_empty() {
        false
    } else {
        let totals = db::completions::totals_for_user(&mut *conn, ledger.user_id)
            .await
            .map_err(db_err)?;
        let stats = GoalStats {
            completed_units: totals.completed_units,
            total_duration_minutes: totals.total_duration_minutes,
            rank: ledger.rank,
        };
        any_goal_met(&goals, &stats)
    };

    if achieved != ledger.goal_achieved {
        db::ledgers::set_goal_achieved(&mut *conn, ledger.user_id, achieved)
            .await
            .map_err(db_err)?;
        if achieved {
            info!("🎯 User {} achieved a fitness goal", ledger.user_id);
        }
    }

    Ok(achieved)
}

/// Roles that may hold fitness goals; coaches and admins may not
const GOAL_ROLES: &[&str] = &["normal", "member"];

pub fn can_hold_goals(role: &str) -> bool {
    GOAL_ROLES.contains(&role)
}

/// Result of setting or ending a goal
#[derive(Debug, Clone, Serialize)]
pub struct GoalUpdate {
    /// The goal that was set; `None` after ending one
    pub goal: Option<Goal>,
    pub active_goals: Vec<Goal>,
    pub goal_achieved: bool,
}

/// Goal management over the pool
#[derive(Clone)]
pub struct GoalEvaluator {
    pool: PgPool,
}

impl GoalEvaluator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Start an ongoing goal of this type. Setting a type the user already
    /// pursues keeps the existing goal; other types are left untouched.
    pub async fn set_goal(&self, user_id: Uuid, goal_type: &str) -> Result<GoalUpdate, Error> {
        let goal_type = GoalType::parse(goal_type)
            .ok_or_else(|| Error::Validation(format!("Unknown goal type '{}'", goal_type)))?;
        let today = Utc::now().date_naive();

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let user = db::users::get_by_id(&mut *tx, user_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| Error::NotFound(format!("User {} not found", user_id)))?;
        if !can_hold_goals(&user.role) {
            return Err(Error::Validation(
                "Only normal users and members can set fitness goals".to_string(),
            ));
        }
        let ledger = db::ledgers::lock(&mut tx, user_id).await.map_err(db_err)?;

        let goal = match db::goals::insert_active(&mut *tx, user_id, goal_type, today)
            .await
            .map_err(db_err)?
        {
            Some(goal) => {
                info!("User {} set goal {}", user_id, goal_type.as_str());
                goal
            }
            None => db::goals::find_active(&mut *tx, user_id, goal_type)
                .await
                .map_err(db_err)?
                .ok_or_else(|| Error::Internal(format!("active goal {} vanished", goal_type.as_str())))?,
        };
        let goal_achieved = refresh_in(&mut tx, &ledger).await?;
        let active_goals = db::goals::list_active(&mut *tx, user_id)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        Ok(GoalUpdate {
            goal: Some(goal),
            active_goals,
            goal_achieved,
        })
    }

    /// End an ongoing goal
    pub async fn end_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        end_date: NaiveDate,
    ) -> Result<GoalUpdate, Error> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        ensure_user(&mut tx, user_id).await?;
        let ledger = db::ledgers::lock(&mut tx, user_id).await.map_err(db_err)?;

        let ended = db::goals::end_goal(&mut *tx, user_id, goal_id, end_date)
            .await
            .map_err(db_err)?;
        if !ended {
            return Err(Error::NotFound(format!("Active goal {} not found", goal_id)));
        }
        let goal_achieved = refresh_in(&mut tx, &ledger).await?;
        let active_goals = db::goals::list_active(&mut *tx, user_id)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        Ok(GoalUpdate {
            goal: None,
            active_goals,
            goal_achieved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(goal_type: GoalType, end_date: Option<NaiveDate>) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            goal_type,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date,
        }
    }

    fn stats(units: i64, minutes: i64) -> GoalStats {
        GoalStats {
            completed_units: units,
            total_duration_minutes: minutes,
            rank: 1,
        }
    }

    #[test]
    fn test_every_goal_type_has_a_criterion() {
        for goal_type in GoalType::ALL {
            assert!(GOAL_CRITERIA.iter().any(|(g, _)| *g == goal_type));
        }
    }

    #[test]
    fn test_lose_weight_needs_five_units() {
        assert!(!goal_met(GoalType::LoseWeight, &stats(4, 1000)));
        assert!(goal_met(GoalType::LoseWeight, &stats(5, 0)));
    }

    #[test]
    fn test_build_muscle_needs_ten_units() {
        assert!(!goal_met(GoalType::BuildMuscle, &stats(9, 0)));
        assert!(goal_met(GoalType::BuildMuscle, &stats(10, 0)));
    }

    #[test]
    fn test_endurance_counts_minutes_not_units() {
        assert!(!goal_met(GoalType::ImproveEndurance, &stats(100, 499)));
        assert!(goal_met(GoalType::ImproveEndurance, &stats(1, 500)));
    }

    #[test]
    fn test_general_fitness() {
        assert!(!goal_met(GoalType::GeneralFitness, &stats(4, 0)));
        assert!(goal_met(GoalType::GeneralFitness, &stats(5, 0)));
    }

    #[test]
    fn test_flexibility_needs_fifteen_units() {
        assert!(!goal_met(GoalType::IncreaseFlexibility, &stats(14, 0)));
        assert!(goal_met(GoalType::IncreaseFlexibility, &stats(15, 0)));
    }

    #[test]
    fn test_no_goals_is_not_achieved() {
        assert!(!any_goal_met(&[], &stats(100, 10_000)));
    }

    #[test]
    fn test_any_active_goal_suffices() {
        let goals = vec![
            goal(GoalType::IncreaseFlexibility, None),
            goal(GoalType::LoseWeight, None),
        ];
        assert!(any_goal_met(&goals, &stats(6, 0)));
    }

    #[test]
    fn test_goal_roles() {
        assert!(can_hold_goals("normal"));
        assert!(can_hold_goals("member"));
        assert!(!can_hold_goals("coach"));
        assert!(!can_hold_goals("admin"));
    }

    #[test]
    fn test_ended_goals_ignored() {
        let ended = NaiveDate::from_ymd_opt(2026, 2, 1);
        let goals = vec![goal(GoalType::LoseWeight, ended)];
        assert!(!any_goal_met(&goals, &stats(50, 0)));
    }
}
