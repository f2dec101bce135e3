//! Progress ledger: the only place XP is mutated

use common::models::ProgressLedger;
use common::Error;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db_err;
use crate::goals;
use crate::levels::{level_for_xp, Level};

/// A planned XP increase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpGain {
    pub xp: i64,
    pub level: Level,
    pub previous_rank: i32,
}

impl XpGain {
    pub fn leveled_up(&self) -> bool {
        self.level.rank != self.previous_rank
    }
}

/// Result of [`add_xp_in`]
#[derive(Debug, Clone)]
pub struct AddXpOutcome {
    pub leveled_up: bool,
    pub previous_rank: i32,
    pub new_rank: i32,
    pub ledger: ProgressLedger,
}

/// Current level as exposed to callers
#[derive(Debug, Clone, Serialize)]
pub struct LevelView {
    pub user_id: Uuid,
    pub xp: i64,
    pub rank: i32,
    pub level_name: String,
    pub xp_to_next: Option<i64>,
    pub goal_achieved: bool,
    pub monthly_challenge_target: Option<i32>,
}

impl From<ProgressLedger> for LevelView {
    fn from(ledger: ProgressLedger) -> Self {
        Self {
            user_id: ledger.user_id,
            xp: ledger.xp,
            rank: ledger.rank,
            level_name: ledger.level_name,
            xp_to_next: level_for_xp(ledger.xp).xp_to_next,
            goal_achieved: ledger.goal_achieved,
            monthly_challenge_target: ledger.monthly_challenge_target,
        }
    }
}

/// Work out the new XP and level for a gain.
///
/// Returns `Ok(None)` when `amount` is not positive. Breaking the "XP and rank
/// never go down" rule is reported as [`Error::Invariant`].
pub fn plan_xp_gain(ledger: &ProgressLedger, amount: i64) -> Result<Option<XpGain>, Error> {
    if amount <= 0 {
        return Ok(None);
    }
    if ledger.xp < 0 {
        return Err(Error::Invariant(format!(
            "ledger for user {} holds negative XP {}",
            ledger.user_id, ledger.xp
        )));
    }

    let xp = ledger.xp.checked_add(amount).ok_or_else(|| {
        Error::Invariant(format!(
            "XP overflow for user {} ({} + {})",
            ledger.user_id, ledger.xp, amount
        ))
    })?;

    let level = level_for_xp(xp);
    if level.rank < ledger.rank {
        return Err(Error::Invariant(format!(
            "rank would drop from {} to {} for user {}",
            ledger.rank, level.rank, ledger.user_id
        )));
    }

    Ok(Some(XpGain {
        xp,
        level,
        previous_rank: ledger.rank,
    }))
}

/// Add XP inside an open transaction.
///
/// Locks the user's ledger row, applies the gain, then re-evaluates goals.
pub async fn add_xp_in(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: i64,
) -> Result<AddXpOutcome, Error> {
    let ledger = db::ledgers::lock(&mut *conn, user_id)
        .await
        .map_err(db_err)?;

    let Some(gain) = plan_xp_gain(&ledger, amount)? else {
        return Ok(AddXpOutcome {
            leveled_up: false,
            previous_rank: ledger.rank,
            new_rank: ledger.rank,
            ledger,
        });
    };

    let mut ledger =
        db::ledgers::update_progress(&mut *conn, user_id, gain.xp, gain.level.rank, gain.level.name)
            .await
            .map_err(db_err)?;
    debug!("Added {} XP to user {} (total {})", amount, user_id, ledger.xp);

    if gain.leveled_up() {
        info!(
            "⬆️ User {} reached {} (rank {} -> {})",
            user_id, gain.level.name, gain.previous_rank, gain.level.rank
        );
    }

    ledger.goal_achieved = goals::refresh_in(&mut *conn, &ledger).await?;

    Ok(AddXpOutcome {
        leveled_up: gain.leveled_up(),
        previous_rank: gain.previous_rank,
        new_rank: gain.level.rank,
        ledger,
    })
}

/// Ledger operations over the pool
#[derive(Clone)]
pub struct Ledger {
    pool: PgPool,
}

impl Ledger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add XP in its own transaction
    pub async fn add_xp(&self, user_id: Uuid, amount: i64) -> Result<AddXpOutcome, Error> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        ensure_user(&mut tx, user_id).await?;
        let outcome = add_xp_in(&mut tx, user_id, amount).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(outcome)
    }

    /// Current level, creating the default ledger on first access
    pub async fn level(&self, user_id: Uuid) -> Result<LevelView, Error> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        ensure_user(&mut conn, user_id).await?;
        let ledger = db::ledgers::get_or_create(&mut conn, user_id)
            .await
            .map_err(db_err)?;
        Ok(ledger.into())
    }

    /// Override the monthly challenge target; `None` restores the default
    pub async fn set_monthly_target(
        &self,
        user_id: Uuid,
        target: Option<i32>,
    ) -> Result<LevelView, Error> {
        if let Some(t) = target {
            if t <= 0 {
                return Err(Error::Validation(
                    "Monthly challenge target must be positive".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        ensure_user(&mut tx, user_id).await?;
        let mut ledger = db::ledgers::lock(&mut tx, user_id).await.map_err(db_err)?;
        db::ledgers::set_monthly_target(&mut *tx, user_id, target)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        ledger.monthly_challenge_target = target;
        Ok(ledger.into())
    }
}

/// Fail with NotFound unless the user exists
pub(crate) async fn ensure_user(conn: &mut PgConnection, user_id: Uuid) -> Result<(), Error> {
    let exists = db::users::exists(&mut *conn, user_id)
        .await
        .map_err(db_err)?;
    if exists {
        Ok(())
    } else {
        Err(Error::NotFound(format!("User {} not found", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ledger(xp: i64, rank: i32) -> ProgressLedger {
        let level = level_for_xp(xp);
        ProgressLedger {
            user_id: Uuid::new_v4(),
            xp,
            rank,
            level_name: level.name.to_string(),
            goal_achieved: false,
            monthly_challenge_target: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_non_positive_amount_is_noop() {
        let l = ledger(200, 1);
        assert_eq!(plan_xp_gain(&l, 0).unwrap(), None);
        assert_eq!(plan_xp_gain(&l, -40).unwrap(), None);
    }

    #[test]
    fn test_gain_within_tier() {
        let gain = plan_xp_gain(&ledger(100, 1), 60).unwrap().unwrap();
        assert_eq!(gain.xp, 160);
        assert_eq!(gain.level.rank, 1);
        assert!(!gain.leveled_up());
    }

    #[test]
    fn test_gain_crosses_into_silver() {
        let gain = plan_xp_gain(&ledger(970, 1), 30).unwrap().unwrap();
        assert_eq!(gain.xp, 1000);
        assert_eq!(gain.level.name, "Silver");
        assert_eq!(gain.previous_rank, 1);
        assert!(gain.leveled_up());
    }

    #[test]
    fn test_gain_can_skip_a_tier() {
        let gain = plan_xp_gain(&ledger(0, 1), 6000).unwrap().unwrap();
        assert_eq!(gain.level.rank, 3);
        assert!(gain.leveled_up());
    }

    #[test]
    fn test_negative_stored_xp_is_invariant_error() {
        let err = plan_xp_gain(&ledger(-1, 1), 10).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn test_rank_drop_is_invariant_error() {
        // Stored rank says Gold but XP only supports Bronze
        let err = plan_xp_gain(&ledger(10, 3), 10).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn test_overflow_is_invariant_error() {
        let err = plan_xp_gain(&ledger(i64::MAX - 1, 3), 10).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }

    #[test]
    fn test_sequential_gains_never_decrease_xp() {
        let mut l = ledger(0, 1);
        for amount in [30, 0, 60, -5, 500, 90, 4500] {
            if let Some(gain) = plan_xp_gain(&l, amount).unwrap() {
                assert!(gain.xp > l.xp);
                assert!(gain.level.rank >= l.rank);
                l.xp = gain.xp;
                l.rank = gain.level.rank;
            }
        }
        assert_eq!(l.xp, 5180);
        assert_eq!(l.rank, 3);
    }

    #[test]
    fn test_level_view_reports_xp_to_next() {
        let view = LevelView::from(ledger(999, 1));
        assert_eq!(view.xp_to_next, Some(1));
        assert_eq!(view.level_name, "Bronze");
    }
}
