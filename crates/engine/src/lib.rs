//! Progress and gamification engine
//!
//! Pure rules (`xp`, `levels`, and the decision functions in the other
//! modules) plus the transactional flows that apply them to Postgres.

pub mod analytics;
pub mod assignments;
pub mod completions;
pub mod goals;
pub mod ledger;
pub mod levels;
pub mod xp;

#[cfg(test)]
mod tests;

pub use analytics::Analytics;
pub use assignments::AssignmentManager;
pub use completions::CompletionRecorder;
pub use goals::GoalEvaluator;
pub use ledger::Ledger;

/// Map a storage error into the engine's error type
pub(crate) fn db_err(e: sqlx::Error) -> common::Error {
    common::Error::Database(e.to_string())
}
