//! Application state

use engine::{Analytics, AssignmentManager, CompletionRecorder, GoalEvaluator, Ledger};
use sqlx::PgPool;

/// Shared application state
pub struct AppState {
    pub ledger: Ledger,
    pub completions: CompletionRecorder,
    pub assignments: AssignmentManager,
    pub goals: GoalEvaluator,
    pub analytics: Analytics,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: Ledger::new(pool.clone()),
            completions: CompletionRecorder::new(pool.clone()),
            assignments: AssignmentManager::new(pool.clone()),
            goals: GoalEvaluator::new(pool.clone()),
            analytics: Analytics::new(pool),
        }
    }
}
