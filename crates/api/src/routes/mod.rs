//! API routes

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::state::AppState;

pub mod analytics;
pub mod assignments;
pub mod completions;
pub mod goals;
pub mod health;
pub mod levels;


/// `?as_of=YYYY-MM-DD`, defaulting to today (UTC)
#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

impl AsOfQuery {
    pub fn date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/levels", get(levels::tiers))
        .route("/api/users/:user_id/level", get(levels::user_level))
        .route(
            "/api/users/:user_id/monthly-target",
            put(levels::set_monthly_target),
        )
        .route(
            "/api/users/:user_id/units/:unit_id/complete",
            post(completions::complete),
        )
        .route(
            "/api/users/:user_id/units/:unit_id/complete-day",
            post(completions::complete_day),
        )
        .route(
            "/api/users/:user_id/units/:unit_id/completion",
            get(completions::status),
        )
        .route("/api/users/:user_id/analytics", get(analytics::summary))
        .route(
            "/api/users/:user_id/weekly-activity",
            get(analytics::weekly_activity),
        )
        .route(
            "/api/users/:user_id/programs/:program_id/progress",
            get(analytics::program_progress),
        )
        .route("/api/users/:user_id/goals", post(goals::set))
        .route("/api/users/:user_id/goals/:goal_id", delete(goals::end))
        .route("/api/assignments", post(assignments::create))
        .route(
            "/api/members/:member_id/assignments",
            get(assignments::list_for_member),
        )
        .route(
            "/api/members/:member_id/assignments/next",
            get(assignments::next_for_member),
        )
        .route("/api/assignments/:id/start", post(assignments::start))
        .route("/api/assignments/:id/pause", post(assignments::pause))
        .route("/api/assignments/:id/complete", post(assignments::complete))
        .route("/api/assignments/:id", delete(assignments::remove))
        .with_state(state)
}
