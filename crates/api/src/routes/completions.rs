//! Completion routes

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;
use engine::completions::{CompletionOutcome, CompletionStatus, DayCompletionOutcome};

pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path((user_id, unit_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<CompletionOutcome>> {
    let outcome = state.completions.record_completion(user_id, unit_id).await?;
    if outcome.leveled_up {
        info!(
            "🎉 User {} reached {}",
            user_id, outcome.current_level_name
        );
    }
    Ok(Json(outcome))
}

pub async fn complete_day(
    State(state): State<Arc<AppState>>,
    Path((user_id, unit_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DayCompletionOutcome>> {
    let outcome = state.completions.complete_day(user_id, unit_id).await?;
    if outcome.leveled_up {
        info!(
            "🎉 User {} reached {}",
            user_id, outcome.current_level_name
        );
    }
    Ok(Json(outcome))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Path((user_id, unit_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<CompletionStatus>> {
    Ok(Json(
        state.completions.completion_status(user_id, unit_id).await?,
    ))
}
