//! Level routes

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;
use engine::ledger::LevelView;
use engine::levels::{LevelTier, LEVELS};

#[derive(Deserialize)]
pub struct MonthlyTargetRequest {
    /// `null` restores the default target
    pub target: Option<i32>,
}

pub async fn tiers() -> Json<&'static [LevelTier]> {
    Json(LEVELS)
}

pub async fn user_level(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<LevelView>> {
    Ok(Json(state.ledger.level(user_id).await?))
}

pub async fn set_monthly_target(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<MonthlyTargetRequest>,
) -> ApiResult<Json<LevelView>> {
    Ok(Json(
        state.ledger.set_monthly_target(user_id, body.target).await?,
    ))
}
