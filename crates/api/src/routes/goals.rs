//! Goal routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;
use engine::goals::GoalUpdate;

#[derive(Deserialize)]
pub struct SetGoalRequest {
    pub goal_type: String,
}

pub async fn set(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetGoalRequest>,
) -> ApiResult<(StatusCode, Json<GoalUpdate>)> {
    let update = state.goals.set_goal(user_id, &body.goal_type).await?;
    Ok((StatusCode::CREATED, Json(update)))
}

pub async fn end(
    State(state): State<Arc<AppState>>,
    Path((user_id, goal_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<GoalUpdate>> {
    let today = Utc::now().date_naive();
    Ok(Json(state.goals.end_goal(user_id, goal_id, today).await?))
}
