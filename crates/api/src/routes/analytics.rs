//! Analytics routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AsOfQuery;
use crate::error::ApiResult;
use crate::state::AppState;
use engine::analytics::{ActivityDay, AnalyticsSummary, ProgramProgress};

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult<Json<AnalyticsSummary>> {
    Ok(Json(state.analytics.summary(user_id, query.date()).await?))
}

pub async fn weekly_activity(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult<Json<Vec<ActivityDay>>> {
    Ok(Json(
        state
            .analytics
            .weekly_activity(user_id, query.date())
            .await?,
    ))
}

pub async fn program_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, program_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ProgramProgress>> {
    Ok(Json(
        state.analytics.program_progress(user_id, program_id).await?,
    ))
}
