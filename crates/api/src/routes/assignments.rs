//! Assignment routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;
use engine::assignments::{ActionOutcome, AssignmentView, CreateOutcome};

#[derive(Deserialize)]
pub struct CreateAssignmentRequest {
    pub member_id: Uuid,
    pub program_id: Uuid,
    pub due_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct CreateAssignmentResponse {
    pub created: bool,
    pub assignment: AssignmentView,
    pub message: &'static str,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAssignmentRequest>,
) -> ApiResult<(StatusCode, Json<CreateAssignmentResponse>)> {
    let today = Utc::now().date_naive();
    let outcome = state
        .assignments
        .create(body.member_id, body.program_id, body.due_date)
        .await?;

    let (status, response) = match outcome {
        CreateOutcome::Created(a) => (
            StatusCode::CREATED,
            CreateAssignmentResponse {
                created: true,
                assignment: AssignmentView::new(a, today),
                message: "Program assigned.",
            },
        ),
        CreateOutcome::AlreadyAssigned(a) => (
            StatusCode::OK,
            CreateAssignmentResponse {
                created: false,
                assignment: AssignmentView::new(a, today),
                message: "Program is already assigned to this member.",
            },
        ),
    };
    Ok((status, Json(response)))
}

pub async fn list_for_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AssignmentView>>> {
    let today = Utc::now().date_naive();
    Ok(Json(
        state.assignments.list_for_member(member_id, today).await?,
    ))
}

#[derive(Serialize)]
pub struct NextAssignmentResponse {
    pub assignment: Option<AssignmentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub async fn next_for_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<Json<NextAssignmentResponse>> {
    let today = Utc::now().date_naive();
    let assignment = state.assignments.next_for_member(member_id, today).await?;
    let message = assignment.is_none().then_some("No active assignment");
    Ok(Json(NextAssignmentResponse {
        assignment,
        message,
    }))
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    Ok(Json(state.assignments.start(id).await?))
}

pub async fn pause(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    Ok(Json(state.assignments.pause(id).await?))
}

pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    Ok(Json(state.assignments.complete(id).await?))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.assignments.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
