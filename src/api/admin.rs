use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::{parse_rfc3339, primitive_now_utc};
use crate::repositories;
use crate::schemas::analytics::{
    AnalyticsResponse, AssignmentCompletionResponse, GroupCompletionResponse,
    RecentConfirmationResponse, SummaryResponse,
};
use crate::schemas::assignment::{
    AdminAssignmentDetailResponse, AssignmentCreate, AssignmentResponse, AssignmentUpdate,
};
use crate::schemas::submission::{
    AssignmentSubmissionResponse, SubmissionOverviewResponse, SubmissionResponse,
};
use crate::services::targeting;

const RECENT_CONFIRMATIONS_LIMIT: i64 = 20;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/assignments", post(create_assignment).get(list_assignments))
        .route(
            "/assignments/:assignment_id",
            get(get_assignment).put(update_assignment).delete(delete_assignment),
        )
        .route(
            "/assignments/:assignment_id/submissions/:group_id/reset",
            post(reset_submission),
        )
        .route("/submissions", get(list_all_submissions))
        .route("/analytics", get(analytics))
}

async fn create_assignment(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(payload): Json<AssignmentCreate>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".to_string()));
    }

    let onedrive_link = payload.onedrive_link.trim();
    if onedrive_link.is_empty() {
        return Err(ApiError::BadRequest("OneDrive link must not be empty".to_string()));
    }

    let due_date = parse_due_date(payload.due_date.as_deref())?;

    let targets = targeting::normalize(&payload.targets)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let assignment = repositories::assignments::create(
        state.db(),
        repositories::assignments::CreateAssignment {
            id: &Uuid::new_v4().to_string(),
            title,
            description: payload.description.as_deref(),
            due_date,
            onedrive_link,
            created_by: &admin.id,
            created_at: primitive_now_utc(),
        },
        &targets,
    )
    .await
    .map_err(|error| {
        if is_foreign_key_violation(&error) {
            ApiError::BadRequest("One of the target groups does not exist".to_string())
        } else {
            ApiError::internal(error, "Failed to create assignment")
        }
    })?;

    let view = repositories::assignments::find_view_by_id(state.db(), &assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_view(view))))
}

async fn list_assignments(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
) -> Result<Json<Vec<AssignmentResponse>>, ApiError> {
    let assignments = repositories::assignments::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;

    Ok(Json(assignments.into_iter().map(AssignmentResponse::from_view).collect()))
}

/// Assignment detail plus the tracking row of every group that has touched
/// it, roster included.
async fn get_assignment(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(assignment_id): Path<String>,
) -> Result<Json<AdminAssignmentDetailResponse>, ApiError> {
    let view = repositories::assignments::find_view_by_id(state.db(), &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    let submissions = repositories::submissions::list_for_assignment(state.db(), &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(AdminAssignmentDetailResponse {
        assignment: AssignmentResponse::from_view(view),
        submissions: submissions
            .into_iter()
            .map(AssignmentSubmissionResponse::from_view)
            .collect(),
    }))
}

async fn update_assignment(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(assignment_id): Path<String>,
    Json(payload): Json<AssignmentUpdate>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".to_string()));
    }

    let due_date = parse_due_date(payload.due_date.as_deref())?;

    let updated = repositories::assignments::update(
        state.db(),
        &assignment_id,
        repositories::assignments::UpdateAssignment {
            title,
            description: payload.description.as_deref(),
            due_date,
            onedrive_link: payload.onedrive_link.trim(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update assignment"))?;

    if updated.is_none() {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }

    let view = repositories::assignments::find_view_by_id(state.db(), &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    Ok(Json(AssignmentResponse::from_view(view)))
}

async fn delete_assignment(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(assignment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::assignments::delete(state.db(), &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete assignment"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Assignment not found".to_string()))
    }
}

/// Every tracking row in the system, for the admin dashboard.
async fn list_all_submissions(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
) -> Result<Json<Vec<SubmissionOverviewResponse>>, ApiError> {
    let rows = repositories::submissions::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(SubmissionOverviewResponse::from_row).collect()))
}

/// Wipes a group's confirmation progress so the two-step ladder starts over.
async fn reset_submission(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path((assignment_id, group_id)): Path<(String, String)>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let reset = repositories::submissions::reset(state.db(), &assignment_id, &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reset submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    Ok(Json(SubmissionResponse::from_db(reset)))
}

async fn analytics(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let summary = repositories::analytics::summary(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load analytics summary"))?;
    let groups = repositories::analytics::group_completion(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load group analytics"))?;
    let assignments = repositories::analytics::assignment_completion(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assignment analytics"))?;
    let recent =
        repositories::analytics::recent_confirmations(state.db(), RECENT_CONFIRMATIONS_LIMIT)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load recent confirmations"))?;

    Ok(Json(AnalyticsResponse {
        summary: SummaryResponse::from_counts(summary),
        groups: groups.into_iter().map(GroupCompletionResponse::from_row).collect(),
        assignments: assignments
            .into_iter()
            .map(AssignmentCompletionResponse::from_row)
            .collect(),
        recent_confirmations: recent
            .into_iter()
            .map(RecentConfirmationResponse::from_row)
            .collect(),
    }))
}

fn parse_due_date(
    raw: Option<&str>,
) -> Result<Option<time::PrimitiveDateTime>, ApiError> {
    match raw {
        None => Ok(None),
        Some(value) => parse_rfc3339(value)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest("Invalid due date, expected RFC 3339".to_string())),
    }
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().as_deref() == Some("23503"),
        _ => false,
    }
}
