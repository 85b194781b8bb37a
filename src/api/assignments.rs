use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::{SubmissionStatus, UserRole};
use crate::repositories;
use crate::repositories::assignments::AssignmentView;
use crate::schemas::assignment::{
    AssignmentResponse, GroupSubmissionStatus, StudentAssignmentResponse,
};
use crate::schemas::submission::{ConfirmRequest, SubmissionResponse};
use crate::services::confirmation::{self, ConfirmError};
use crate::services::targeting;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assignments))
        .route("/:assignment_id", get(get_assignment))
        .route("/:assignment_id/confirm-step1", post(confirm_step1))
        .route("/:assignment_id/confirm-step2", post(confirm_step2))
}

async fn list_assignments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<StudentAssignmentResponse>>, ApiError> {
    if user.role == UserRole::Admin {
        return Err(ApiError::Forbidden("Admins should use the admin assignments endpoint"));
    }

    let assignments = repositories::assignments::list_visible_for_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;

    enrich_with_statuses(&state, &user.id, assignments).await.map(Json)
}

async fn get_assignment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
) -> Result<Json<StudentAssignmentResponse>, ApiError> {
    let assignment = load_visible_assignment(&state, &user.id, user.role, &assignment_id).await?;

    let mut enriched = enrich_with_statuses(&state, &user.id, vec![assignment]).await?;
    enriched
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))
}

async fn confirm_step1(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    require_assignment_exists(&state, &assignment_id).await?;

    let submission = confirmation::confirm_first_step(
        state.db(),
        &assignment_id,
        &payload.group_id,
        &user.id,
    )
    .await
    .map_err(map_confirm_error)?;

    Ok(Json(SubmissionResponse::from_db(submission)))
}

async fn confirm_step2(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(assignment_id): Path<String>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    require_assignment_exists(&state, &assignment_id).await?;

    let submission = confirmation::confirm_final_step(
        state.db(),
        &assignment_id,
        &payload.group_id,
        &user.id,
    )
    .await
    .map_err(map_confirm_error)?;

    Ok(Json(SubmissionResponse::from_db(submission)))
}

fn map_confirm_error(error: ConfirmError) -> ApiError {
    match error {
        ConfirmError::NotMember => ApiError::Forbidden("Group membership required"),
        ConfirmError::AlreadyPastFirstStep { current_step } => ApiError::BadRequest(format!(
            "First confirmation was already given (step {current_step})"
        )),
        ConfirmError::FirstStepRequired => {
            ApiError::BadRequest("Complete the first confirmation step first".to_string())
        }
        ConfirmError::AlreadyConfirmed => {
            ApiError::BadRequest("Submission is already fully confirmed".to_string())
        }
        ConfirmError::StateChanged => {
            ApiError::BadRequest("Submission state changed, please try again".to_string())
        }
        ConfirmError::Inconsistent { .. } => {
            ApiError::internal(error, "Submission state is inconsistent")
        }
        ConfirmError::Storage(err) => ApiError::internal(err, "Failed to update submission"),
    }
}

async fn load_visible_assignment(
    state: &AppState,
    user_id: &str,
    role: UserRole,
    assignment_id: &str,
) -> Result<AssignmentView, ApiError> {
    let assignment = repositories::assignments::find_view_by_id(state.db(), assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    if role == UserRole::Admin {
        return Ok(assignment);
    }

    let group_ids = repositories::groups::group_ids_for_user(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load group memberships"))?;

    if targeting::is_visible(&assignment.targets, &group_ids) {
        Ok(assignment)
    } else {
        Err(ApiError::Forbidden("Assignment is not assigned to any of your groups"))
    }
}

/// Confirmation is gated on group membership alone (checked inside the
/// confirmation service), not on the assignment's targeting.
async fn require_assignment_exists(
    state: &AppState,
    assignment_id: &str,
) -> Result<(), ApiError> {
    let exists = repositories::assignments::find_by_id(state.db(), assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load assignment"))?
        .is_some();

    if exists {
        Ok(())
    } else {
        Err(ApiError::NotFound("Assignment not found".to_string()))
    }
}

/// Joins each assignment with the confirmation standing of every one of the
/// user's groups.
async fn enrich_with_statuses(
    state: &AppState,
    user_id: &str,
    assignments: Vec<AssignmentView>,
) -> Result<Vec<StudentAssignmentResponse>, ApiError> {
    let groups = repositories::groups::list_for_user(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load group memberships"))?;

    let assignment_ids = assignments.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
    let group_ids = groups.iter().map(|g| g.id.clone()).collect::<Vec<_>>();

    let statuses =
        repositories::submissions::statuses_for_assignments(state.db(), &assignment_ids, &group_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load submission statuses"))?;

    Ok(assignments
        .into_iter()
        .map(|assignment| {
            let submission_statuses = groups
                .iter()
                .map(|group| {
                    let submission =
                        statuses.get(&(assignment.id.clone(), group.id.clone()));
                    GroupSubmissionStatus {
                        group_id: group.id.clone(),
                        group_name: group.name.clone(),
                        status: submission
                            .map(|row| row.status)
                            .unwrap_or(SubmissionStatus::Pending),
                        confirmation_step: submission
                            .map(|row| row.confirmation_step)
                            .unwrap_or(0),
                    }
                })
                .collect();

            StudentAssignmentResponse {
                assignment: AssignmentResponse::from_view(assignment),
                submission_statuses,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests;
