use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{self, CurrentUser};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::submission::{GroupSubmissionResponse, SubmissionResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/group/:group_id", get(list_for_group))
        .route("/assignment/:assignment_id/group/:group_id", get(get_for_pair))
}

/// Every tracking row for a group, newest assignment first.
async fn list_for_group(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<GroupSubmissionResponse>>, ApiError> {
    guards::require_group_access(&state, &user, &group_id).await?;

    let rows = repositories::submissions::list_for_group(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(GroupSubmissionResponse::from_row).collect()))
}

async fn get_for_pair(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((assignment_id, group_id)): Path<(String, String)>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    guards::require_group_access(&state, &user, &group_id).await?;

    let view =
        repositories::submissions::find_view_by_pair(state.db(), &assignment_id, &group_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load submission"))?
            .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    Ok(Json(SubmissionResponse::from_view(view)))
}

#[cfg(test)]
mod tests;
