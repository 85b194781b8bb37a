use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{self, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{GroupRole, InvitationStatus, UserRole};
use crate::repositories;
use crate::schemas::group::{
    AddMemberRequest, GroupCreate, GroupResponse, InvitationAction, InvitationRespondRequest,
    InvitationResponse, InviteRequest,
};
use crate::schemas::user::StudentSummary;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_group).get(list_my_groups))
        .route("/available-students", get(available_students))
        .route("/invitations/pending", get(list_my_invitations))
        .route("/invitations/:invitation_id/respond", post(respond_to_invitation))
        .route("/:group_id", get(get_group))
        .route("/:group_id/invite", post(invite_member))
        .route("/:group_id/add-member", post(add_member))
}

async fn create_group(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<GroupCreate>,
) -> Result<(StatusCode, Json<GroupResponse>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Group name must not be empty".to_string()));
    }

    let group = repositories::groups::create(
        state.db(),
        repositories::groups::CreateGroup {
            id: &Uuid::new_v4().to_string(),
            name,
            owner_id: &user.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create group"))?;

    let view = repositories::groups::find_view_by_id(state.db(), &group.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(GroupResponse::from_view(view))))
}

async fn list_my_groups(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<GroupResponse>>, ApiError> {
    let groups = repositories::groups::list_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list groups"))?;

    Ok(Json(groups.into_iter().map(GroupResponse::from_view).collect()))
}

#[derive(Debug, Deserialize)]
struct AvailableStudentsQuery {
    #[serde(default)]
    group_id: Option<String>,
}

/// Students who can still be invited: everyone with the student role, minus
/// the given group's current roster.
async fn available_students(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AvailableStudentsQuery>,
) -> Result<Json<Vec<StudentSummary>>, ApiError> {
    let mut excluded = HashSet::new();
    if let Some(group_id) = &query.group_id {
        guards::require_group_access(&state, &user, group_id).await?;

        let rosters =
            repositories::groups::members_for_groups(state.db(), &[group_id.clone()])
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load group roster"))?;
        if let Some(members) = rosters.get(group_id.as_str()) {
            excluded.extend(members.iter().map(|member| member.user_id.clone()));
        }
    }

    let students = repositories::users::list_students(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    Ok(Json(
        students
            .into_iter()
            .filter(|student| !excluded.contains(&student.id))
            .map(StudentSummary::from_db)
            .collect(),
    ))
}

async fn list_my_invitations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<InvitationResponse>>, ApiError> {
    let invitations = repositories::invitations::list_pending_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list invitations"))?;

    Ok(Json(invitations.into_iter().map(InvitationResponse::from_view).collect()))
}

async fn respond_to_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invitation_id): Path<String>,
    Json(payload): Json<InvitationRespondRequest>,
) -> Result<StatusCode, ApiError> {
    let invitation = repositories::invitations::find_by_id(state.db(), &invitation_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load invitation"))?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;

    if invitation.invited_user_id != user.id {
        return Err(ApiError::Forbidden("Invitation belongs to another user"));
    }

    let status = match payload.action {
        InvitationAction::Accept => InvitationStatus::Accepted,
        InvitationAction::Reject => InvitationStatus::Rejected,
    };

    let now = primitive_now_utc();
    let updated =
        repositories::invitations::respond(state.db(), &invitation.id, status, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update invitation"))?;

    if updated.is_none() {
        return Err(ApiError::Conflict("Invitation was already handled".to_string()));
    }

    if matches!(payload.action, InvitationAction::Accept) {
        repositories::groups::add_member(
            state.db(),
            &invitation.group_id,
            &user.id,
            GroupRole::Member,
            now,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to join group"))?;
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn get_group(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<GroupResponse>, ApiError> {
    guards::require_group_access(&state, &user, &group_id).await?;

    let view = repositories::groups::find_view_by_id(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    Ok(Json(GroupResponse::from_view(view)))
}

async fn invite_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<String>,
    Json(payload): Json<InviteRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    guards::require_group_member(&state, &user, &group_id).await?;

    let identifier = payload.identifier.trim();
    if identifier.is_empty() {
        return Err(ApiError::BadRequest("Email or student code is required".to_string()));
    }

    let invited = repositories::users::find_by_identifier(state.db(), identifier)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up user"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    if invited.role != UserRole::Student {
        return Err(ApiError::BadRequest("Only students can be invited".to_string()));
    }

    let already_member = repositories::groups::is_member(state.db(), &group_id, &invited.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check group membership"))?;
    if already_member {
        return Err(ApiError::BadRequest("User is already a member of this group".to_string()));
    }

    let pending = repositories::invitations::find_pending(state.db(), &group_id, &invited.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check pending invitations"))?;
    if pending.is_some() {
        return Err(ApiError::BadRequest(
            "An invitation is already pending for this user".to_string(),
        ));
    }

    let invitation = repositories::invitations::create(
        state.db(),
        repositories::invitations::CreateInvitation {
            id: &Uuid::new_v4().to_string(),
            group_id: &group_id,
            invited_user_id: &invited.id,
            invited_by_user_id: &user.id,
            invited_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create invitation"))?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": invitation.id }))))
}

/// Direct addition by the owner, skipping the invitation handshake.
async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(group_id): Path<String>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<StatusCode, ApiError> {
    guards::require_group_owner(&state, &user, &group_id).await?;

    let member = repositories::users::find_by_id(state.db(), &payload.user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if member.role != UserRole::Student {
        return Err(ApiError::BadRequest("Only students can be group members".to_string()));
    }

    let added = repositories::groups::add_member(
        state.db(),
        &group_id,
        &member.id,
        GroupRole::Member,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to add member"))?;

    if !added {
        return Err(ApiError::BadRequest("User is already a member of this group".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
