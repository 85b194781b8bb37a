use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::db::types::{GroupRole, UserRole};
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        user.map(CurrentUser).ok_or(ApiError::Unauthorized("User not found"))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role == UserRole::Admin {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}

/// Admins see every group; students must belong to it.
pub(crate) async fn require_group_access(
    state: &AppState,
    user: &User,
    group_id: &str,
) -> Result<(), ApiError> {
    if user.role == UserRole::Admin {
        return Ok(());
    }

    require_group_member(state, user, group_id).await
}

/// Strict membership check, no admin bypass. Any member may invite.
pub(crate) async fn require_group_member(
    state: &AppState,
    user: &User,
    group_id: &str,
) -> Result<(), ApiError> {
    let is_member = repositories::groups::is_member(state.db(), group_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check group membership"))?;

    if is_member {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Group membership required"))
    }
}

/// Only the group owner may add members directly.
pub(crate) async fn require_group_owner(
    state: &AppState,
    user: &User,
    group_id: &str,
) -> Result<(), ApiError> {
    let role = repositories::groups::membership_role(state.db(), group_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check group role"))?;

    match role {
        Some(GroupRole::Owner) => Ok(()),
        Some(GroupRole::Member) => Err(ApiError::Forbidden("Group owner access required")),
        None => Err(ApiError::Forbidden("Group membership required")),
    }
}
