use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::GroupInvitation;
use crate::db::types::InvitationStatus;

const COLUMNS: &str = "\
    id, group_id, invited_user_id, invited_by_user_id, status, invited_at, responded_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PendingInvitationView {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) invited_by_user_id: String,
    pub(crate) invited_by_name: String,
    pub(crate) invited_at: PrimitiveDateTime,
}

pub(crate) struct CreateInvitation<'a> {
    pub id: &'a str,
    pub group_id: &'a str,
    pub invited_user_id: &'a str,
    pub invited_by_user_id: &'a str,
    pub invited_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateInvitation<'_>,
) -> Result<GroupInvitation, sqlx::Error> {
    sqlx::query_as::<_, GroupInvitation>(&format!(
        "INSERT INTO group_invitations (
            id, group_id, invited_user_id, invited_by_user_id, status, invited_at
         ) VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.group_id)
    .bind(params.invited_user_id)
    .bind(params.invited_by_user_id)
    .bind(InvitationStatus::Pending)
    .bind(params.invited_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<GroupInvitation>, sqlx::Error> {
    sqlx::query_as::<_, GroupInvitation>(&format!(
        "SELECT {COLUMNS} FROM group_invitations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_pending(
    pool: &PgPool,
    group_id: &str,
    invited_user_id: &str,
) -> Result<Option<GroupInvitation>, sqlx::Error> {
    sqlx::query_as::<_, GroupInvitation>(&format!(
        "SELECT {COLUMNS} FROM group_invitations
         WHERE group_id = $1 AND invited_user_id = $2 AND status = $3"
    ))
    .bind(group_id)
    .bind(invited_user_id)
    .bind(InvitationStatus::Pending)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_pending_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<PendingInvitationView>, sqlx::Error> {
    sqlx::query_as::<_, PendingInvitationView>(
        "SELECT gi.id,
                gi.group_id,
                g.name AS group_name,
                gi.invited_by_user_id,
                u.full_name AS invited_by_name,
                gi.invited_at
         FROM group_invitations gi
         JOIN groups g ON g.id = gi.group_id
         JOIN users u ON u.id = gi.invited_by_user_id
         WHERE gi.invited_user_id = $1 AND gi.status = $2
         ORDER BY gi.invited_at DESC",
    )
    .bind(user_id)
    .bind(InvitationStatus::Pending)
    .fetch_all(pool)
    .await
}

/// Marks a pending invitation responded. The status predicate makes two
/// concurrent responses settle on exactly one winner.
pub(crate) async fn respond(
    pool: &PgPool,
    id: &str,
    status: InvitationStatus,
    responded_at: PrimitiveDateTime,
) -> Result<Option<GroupInvitation>, sqlx::Error> {
    sqlx::query_as::<_, GroupInvitation>(&format!(
        "UPDATE group_invitations
         SET status = $2, responded_at = $3
         WHERE id = $1 AND status = $4
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .bind(responded_at)
    .bind(InvitationStatus::Pending)
    .fetch_optional(pool)
    .await
}
