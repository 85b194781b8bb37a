use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    GroupRole, InvitationStatus, SubmissionStatus, TargetType, UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) student_code: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Group {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) owner_id: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GroupMember {
    pub(crate) group_id: String,
    pub(crate) user_id: String,
    pub(crate) role: GroupRole,
    pub(crate) joined_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct GroupInvitation {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) invited_user_id: String,
    pub(crate) invited_by_user_id: String,
    pub(crate) status: InvitationStatus,
    pub(crate) invited_at: PrimitiveDateTime,
    pub(crate) responded_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) onedrive_link: String,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssignmentTarget {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) target_type: TargetType,
    pub(crate) group_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Flat storage row for one group's confirmation progress on one assignment.
/// The application never inspects `status`/`confirmation_step` directly;
/// `services::confirmation::SubmissionState` decodes them into a tagged
/// variant so illegal combinations cannot circulate.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) group_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) confirmation_step: i32,
    pub(crate) first_click_by: Option<String>,
    pub(crate) first_click_at: Option<PrimitiveDateTime>,
    pub(crate) confirmed_by: Option<String>,
    pub(crate) confirmed_at: Option<PrimitiveDateTime>,
}
