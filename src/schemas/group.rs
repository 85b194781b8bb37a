use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::types::GroupRole;
use crate::repositories::groups::{GroupView, MemberView};
use crate::repositories::invitations::PendingInvitationView;

#[derive(Debug, Deserialize)]
pub(crate) struct GroupCreate {
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupMemberResponse {
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) student_code: Option<String>,
    pub(crate) role: GroupRole,
}

impl GroupMemberResponse {
    pub(crate) fn from_view(member: MemberView) -> Self {
        Self {
            user_id: member.user_id,
            full_name: member.full_name,
            email: member.email,
            student_code: member.student_code,
            role: member.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) owner_id: String,
    pub(crate) created_at: String,
    pub(crate) members: Vec<GroupMemberResponse>,
}

impl GroupResponse {
    pub(crate) fn from_view(group: GroupView) -> Self {
        Self {
            id: group.id,
            name: group.name,
            owner_id: group.owner_id,
            created_at: format_primitive(group.created_at),
            members: group.members.into_iter().map(GroupMemberResponse::from_view).collect(),
        }
    }
}

/// `identifier` is an email or a student code.
#[derive(Debug, Deserialize)]
pub(crate) struct InviteRequest {
    pub(crate) identifier: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddMemberRequest {
    #[serde(alias = "userId")]
    pub(crate) user_id: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum InvitationAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InvitationRespondRequest {
    pub(crate) action: InvitationAction,
}

#[derive(Debug, Serialize)]
pub(crate) struct InvitationResponse {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) invited_by: String,
    pub(crate) invited_by_name: String,
    pub(crate) invited_at: String,
}

impl InvitationResponse {
    pub(crate) fn from_view(invitation: PendingInvitationView) -> Self {
        Self {
            id: invitation.id,
            group_id: invitation.group_id,
            group_name: invitation.group_name,
            invited_by: invitation.invited_by_user_id,
            invited_by_name: invitation.invited_by_name,
            invited_at: format_primitive(invitation.invited_at),
        }
    }
}
