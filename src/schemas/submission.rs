use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::repositories::submissions::{
    AssignmentSubmissionView, GroupSubmissionRow, SubmissionOverviewRow, SubmissionView,
};
use crate::schemas::group::GroupMemberResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmRequest {
    #[serde(alias = "groupId")]
    pub(crate) group_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) group_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) confirmation_step: i32,
    pub(crate) first_click_by: Option<String>,
    pub(crate) first_click_by_name: Option<String>,
    pub(crate) first_click_at: Option<String>,
    pub(crate) confirmed_by: Option<String>,
    pub(crate) confirmed_by_name: Option<String>,
    pub(crate) confirmed_at: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            assignment_id: submission.assignment_id,
            group_id: submission.group_id,
            status: submission.status,
            confirmation_step: submission.confirmation_step,
            first_click_by: submission.first_click_by,
            first_click_by_name: None,
            first_click_at: submission.first_click_at.map(format_primitive),
            confirmed_by: submission.confirmed_by,
            confirmed_by_name: None,
            confirmed_at: submission.confirmed_at.map(format_primitive),
        }
    }

    pub(crate) fn from_view(view: SubmissionView) -> Self {
        Self {
            id: view.id,
            assignment_id: view.assignment_id,
            group_id: view.group_id,
            status: view.status,
            confirmation_step: view.confirmation_step,
            first_click_by: view.first_click_by,
            first_click_by_name: view.first_click_by_name,
            first_click_at: view.first_click_at.map(format_primitive),
            confirmed_by: view.confirmed_by,
            confirmed_by_name: view.confirmed_by_name,
            confirmed_at: view.confirmed_at.map(format_primitive),
        }
    }
}

/// One row of a group's submission history.
#[derive(Debug, Serialize)]
pub(crate) struct GroupSubmissionResponse {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) assignment_title: String,
    pub(crate) due_date: Option<String>,
    pub(crate) group_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) confirmation_step: i32,
    pub(crate) first_click_by_name: Option<String>,
    pub(crate) first_click_at: Option<String>,
    pub(crate) confirmed_by_name: Option<String>,
    pub(crate) confirmed_at: Option<String>,
}

impl GroupSubmissionResponse {
    pub(crate) fn from_row(row: GroupSubmissionRow) -> Self {
        Self {
            id: row.id,
            assignment_id: row.assignment_id,
            assignment_title: row.assignment_title,
            due_date: row.due_date.map(format_primitive),
            group_id: row.group_id,
            status: row.status,
            confirmation_step: row.confirmation_step,
            first_click_by_name: row.first_click_by_name,
            first_click_at: row.first_click_at.map(format_primitive),
            confirmed_by_name: row.confirmed_by_name,
            confirmed_at: row.confirmed_at.map(format_primitive),
        }
    }
}

/// One line of the admin-wide tracking table.
#[derive(Debug, Serialize)]
pub(crate) struct SubmissionOverviewResponse {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) assignment_title: String,
    pub(crate) due_date: Option<String>,
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) confirmation_step: i32,
    pub(crate) first_click_by_name: Option<String>,
    pub(crate) first_click_at: Option<String>,
    pub(crate) confirmed_by_name: Option<String>,
    pub(crate) confirmed_at: Option<String>,
}

impl SubmissionOverviewResponse {
    pub(crate) fn from_row(row: SubmissionOverviewRow) -> Self {
        Self {
            id: row.id,
            assignment_id: row.assignment_id,
            assignment_title: row.assignment_title,
            due_date: row.due_date.map(format_primitive),
            group_id: row.group_id,
            group_name: row.group_name,
            status: row.status,
            confirmation_step: row.confirmation_step,
            first_click_by_name: row.first_click_by_name,
            first_click_at: row.first_click_at.map(format_primitive),
            confirmed_by_name: row.confirmed_by_name,
            confirmed_at: row.confirmed_at.map(format_primitive),
        }
    }
}

/// Admin view of one group's standing on one assignment, roster included.
#[derive(Debug, Serialize)]
pub(crate) struct AssignmentSubmissionResponse {
    #[serde(flatten)]
    pub(crate) submission: SubmissionResponse,
    pub(crate) group_name: String,
    pub(crate) members: Vec<GroupMemberResponse>,
}

impl AssignmentSubmissionResponse {
    pub(crate) fn from_view(view: AssignmentSubmissionView) -> Self {
        Self {
            submission: SubmissionResponse::from_view(view.submission),
            group_name: view.group_name,
            members: view.members.into_iter().map(GroupMemberResponse::from_view).collect(),
        }
    }
}
