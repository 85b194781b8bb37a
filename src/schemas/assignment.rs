use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::types::{SubmissionStatus, TargetType};
use crate::repositories::assignments::{AssignmentView, TargetView};
use crate::schemas::submission::AssignmentSubmissionResponse;
use crate::services::targeting::TargetInput;

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentCreate {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    /// RFC 3339, normalized to UTC on the way in.
    #[serde(default)]
    #[serde(alias = "dueDate")]
    pub(crate) due_date: Option<String>,
    #[serde(alias = "onedriveLink")]
    pub(crate) onedrive_link: String,
    #[serde(default)]
    pub(crate) targets: Vec<TargetInput>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignmentUpdate {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "dueDate")]
    pub(crate) due_date: Option<String>,
    #[serde(alias = "onedriveLink")]
    pub(crate) onedrive_link: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TargetResponse {
    pub(crate) target_type: TargetType,
    pub(crate) group_id: Option<String>,
    pub(crate) group_name: Option<String>,
}

impl TargetResponse {
    pub(crate) fn from_view(target: TargetView) -> Self {
        Self {
            target_type: target.target_type,
            group_id: target.group_id,
            group_name: target.group_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<String>,
    pub(crate) onedrive_link: String,
    pub(crate) created_by: String,
    pub(crate) created_by_name: Option<String>,
    pub(crate) created_at: String,
    pub(crate) targets: Vec<TargetResponse>,
}

impl AssignmentResponse {
    pub(crate) fn from_view(assignment: AssignmentView) -> Self {
        Self {
            id: assignment.id,
            title: assignment.title,
            description: assignment.description,
            due_date: assignment.due_date.map(format_primitive),
            onedrive_link: assignment.onedrive_link,
            created_by: assignment.created_by,
            created_by_name: assignment.created_by_name,
            created_at: format_primitive(assignment.created_at),
            targets: assignment.targets.into_iter().map(TargetResponse::from_view).collect(),
        }
    }
}

/// Admin detail: the assignment plus every group's tracking row.
#[derive(Debug, Serialize)]
pub(crate) struct AdminAssignmentDetailResponse {
    #[serde(flatten)]
    pub(crate) assignment: AssignmentResponse,
    pub(crate) submissions: Vec<AssignmentSubmissionResponse>,
}

/// Student listing entry: the assignment plus the confirmation standing of
/// each of the student's groups.
#[derive(Debug, Serialize)]
pub(crate) struct StudentAssignmentResponse {
    #[serde(flatten)]
    pub(crate) assignment: AssignmentResponse,
    pub(crate) submission_statuses: Vec<GroupSubmissionStatus>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupSubmissionStatus {
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) confirmation_step: i32,
}
