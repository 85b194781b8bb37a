use serde::Serialize;

use crate::core::time::format_primitive;
use crate::repositories::analytics::{
    AssignmentCompletionRow, GroupCompletionRow, RecentConfirmationRow, SummaryCounts,
};

#[derive(Debug, Serialize)]
pub(crate) struct AnalyticsResponse {
    pub(crate) summary: SummaryResponse,
    pub(crate) groups: Vec<GroupCompletionResponse>,
    pub(crate) assignments: Vec<AssignmentCompletionResponse>,
    pub(crate) recent_confirmations: Vec<RecentConfirmationResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SummaryResponse {
    pub(crate) total_students: i64,
    pub(crate) total_groups: i64,
    pub(crate) total_assignments: i64,
    pub(crate) total_submissions: i64,
    pub(crate) confirmed_submissions: i64,
    pub(crate) completion_rate: f64,
}

impl SummaryResponse {
    pub(crate) fn from_counts(counts: SummaryCounts) -> Self {
        let completion_rate = if counts.total_submissions > 0 {
            counts.confirmed_submissions as f64 / counts.total_submissions as f64
        } else {
            0.0
        };
        Self {
            total_students: counts.total_students,
            total_groups: counts.total_groups,
            total_assignments: counts.total_assignments,
            total_submissions: counts.total_submissions,
            confirmed_submissions: counts.confirmed_submissions,
            completion_rate,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GroupCompletionResponse {
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) member_count: i64,
    pub(crate) tracked_assignments: i64,
    pub(crate) confirmed_assignments: i64,
}

impl GroupCompletionResponse {
    pub(crate) fn from_row(row: GroupCompletionRow) -> Self {
        Self {
            group_id: row.group_id,
            group_name: row.group_name,
            member_count: row.member_count,
            tracked_assignments: row.tracked_assignments,
            confirmed_assignments: row.confirmed_assignments,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentCompletionResponse {
    pub(crate) assignment_id: String,
    pub(crate) title: String,
    pub(crate) due_date: Option<String>,
    pub(crate) tracked_groups: i64,
    pub(crate) confirmed_groups: i64,
}

impl AssignmentCompletionResponse {
    pub(crate) fn from_row(row: AssignmentCompletionRow) -> Self {
        Self {
            assignment_id: row.assignment_id,
            title: row.title,
            due_date: row.due_date.map(format_primitive),
            tracked_groups: row.tracked_groups,
            confirmed_groups: row.confirmed_groups,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RecentConfirmationResponse {
    pub(crate) assignment_id: String,
    pub(crate) assignment_title: String,
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) confirmed_by_name: Option<String>,
    pub(crate) confirmed_at: String,
}

impl RecentConfirmationResponse {
    pub(crate) fn from_row(row: RecentConfirmationRow) -> Self {
        Self {
            assignment_id: row.assignment_id,
            assignment_title: row.assignment_title,
            group_id: row.group_id,
            group_name: row.group_name,
            confirmed_by_name: row.confirmed_by_name,
            confirmed_at: format_primitive(row.confirmed_at),
        }
    }
}
