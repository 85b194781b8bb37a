use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::types::SubmissionStatus;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SummaryCounts {
    pub(crate) total_students: i64,
    pub(crate) total_groups: i64,
    pub(crate) total_assignments: i64,
    pub(crate) total_submissions: i64,
    pub(crate) confirmed_submissions: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct GroupCompletionRow {
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) member_count: i64,
    pub(crate) tracked_assignments: i64,
    pub(crate) confirmed_assignments: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AssignmentCompletionRow {
    pub(crate) assignment_id: String,
    pub(crate) title: String,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) tracked_groups: i64,
    pub(crate) confirmed_groups: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RecentConfirmationRow {
    pub(crate) assignment_id: String,
    pub(crate) assignment_title: String,
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) confirmed_by_name: Option<String>,
    pub(crate) confirmed_at: PrimitiveDateTime,
}

pub(crate) async fn summary(pool: &PgPool) -> Result<SummaryCounts, sqlx::Error> {
    sqlx::query_as::<_, SummaryCounts>(
        "SELECT
            (SELECT count(*) FROM users WHERE role = 'student') AS total_students,
            (SELECT count(*) FROM groups) AS total_groups,
            (SELECT count(*) FROM assignments) AS total_assignments,
            (SELECT count(*) FROM submissions) AS total_submissions,
            (SELECT count(*) FROM submissions WHERE status = $1) AS confirmed_submissions",
    )
    .bind(SubmissionStatus::Confirmed)
    .fetch_one(pool)
    .await
}

/// Per-group completion: how many assignments each group has a tracking row
/// for, and how many of those reached confirmed.
pub(crate) async fn group_completion(
    pool: &PgPool,
) -> Result<Vec<GroupCompletionRow>, sqlx::Error> {
    sqlx::query_as::<_, GroupCompletionRow>(
        "SELECT g.id AS group_id,
                g.name AS group_name,
                count(DISTINCT gm.user_id) AS member_count,
                count(DISTINCT s.id) AS tracked_assignments,
                count(DISTINCT s.id) FILTER (WHERE s.status = $1) AS confirmed_assignments
         FROM groups g
         LEFT JOIN group_members gm ON gm.group_id = g.id
         LEFT JOIN submissions s ON s.group_id = g.id
         GROUP BY g.id, g.name
         ORDER BY g.name",
    )
    .bind(SubmissionStatus::Confirmed)
    .fetch_all(pool)
    .await
}

pub(crate) async fn assignment_completion(
    pool: &PgPool,
) -> Result<Vec<AssignmentCompletionRow>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentCompletionRow>(
        "SELECT a.id AS assignment_id,
                a.title,
                a.due_date,
                count(s.id) AS tracked_groups,
                count(s.id) FILTER (WHERE s.status = $1) AS confirmed_groups
         FROM assignments a
         LEFT JOIN submissions s ON s.assignment_id = a.id
         GROUP BY a.id, a.title, a.due_date
         ORDER BY a.due_date DESC NULLS LAST, a.created_at DESC",
    )
    .bind(SubmissionStatus::Confirmed)
    .fetch_all(pool)
    .await
}

pub(crate) async fn recent_confirmations(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<RecentConfirmationRow>, sqlx::Error> {
    sqlx::query_as::<_, RecentConfirmationRow>(
        "SELECT s.assignment_id,
                a.title AS assignment_title,
                s.group_id,
                g.name AS group_name,
                u.full_name AS confirmed_by_name,
                s.confirmed_at
         FROM submissions s
         JOIN assignments a ON a.id = s.assignment_id
         JOIN groups g ON g.id = s.group_id
         LEFT JOIN users u ON u.id = s.confirmed_by
         WHERE s.status = $1 AND s.confirmed_at IS NOT NULL
         ORDER BY s.confirmed_at DESC
         LIMIT $2",
    )
    .bind(SubmissionStatus::Confirmed)
    .bind(limit)
    .fetch_all(pool)
    .await
}
