use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::repositories::groups::{self, MemberView};

const COLUMNS: &str = "id, assignment_id, group_id, status, confirmation_step, \
                       first_click_by, first_click_at, confirmed_by, confirmed_at";

/// A submission row joined with the names of the users who acted on it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubmissionView {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) group_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) confirmation_step: i32,
    pub(crate) first_click_by: Option<String>,
    pub(crate) first_click_by_name: Option<String>,
    pub(crate) first_click_at: Option<PrimitiveDateTime>,
    pub(crate) confirmed_by: Option<String>,
    pub(crate) confirmed_by_name: Option<String>,
    pub(crate) confirmed_at: Option<PrimitiveDateTime>,
}

/// Submission joined with its assignment, for group-centric listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct GroupSubmissionRow {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) assignment_title: String,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) group_id: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) confirmation_step: i32,
    pub(crate) first_click_by_name: Option<String>,
    pub(crate) first_click_at: Option<PrimitiveDateTime>,
    pub(crate) confirmed_by_name: Option<String>,
    pub(crate) confirmed_at: Option<PrimitiveDateTime>,
}

/// One line of the admin-wide tracking table: submission joined with both
/// its assignment and its group.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubmissionOverviewRow {
    pub(crate) id: String,
    pub(crate) assignment_id: String,
    pub(crate) assignment_title: String,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) group_id: String,
    pub(crate) group_name: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) confirmation_step: i32,
    pub(crate) first_click_by_name: Option<String>,
    pub(crate) first_click_at: Option<PrimitiveDateTime>,
    pub(crate) confirmed_by_name: Option<String>,
    pub(crate) confirmed_at: Option<PrimitiveDateTime>,
}

/// Admin view of one group's progress on one assignment, with the roster so
/// the admin can see who a pending confirmation is waiting on.
#[derive(Debug, Clone)]
pub(crate) struct AssignmentSubmissionView {
    pub(crate) submission: SubmissionView,
    pub(crate) group_name: String,
    pub(crate) members: Vec<MemberView>,
}

/// Fetches the tracking row for (assignment, group), creating a pending one
/// if none exists yet. `ON CONFLICT DO NOTHING` keeps this idempotent under
/// races; losers of the insert race read the winner's row.
pub(crate) async fn ensure_exists(
    pool: &PgPool,
    assignment_id: &str,
    group_id: &str,
) -> Result<Submission, sqlx::Error> {
    let inserted = sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (id, assignment_id, group_id)
         VALUES ($1, $2, $3)
         ON CONFLICT (assignment_id, group_id) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(assignment_id)
    .bind(group_id)
    .fetch_optional(pool)
    .await?;

    if let Some(submission) = inserted {
        return Ok(submission);
    }

    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE assignment_id = $1 AND group_id = $2"
    ))
    .bind(assignment_id)
    .bind(group_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_pair(
    pool: &PgPool,
    assignment_id: &str,
    group_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE assignment_id = $1 AND group_id = $2"
    ))
    .bind(assignment_id)
    .bind(group_id)
    .fetch_optional(pool)
    .await
}

/// Advances step 0 -> 1. The predicate on `confirmation_step` makes this a
/// compare-and-set: exactly one of any number of concurrent callers gets the
/// row back, the rest get `None`.
pub(crate) async fn first_step(
    pool: &PgPool,
    submission_id: &str,
    user_id: &str,
    at: PrimitiveDateTime,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET confirmation_step = 1, first_click_by = $2, first_click_at = $3
         WHERE id = $1 AND confirmation_step = 0
         RETURNING {COLUMNS}"
    ))
    .bind(submission_id)
    .bind(user_id)
    .bind(at)
    .fetch_optional(pool)
    .await
}

/// Advances step 1 -> 2 and flips the status to confirmed, same
/// compare-and-set shape as `first_step`.
pub(crate) async fn final_step(
    pool: &PgPool,
    submission_id: &str,
    user_id: &str,
    at: PrimitiveDateTime,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET confirmation_step = 2, status = $2, confirmed_by = $3, confirmed_at = $4
         WHERE id = $1 AND confirmation_step = 1
         RETURNING {COLUMNS}"
    ))
    .bind(submission_id)
    .bind(SubmissionStatus::Confirmed)
    .bind(user_id)
    .bind(at)
    .fetch_optional(pool)
    .await
}

/// The only backward transition: wipes all progress back to pending.
pub(crate) async fn reset(
    pool: &PgPool,
    assignment_id: &str,
    group_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET status = $3, confirmation_step = 0,
             first_click_by = NULL, first_click_at = NULL,
             confirmed_by = NULL, confirmed_at = NULL
         WHERE assignment_id = $1 AND group_id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(assignment_id)
    .bind(group_id)
    .bind(SubmissionStatus::Pending)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_view_by_pair(
    pool: &PgPool,
    assignment_id: &str,
    group_id: &str,
) -> Result<Option<SubmissionView>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionView>(
        "SELECT s.id, s.assignment_id, s.group_id, s.status, s.confirmation_step,
                s.first_click_by, fc.full_name AS first_click_by_name, s.first_click_at,
                s.confirmed_by, cf.full_name AS confirmed_by_name, s.confirmed_at
         FROM submissions s
         LEFT JOIN users fc ON fc.id = s.first_click_by
         LEFT JOIN users cf ON cf.id = s.confirmed_by
         WHERE s.assignment_id = $1 AND s.group_id = $2",
    )
    .bind(assignment_id)
    .bind(group_id)
    .fetch_optional(pool)
    .await
}

/// Every tracking row for one group, newest assignment first.
pub(crate) async fn list_for_group(
    pool: &PgPool,
    group_id: &str,
) -> Result<Vec<GroupSubmissionRow>, sqlx::Error> {
    sqlx::query_as::<_, GroupSubmissionRow>(
        "SELECT s.id, s.assignment_id, a.title AS assignment_title, a.due_date,
                s.group_id, s.status, s.confirmation_step,
                fc.full_name AS first_click_by_name, s.first_click_at,
                cf.full_name AS confirmed_by_name, s.confirmed_at
         FROM submissions s
         JOIN assignments a ON a.id = s.assignment_id
         LEFT JOIN users fc ON fc.id = s.first_click_by
         LEFT JOIN users cf ON cf.id = s.confirmed_by
         WHERE s.group_id = $1
         ORDER BY a.due_date DESC NULLS LAST, a.created_at DESC",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}

/// Admin: every group's tracking row for one assignment, roster included.
pub(crate) async fn list_for_assignment(
    pool: &PgPool,
    assignment_id: &str,
) -> Result<Vec<AssignmentSubmissionView>, sqlx::Error> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: String,
        assignment_id: String,
        group_id: String,
        group_name: String,
        status: SubmissionStatus,
        confirmation_step: i32,
        first_click_by: Option<String>,
        first_click_by_name: Option<String>,
        first_click_at: Option<PrimitiveDateTime>,
        confirmed_by: Option<String>,
        confirmed_by_name: Option<String>,
        confirmed_at: Option<PrimitiveDateTime>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT s.id, s.assignment_id, s.group_id, g.name AS group_name,
                s.status, s.confirmation_step,
                s.first_click_by, fc.full_name AS first_click_by_name, s.first_click_at,
                s.confirmed_by, cf.full_name AS confirmed_by_name, s.confirmed_at
         FROM submissions s
         JOIN groups g ON g.id = s.group_id
         LEFT JOIN users fc ON fc.id = s.first_click_by
         LEFT JOIN users cf ON cf.id = s.confirmed_by
         WHERE s.assignment_id = $1
         ORDER BY g.name",
    )
    .bind(assignment_id)
    .fetch_all(pool)
    .await?;

    let group_ids = rows.iter().map(|row| row.group_id.clone()).collect::<Vec<_>>();
    let mut members_by_group: HashMap<String, Vec<MemberView>> =
        groups::members_for_groups(pool, &group_ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| AssignmentSubmissionView {
            members: members_by_group.remove(&row.group_id).unwrap_or_default(),
            group_name: row.group_name,
            submission: SubmissionView {
                id: row.id,
                assignment_id: row.assignment_id,
                group_id: row.group_id,
                status: row.status,
                confirmation_step: row.confirmation_step,
                first_click_by: row.first_click_by,
                first_click_by_name: row.first_click_by_name,
                first_click_at: row.first_click_at,
                confirmed_by: row.confirmed_by,
                confirmed_by_name: row.confirmed_by_name,
                confirmed_at: row.confirmed_at,
            },
        })
        .collect())
}

/// Admin: every tracking row in the system, newest assignment first.
pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<SubmissionOverviewRow>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionOverviewRow>(
        "SELECT s.id, s.assignment_id, a.title AS assignment_title, a.due_date,
                s.group_id, g.name AS group_name, s.status, s.confirmation_step,
                fc.full_name AS first_click_by_name, s.first_click_at,
                cf.full_name AS confirmed_by_name, s.confirmed_at
         FROM submissions s
         JOIN assignments a ON a.id = s.assignment_id
         JOIN groups g ON g.id = s.group_id
         LEFT JOIN users fc ON fc.id = s.first_click_by
         LEFT JOIN users cf ON cf.id = s.confirmed_by
         ORDER BY a.due_date DESC NULLS LAST, a.created_at DESC, g.name",
    )
    .fetch_all(pool)
    .await
}

/// Per-group submission status for a batch of assignments, keyed by
/// (assignment, group). Backs the student listing's status enrichment.
pub(crate) async fn statuses_for_assignments(
    pool: &PgPool,
    assignment_ids: &[String],
    group_ids: &[String],
) -> Result<HashMap<(String, String), Submission>, sqlx::Error> {
    if assignment_ids.is_empty() || group_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE assignment_id = ANY($1) AND group_id = ANY($2)"
    ))
    .bind(assignment_ids)
    .bind(group_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ((row.assignment_id.clone(), row.group_id.clone()), row))
        .collect())
}
