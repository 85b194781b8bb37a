use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::Assignment;
use crate::db::types::TargetType;

const COLUMNS: &str =
    "id, title, description, due_date, onedrive_link, created_by, created_at";

#[derive(Debug, Clone)]
pub(crate) struct AssignmentView {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) onedrive_link: String,
    pub(crate) created_by: String,
    pub(crate) created_by_name: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) targets: Vec<TargetView>,
}

#[derive(Debug, Clone)]
pub(crate) struct TargetView {
    pub(crate) target_type: TargetType,
    pub(crate) group_id: Option<String>,
    pub(crate) group_name: Option<String>,
}

pub(crate) struct CreateAssignment<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub due_date: Option<PrimitiveDateTime>,
    pub onedrive_link: &'a str,
    pub created_by: &'a str,
    pub created_at: PrimitiveDateTime,
}

/// A target row ready for persistence; normalization (empty list -> one
/// `all` row) happens at the boundary before this is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TargetSpec {
    pub(crate) target_type: TargetType,
    pub(crate) group_id: Option<String>,
}

/// Inserts the assignment together with every target row in one transaction.
/// A target naming an unknown group trips the foreign key and rolls the whole
/// creation back, so an assignment without its targets is never observable.
pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssignment<'_>,
    targets: &[TargetSpec],
) -> Result<Assignment, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let assignment = sqlx::query_as::<_, Assignment>(&format!(
        "INSERT INTO assignments (
            id, title, description, due_date, onedrive_link, created_by, created_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.due_date)
    .bind(params.onedrive_link)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    for target in targets {
        sqlx::query(
            "INSERT INTO assignment_targets (id, assignment_id, target_type, group_id, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&assignment.id)
        .bind(target.target_type)
        .bind(target.group_id.as_deref())
        .bind(params.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(assignment)
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!("SELECT {COLUMNS} FROM assignments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_view_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<AssignmentView>, sqlx::Error> {
    let base = sqlx::query_as::<_, BaseRow>(
        "SELECT a.id, a.title, a.description, a.due_date, a.onedrive_link,
                a.created_by, u.full_name AS created_by_name, a.created_at
         FROM assignments a
         LEFT JOIN users u ON u.id = a.created_by
         WHERE a.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(base) = base else {
        return Ok(None);
    };

    let mut views = hydrate_targets(pool, vec![base]).await?;
    Ok(views.pop())
}

/// All assignments, admin view. Due date descending with NULLs last so the
/// most time-pressured items come first.
pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<AssignmentView>, sqlx::Error> {
    let base_rows = sqlx::query_as::<_, BaseRow>(
        "SELECT a.id, a.title, a.description, a.due_date, a.onedrive_link,
                a.created_by, u.full_name AS created_by_name, a.created_at
         FROM assignments a
         LEFT JOIN users u ON u.id = a.created_by
         ORDER BY a.due_date DESC NULLS LAST, a.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    hydrate_targets(pool, base_rows).await
}

/// Assignments visible to a student: any `all` target, or any `group` target
/// naming a group the student belongs to (the union of both).
pub(crate) async fn list_visible_for_student(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<AssignmentView>, sqlx::Error> {
    let base_rows = sqlx::query_as::<_, BaseRow>(
        "WITH student_groups AS (
            SELECT group_id FROM group_members WHERE user_id = $1
         ),
         relevant_assignments AS (
            SELECT DISTINCT assignment_id
            FROM assignment_targets at
            WHERE at.target_type = $2
               OR (at.target_type = $3
                   AND at.group_id IN (SELECT group_id FROM student_groups))
         )
         SELECT a.id, a.title, a.description, a.due_date, a.onedrive_link,
                a.created_by, u.full_name AS created_by_name, a.created_at
         FROM assignments a
         JOIN relevant_assignments ra ON ra.assignment_id = a.id
         LEFT JOIN users u ON u.id = a.created_by
         ORDER BY a.due_date DESC NULLS LAST, a.created_at DESC",
    )
    .bind(user_id)
    .bind(TargetType::All)
    .bind(TargetType::Group)
    .fetch_all(pool)
    .await?;

    hydrate_targets(pool, base_rows).await
}

pub(crate) struct UpdateAssignment<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub due_date: Option<PrimitiveDateTime>,
    pub onedrive_link: &'a str,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateAssignment<'_>,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "UPDATE assignments
         SET title = $2, description = $3, due_date = $4, onedrive_link = $5
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.due_date)
    .bind(params.onedrive_link)
    .fetch_optional(pool)
    .await
}

/// Cascades to targets and submissions.
pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, sqlx::FromRow)]
struct BaseRow {
    id: String,
    title: String,
    description: Option<String>,
    due_date: Option<PrimitiveDateTime>,
    onedrive_link: String,
    created_by: String,
    created_by_name: Option<String>,
    created_at: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct TargetRow {
    assignment_id: String,
    target_type: TargetType,
    group_id: Option<String>,
    group_name: Option<String>,
}

async fn hydrate_targets(
    pool: &PgPool,
    base_rows: Vec<BaseRow>,
) -> Result<Vec<AssignmentView>, sqlx::Error> {
    let assignment_ids = base_rows.iter().map(|row| row.id.clone()).collect::<Vec<_>>();

    let target_rows = if assignment_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, TargetRow>(
            "SELECT at.assignment_id, at.target_type, at.group_id, g.name AS group_name
             FROM assignment_targets at
             LEFT JOIN groups g ON g.id = at.group_id
             WHERE at.assignment_id = ANY($1)
             ORDER BY at.created_at",
        )
        .bind(&assignment_ids)
        .fetch_all(pool)
        .await?
    };

    let mut targets_by_assignment: HashMap<String, Vec<TargetView>> = HashMap::new();
    for row in target_rows {
        targets_by_assignment.entry(row.assignment_id).or_default().push(TargetView {
            target_type: row.target_type,
            group_id: row.group_id,
            group_name: row.group_name,
        });
    }

    let mut output = Vec::with_capacity(base_rows.len());
    for row in base_rows {
        output.push(AssignmentView {
            targets: targets_by_assignment.remove(&row.id).unwrap_or_default(),
            id: row.id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            onedrive_link: row.onedrive_link,
            created_by: row.created_by,
            created_by_name: row.created_by_name,
            created_at: row.created_at,
        });
    }

    Ok(output)
}
