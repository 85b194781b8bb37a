use std::collections::HashMap;

use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Group;
use crate::db::types::GroupRole;

#[derive(Debug, Clone)]
pub(crate) struct GroupView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) owner_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) members: Vec<MemberView>,
}

#[derive(Debug, Clone)]
pub(crate) struct MemberView {
    pub(crate) group_id: String,
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) student_code: Option<String>,
    pub(crate) role: GroupRole,
}

pub(crate) struct CreateGroup<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub owner_id: &'a str,
    pub created_at: PrimitiveDateTime,
}

/// Creates the group and its owner membership in one transaction so a group
/// without an owner member is never observable.
pub(crate) async fn create(pool: &PgPool, params: CreateGroup<'_>) -> Result<Group, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let group = sqlx::query_as::<_, Group>(
        "INSERT INTO groups (id, name, owner_id, created_at)
         VALUES ($1, $2, $3, $4)
         RETURNING id, name, owner_id, created_at",
    )
    .bind(params.id)
    .bind(params.name)
    .bind(params.owner_id)
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO group_members (group_id, user_id, role, joined_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&group.id)
    .bind(params.owner_id)
    .bind(GroupRole::Owner)
    .bind(params.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(group)
}

pub(crate) async fn add_member(
    pool: &PgPool,
    group_id: &str,
    user_id: &str,
    role: GroupRole,
    joined_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO group_members (group_id, user_id, role, joined_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (group_id, user_id) DO NOTHING",
    )
    .bind(group_id)
    .bind(user_id)
    .bind(role)
    .bind(joined_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        "SELECT id, name, owner_id, created_at FROM groups WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn membership_role(
    pool: &PgPool,
    group_id: &str,
    user_id: &str,
) -> Result<Option<GroupRole>, sqlx::Error> {
    sqlx::query_scalar::<_, GroupRole>(
        "SELECT role FROM group_members WHERE group_id = $1 AND user_id = $2",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn is_member(
    pool: &PgPool,
    group_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    Ok(membership_role(pool, group_id, user_id).await?.is_some())
}

pub(crate) async fn group_ids_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT group_id FROM group_members WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<GroupView>, sqlx::Error> {
    let base_rows = sqlx::query_as::<_, Group>(
        "SELECT g.id, g.name, g.owner_id, g.created_at
         FROM groups g
         WHERE g.id IN (SELECT group_id FROM group_members WHERE user_id = $1)
         ORDER BY g.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    hydrate_members(pool, base_rows).await
}

pub(crate) async fn find_view_by_id(
    pool: &PgPool,
    group_id: &str,
) -> Result<Option<GroupView>, sqlx::Error> {
    let Some(group) = find_by_id(pool, group_id).await? else {
        return Ok(None);
    };

    let mut views = hydrate_members(pool, vec![group]).await?;
    Ok(views.pop())
}

/// Rosters for a batch of groups, keyed by group id. Owners sort before
/// members, then alphabetically.
pub(crate) async fn members_for_groups(
    pool: &PgPool,
    group_ids: &[String],
) -> Result<HashMap<String, Vec<MemberView>>, sqlx::Error> {
    let member_rows = if group_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, MemberRow>(
            "SELECT gm.group_id,
                    u.id AS user_id,
                    u.full_name,
                    u.email,
                    u.student_code,
                    gm.role
             FROM group_members gm
             JOIN users u ON u.id = gm.user_id
             WHERE gm.group_id = ANY($1)
             ORDER BY gm.role, u.full_name",
        )
        .bind(group_ids)
        .fetch_all(pool)
        .await?
    };

    let mut members_by_group: HashMap<String, Vec<MemberView>> = HashMap::new();
    for row in member_rows {
        members_by_group.entry(row.group_id.clone()).or_default().push(MemberView {
            group_id: row.group_id,
            user_id: row.user_id,
            full_name: row.full_name,
            email: row.email,
            student_code: row.student_code,
            role: row.role,
        });
    }

    Ok(members_by_group)
}

async fn hydrate_members(
    pool: &PgPool,
    base_rows: Vec<Group>,
) -> Result<Vec<GroupView>, sqlx::Error> {
    let group_ids = base_rows.iter().map(|row| row.id.clone()).collect::<Vec<_>>();
    let mut members_by_group = members_for_groups(pool, &group_ids).await?;

    let mut output = Vec::with_capacity(base_rows.len());
    for row in base_rows {
        output.push(GroupView {
            members: members_by_group.remove(&row.id).unwrap_or_default(),
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            created_at: row.created_at,
        });
    }

    Ok(output)
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    group_id: String,
    user_id: String,
    full_name: String,
    email: String,
    student_code: Option<String>,
    role: GroupRole,
}
