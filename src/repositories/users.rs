use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str =
    "id, full_name, email, hashed_password, role, student_code, created_at";

/// Concurrent student registrations can race on the derived code; the unique
/// index rejects the loser and we re-derive.
const STUDENT_CODE_ATTEMPTS: u32 = 3;

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Lookup by email or student code, used by the invite flows.
pub(crate) async fn find_by_identifier(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE email = $1 OR student_code = $1"
    ))
    .bind(identifier)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_students(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE role = $1 ORDER BY full_name ASC"
    ))
    .bind(UserRole::Student)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub id: &'a str,
    pub full_name: &'a str,
    pub email: &'a str,
    pub hashed_password: String,
    pub role: UserRole,
    pub created_at: PrimitiveDateTime,
}

/// Inserts a user. Students receive the next `STU###` code, derived from the
/// current maximum inside the INSERT itself so the derivation and the write
/// are one statement; the unique index on `student_code` settles concurrent
/// registrations and the loser retries with a fresh derivation.
pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    if params.role != UserRole::Student {
        return sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, full_name, email, hashed_password, role, student_code, created_at)
             VALUES ($1, $2, $3, $4, $5, NULL, $6)
             RETURNING {COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.full_name)
        .bind(params.email)
        .bind(&params.hashed_password)
        .bind(params.role)
        .bind(params.created_at)
        .fetch_one(pool)
        .await;
    }

    let mut attempt = 0;
    loop {
        attempt += 1;

        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, full_name, email, hashed_password, role, student_code, created_at)
             SELECT $1, $2, $3, $4, $5,
                    'STU' || lpad(next_number::text, GREATEST(length(next_number::text), 3), '0'),
                    $6
             FROM (
                SELECT COALESCE(MAX(substring(student_code FROM 4)::int), 0) + 1 AS next_number
                FROM users
                WHERE student_code ~ '^STU[0-9]+$'
             ) AS seq
             RETURNING {COLUMNS}"
        ))
        .bind(params.id)
        .bind(params.full_name)
        .bind(params.email)
        .bind(&params.hashed_password)
        .bind(params.role)
        .bind(params.created_at)
        .fetch_one(pool)
        .await;

        match result {
            Ok(user) => return Ok(user),
            Err(err)
                if attempt < STUDENT_CODE_ATTEMPTS
                    && is_unique_violation_on(&err, "users_student_code_key") =>
            {
                continue;
            }
            Err(err) => return Err(err),
        }
    }
}

pub(crate) fn is_unique_violation_on(error: &sqlx::Error, constraint: &str) -> bool {
    match error {
        sqlx::Error::Database(db_error) => {
            db_error.code().as_deref() == Some("23505")
                && db_error.constraint() == Some(constraint)
        }
        _ => false,
    }
}
