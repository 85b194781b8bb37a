use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Creates or repairs the first admin account from env configuration.
/// Admins never receive a student code.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let email = &admin.first_superuser_email;
    let user = repositories::users::find_by_email(state.db(), email).await?;

    if let Some(user) = user {
        let password_ok =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);

        if password_ok && user.role == UserRole::Admin {
            tracing::info!("Default superuser already up to date");
            return Ok(());
        }

        let hashed_password = if password_ok {
            user.hashed_password.clone()
        } else {
            security::hash_password(&admin.first_superuser_password)?
        };

        sqlx::query(
            "UPDATE users
             SET hashed_password = $1,
                 role = $2
             WHERE id = $3",
        )
        .bind(hashed_password)
        .bind(UserRole::Admin)
        .bind(&user.id)
        .execute(state.db())
        .await?;

        tracing::info!("Updated default superuser {email}");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;

    sqlx::query(
        "INSERT INTO users (
            id, full_name, email, hashed_password, role, student_code, created_at
        ) VALUES ($1,$2,$3,$4,$5,NULL,$6)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind("Super Admin")
    .bind(email)
    .bind(hashed_password)
    .bind(UserRole::Admin)
    .bind(primitive_now_utc())
    .execute(state.db())
    .await?;

    tracing::info!("Created default superuser {email}");
    Ok(())
}
