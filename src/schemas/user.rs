use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize)]
pub(crate) struct UserCreate {
    #[serde(alias = "fullName")]
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) password: String,
    #[serde(default = "default_user_role")]
    pub(crate) role: UserRole,
}

/// Login accepts either the email or the student code.
#[derive(Debug, Deserialize)]
pub(crate) struct UserLogin {
    pub(crate) identifier: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) role: UserRole,
    pub(crate) student_code: Option<String>,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: crate::db::models::User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            student_code: user.student_code,
            created_at: format_primitive(user.created_at),
        }
    }
}

/// Compact roster entry used by the available-students listing.
#[derive(Debug, Serialize)]
pub(crate) struct StudentSummary {
    pub(crate) id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) student_code: Option<String>,
}

impl StudentSummary {
    pub(crate) fn from_db(user: crate::db::models::User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            student_code: user.student_code,
        }
    }
}

fn default_user_role() -> UserRole {
    UserRole::Student
}
