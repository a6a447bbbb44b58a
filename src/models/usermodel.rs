//1
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Client,
    Employee,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Client => "client",
            UserRole::Employee => "employee",
        }
    }

    /// Landing route for a signed-in user of this role.
    pub fn home_route(&self) -> &'static str {
        match self {
            UserRole::Client => "/client/dashboard",
            UserRole::Employee => "/employee/dashboard",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,

    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub hourly_rate: Option<BigDecimal>,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub resume_url: Option<String>,
    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// Patch applied to the profile columns; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub hourly_rate: Option<BigDecimal>,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub resume_url: Option<String>,
    pub avatar_url: Option<String>,
}
