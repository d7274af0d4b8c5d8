use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32, // assigned by the database
    pub login: String,
    pub email: String,
    pub password: String, // Argon2 PHC string, never plaintext
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Row to insert; `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password: String,
}

/// Partial change set for an existing user. `None` leaves the column as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub login: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.login.is_none() && self.email.is_none() && self.password.is_none()
    }
}

/// Predicate accepted by `UserStore::find_first`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(i32),
    LoginOrEmail { login: String, email: String },
}

impl UserFilter {
    #[cfg(test)]
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserFilter::Id(id) => user.id == *id,
            UserFilter::LoginOrEmail { login, email } => {
                user.login == *login || user.email == *email
            }
        }
    }
}
