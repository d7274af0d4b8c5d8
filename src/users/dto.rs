use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::users::{repo_types::User, repo_types::UserPatch, services::CreateUser};

const LOGIN_MIN: usize = 3;
const LOGIN_MAX: usize = 20;
const EMAIL_MIN: usize = 5;
const PASSWORD_MIN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Request body for `POST /users`. Fields are optional so that a missing
/// field is reported next to the other violations instead of as a decode error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub login: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for `PATCH /users/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub login: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Envelope returned by create, update and delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

impl UserResponse {
    pub fn new(message: &str, user: User) -> Self {
        Self {
            message: message.to_string(),
            user,
        }
    }
}

fn check_login(login: &str, errors: &mut Vec<String>) {
    let len = login.chars().count();
    if len < LOGIN_MIN {
        errors.push(format!("login must be longer than or equal to {LOGIN_MIN} characters"));
    } else if len > LOGIN_MAX {
        errors.push(format!("login must be shorter than or equal to {LOGIN_MAX} characters"));
    }
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if !is_valid_email(email) {
        errors.push("email must be an email".into());
    }
    if email.chars().count() < EMAIL_MIN {
        errors.push(format!("email must be longer than or equal to {EMAIL_MIN} characters"));
    }
}

fn check_password(password: &str, errors: &mut Vec<String>) {
    if password.chars().count() < PASSWORD_MIN {
        errors.push(format!(
            "password must be longer than or equal to {PASSWORD_MIN} characters"
        ));
    }
}

impl CreateUserRequest {
    /// Every violation is collected; the request is rejected if any exist.
    pub fn validate(self) -> Result<CreateUser, Vec<String>> {
        let mut errors = Vec::new();

        match &self.login {
            Some(login) => check_login(login, &mut errors),
            None => errors.push("login should not be null or undefined".into()),
        }
        match &self.email {
            Some(email) => check_email(email, &mut errors),
            None => errors.push("email should not be null or undefined".into()),
        }
        match &self.password {
            Some(password) => check_password(password, &mut errors),
            None => errors.push("password should not be null or undefined".into()),
        }

        match (self.login, self.email, self.password) {
            (Some(login), Some(email), Some(password)) if errors.is_empty() => Ok(CreateUser {
                login,
                email,
                password,
            }),
            _ => Err(errors),
        }
    }
}

impl UpdateUserRequest {
    /// Checks the fields that are present. Emptiness is left to the service.
    pub fn validate(self) -> Result<UserPatch, Vec<String>> {
        let mut errors = Vec::new();
        if let Some(login) = &self.login {
            check_login(login, &mut errors);
        }
        if let Some(email) = &self.email {
            check_email(email, &mut errors);
        }
        if let Some(password) = &self.password {
            check_password(password, &mut errors);
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(UserPatch {
            login: self.login,
            email: self.email,
            password: self.password,
        })
    }
}
