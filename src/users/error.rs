use thiserror::Error;

use crate::users::repo::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    AlreadyExists,
    NotFound,
    HashingFailure,
    PersistenceFailure,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Request body must not be empty")]
    EmptyPatch,

    #[error("User already exist. Change your login or email")]
    AlreadyExists { operation: &'static str },

    #[error("User is not found")]
    UserNotFound { operation: &'static str, id: i32 },

    #[error("Users not found")]
    NoUsers,

    #[error("{operation}: password hashing failed: {cause}")]
    HashingFailure { operation: &'static str, cause: String },

    #[error("{operation}: {source}")]
    PersistenceFailure {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::EmptyPatch => ErrorKind::Validation,
            UserError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            UserError::UserNotFound { .. } | UserError::NoUsers => ErrorKind::NotFound,
            UserError::HashingFailure { .. } => ErrorKind::HashingFailure,
            UserError::PersistenceFailure { .. } => ErrorKind::PersistenceFailure,
        }
    }

    pub fn operation(&self) -> Option<&'static str> {
        match self {
            UserError::AlreadyExists { operation }
            | UserError::UserNotFound { operation, .. }
            | UserError::HashingFailure { operation, .. }
            | UserError::PersistenceFailure { operation, .. } => Some(*operation),
            UserError::EmptyPatch | UserError::NoUsers => None,
        }
    }

    /// Wraps a storage failure raised while running `operation`.
    ///
    /// Unique violations become `AlreadyExists`; everything else stays a
    /// persistence failure tagged with the operation name.
    pub(crate) fn from_store(operation: &'static str, source: StoreError) -> Self {
        match source {
            StoreError::UniqueViolation(_) => UserError::AlreadyExists { operation },
            source => UserError::PersistenceFailure { operation, source },
        }
    }
}
