use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::users::repo_types::{NewUser, User, UserFilter, UserPatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("no matching row")]
    RowNotFound,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::RowNotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::UniqueViolation(db.constraint().unwrap_or("unknown").to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage primitives the user service is built on.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_many(&self) -> StoreResult<Vec<User>>;

    async fn find_first(&self, filter: UserFilter) -> StoreResult<Option<User>>;

    async fn create(&self, user: NewUser) -> StoreResult<User>;

    /// Fails with `StoreError::RowNotFound` when no row has `id`.
    async fn update(&self, id: i32, patch: UserPatch) -> StoreResult<User>;

    /// Fails with `StoreError::RowNotFound` when no row has `id`.
    async fn delete(&self, id: i32) -> StoreResult<User>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_many(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, email, password, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn find_first(&self, filter: UserFilter) -> StoreResult<Option<User>> {
        let user = match filter {
            UserFilter::Id(id) => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, login, email, password, created_at
                    FROM users
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.db)
                .await?
            }
            UserFilter::LoginOrEmail { login, email } => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, login, email, password, created_at
                    FROM users
                    WHERE login = $1 OR email = $2
                    ORDER BY id
                    LIMIT 1
                    "#,
                )
                .bind(login)
                .bind(email)
                .fetch_optional(&self.db)
                .await?
            }
        };
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, login, email, password, created_at
            "#,
        )
        .bind(user.login)
        .bind(user.email)
        .bind(user.password)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: i32, patch: UserPatch) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET login    = COALESCE($2, login),
                email    = COALESCE($3, email),
                password = COALESCE($4, password)
            WHERE id = $1
            RETURNING id, login, email, password, created_at
            "#,
        )
        .bind(id)
        .bind(patch.login)
        .bind(patch.email)
        .bind(patch.password)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: i32) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, login, email, password, created_at
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_store_row_not_found() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::RowNotFound));
    }

    #[test]
    fn other_sqlx_errors_are_kept_as_database_errors() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Database(sqlx::Error::PoolTimedOut)));
        assert!(!err.to_string().is_empty());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("duplicate key value violates unique constraint")]
    struct DuplicateKey {
        constraint: Option<&'static str>,
    }

    impl sqlx::error::DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_violation_keeps_constraint_name() {
        let err: StoreError = sqlx::Error::Database(Box::new(DuplicateKey {
            constraint: Some("users_login_key"),
        }))
        .into();
        assert!(matches!(err, StoreError::UniqueViolation(ref c) if c == "users_login_key"));

        let err = crate::users::error::UserError::from_store("create_user", err);
        assert_eq!(err.kind(), crate::users::error::ErrorKind::AlreadyExists);
        assert_eq!(err.operation(), Some("create_user"));
    }

    #[test]
    fn unique_violation_without_constraint_is_unknown() {
        let err: StoreError = sqlx::Error::Database(Box::new(DuplicateKey { constraint: None })).into();
        assert!(matches!(err, StoreError::UniqueViolation(ref c) if c == "unknown"));
    }
}
