use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::AppConfig;
use crate::users::{
    error::{UserError, UserResult},
    password::hash_password,
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User, UserFilter, UserPatch},
};

/// Validated create request. `password` is still plaintext here.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub login: String,
    pub email: String,
    pub password: String,
}

/// Business rules for user records, on top of a `UserStore`.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    salt_round: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, config: &AppConfig) -> Self {
        Self {
            store,
            salt_round: config.salt_round,
        }
    }

    /// All users ordered by id. An empty table is reported as `NoUsers`.
    #[instrument(skip(self))]
    pub async fn get_users(&self) -> UserResult<Vec<User>> {
        let users = self
            .store
            .find_many()
            .await
            .map_err(|e| UserError::from_store("get_users", e))?;
        if users.is_empty() {
            return Err(UserError::NoUsers);
        }
        Ok(users)
    }

    /// Existence check, then hash, then insert. The order matters: a rejected
    /// candidate never pays for hashing.
    #[instrument(skip(self, input), fields(login = %input.login))]
    pub async fn create_user(&self, input: CreateUser) -> UserResult<User> {
        if self.is_user_exist(&input.login, &input.email).await? {
            warn!(login = %input.login, "login or email already taken");
            return Err(UserError::AlreadyExists {
                operation: "create_user",
            });
        }

        let hash = self.create_hash(&input.password)?;

        // A concurrent creator can still win between the check and the insert;
        // the unique constraints turn that into AlreadyExists as well.
        let user = self
            .store
            .create(NewUser {
                login: input.login,
                email: input.email,
                password: hash,
            })
            .await
            .map_err(|e| UserError::from_store("create_user", e))?;

        info!(user_id = user.id, login = %user.login, "user created");
        Ok(user)
    }

    pub fn create_hash(&self, password: &str) -> UserResult<String> {
        hash_password(password, self.salt_round).map_err(|e| UserError::HashingFailure {
            operation: "create_hash",
            cause: e.to_string(),
        })
    }

    async fn is_user_exist(&self, login: &str, email: &str) -> UserResult<bool> {
        let found = self
            .store
            .find_first(UserFilter::LoginOrEmail {
                login: login.to_string(),
                email: email.to_string(),
            })
            .await
            .map_err(|e| UserError::from_store("is_user_exist", e))?;
        Ok(found.is_some())
    }

    /// `Ok(None)` when no user has `id`.
    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: i32) -> UserResult<Option<User>> {
        self.store
            .find_first(UserFilter::Id(id))
            .await
            .map_err(|e| UserError::from_store("get_user_by_id", e))
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i32) -> UserResult<User> {
        self.require_user("delete_user", id).await?;

        let user = self.store.delete(id).await.map_err(|e| match e {
            StoreError::RowNotFound => UserError::UserNotFound {
                operation: "delete_user",
                id,
            },
            e => UserError::from_store("delete_user", e),
        })?;

        info!(user_id = user.id, "user deleted");
        Ok(user)
    }

    /// Applies a non-empty patch. A new password is hashed before it is stored.
    #[instrument(skip(self, patch))]
    pub async fn update_user(&self, id: i32, mut patch: UserPatch) -> UserResult<User> {
        if patch.is_empty() {
            return Err(UserError::EmptyPatch);
        }

        self.require_user("update_user", id).await?;

        if let Some(plain) = patch.password.take() {
            patch.password = Some(self.create_hash(&plain)?);
        }

        let user = self.store.update(id, patch).await.map_err(|e| match e {
            StoreError::RowNotFound => UserError::UserNotFound {
                operation: "update_user",
                id,
            },
            e => UserError::from_store("update_user", e),
        })?;

        info!(user_id = user.id, "user updated");
        Ok(user)
    }

    async fn require_user(&self, operation: &'static str, id: i32) -> UserResult<User> {
        match self.get_user_by_id(id).await? {
            Some(user) => Ok(user),
            None => {
                debug!(id, operation, "user lookup found nothing");
                Err(UserError::UserNotFound { operation, id })
            }
        }
    }
}
