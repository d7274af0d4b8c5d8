//! In-memory `UserStore` used by the service and HTTP tests.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::users::repo::{StoreError, StoreResult, UserStore};
use crate::users::repo_types::{NewUser, User, UserFilter, UserPatch};

/// Mirrors the Postgres schema: serial ids and unique `login` / `email`.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
    last_id: AtomicI32,
    failing: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with a pool timeout.
    pub fn fail_next_calls(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn unique_conflict(users: &[User], skip_id: Option<i32>, login: &str, email: &str) -> Option<String> {
    users
        .iter()
        .filter(|u| Some(u.id) != skip_id)
        .find_map(|u| {
            if u.login == login {
                Some("users_login_key".to_string())
            } else if u.email == email {
                Some("users_email_key".to_string())
            } else {
                None
            }
        })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_many(&self) -> StoreResult<Vec<User>> {
        self.check_available()?;
        Ok(self.users.read().await.clone())
    }

    async fn find_first(&self, filter: UserFilter) -> StoreResult<Option<User>> {
        self.check_available()?;
        let users = self.users.read().await;
        Ok(users.iter().find(|u| filter.matches(u)).cloned())
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        self.check_available()?;
        let mut users = self.users.write().await;
        if let Some(constraint) = unique_conflict(&users, None, &user.login, &user.email) {
            return Err(StoreError::UniqueViolation(constraint));
        }
        let created = User {
            id: self.last_id.fetch_add(1, Ordering::SeqCst) + 1,
            login: user.login,
            email: user.email,
            password: user.password,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, patch: UserPatch) -> StoreResult<User> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let pos = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::RowNotFound)?;

        let mut next = users[pos].clone();
        if let Some(login) = patch.login {
            next.login = login;
        }
        if let Some(email) = patch.email {
            next.email = email;
        }
        if let Some(password) = patch.password {
            next.password = password;
        }
        if let Some(constraint) = unique_conflict(&users, Some(id), &next.login, &next.email) {
            return Err(StoreError::UniqueViolation(constraint));
        }

        users[pos] = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: i32) -> StoreResult<User> {
        self.check_available()?;
        let mut users = self.users.write().await;
        let pos = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::RowNotFound)?;
        Ok(users.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(login: &str, email: &str) -> NewUser {
        NewUser {
            login: login.into(),
            email: email.into(),
            password: "hash".into(),
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_sequence_and_never_reused() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("alice", "a@x.io")).await.unwrap();
        let b = store.create(new_user("bob", "b@x.io")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        store.delete(b.id).await.unwrap();
        let c = store.create(new_user("carol", "c@x.io")).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn unique_columns_are_enforced() {
        let store = MemoryUserStore::new();
        store.create(new_user("alice", "a@x.io")).await.unwrap();
        let err = store.create(new_user("alice", "z@x.io")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(ref c) if c == "users_login_key"));
    }

    #[tokio::test]
    async fn missing_rows_report_row_not_found() {
        let store = MemoryUserStore::new();
        assert!(matches!(store.delete(5).await, Err(StoreError::RowNotFound)));
        assert!(matches!(
            store.update(5, UserPatch::default()).await,
            Err(StoreError::RowNotFound)
        ));
    }
}
