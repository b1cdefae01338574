//! User directory abstraction (principal resolver).

use crate::error::{AuthError, AuthResult};
use dashmap::DashMap;
use palaver_commons::{UserName, UserRecord};

/// Abstraction over user lookup for authentication flows.
///
/// Implementations may perform blocking I/O; callers must never invoke the
/// directory while holding a lock on shared session state.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user by username (the principal name).
    async fn get_user_by_username(&self, username: &UserName) -> AuthResult<UserRecord>;

    /// Return all known users. Used for the chat roster.
    async fn all_users(&self) -> AuthResult<Vec<UserRecord>>;
}

/// In-memory directory keyed by username.
///
/// Persistent user storage is an external collaborator of this service; this
/// implementation holds the records the server is seeded with at startup and
/// anything registered at runtime.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserName, UserRecord>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Insert or replace a user record.
    pub fn insert(&self, record: UserRecord) {
        self.users.insert(record.username.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user_by_username(&self, username: &UserName) -> AuthResult<UserRecord> {
        self.users
            .get(username)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AuthError::UserNotFound(format!("User '{}' not found", username)))
    }

    async fn all_users(&self) -> AuthResult<Vec<UserRecord>> {
        let mut users: Vec<UserRecord> =
            self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by(|a, b| a.username.as_str().cmp(b.username.as_str()));
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_commons::{Role, UserId};

    fn record(name: &str) -> UserRecord {
        UserRecord::new(
            UserId::new(format!("u_{}", name)),
            UserName::new(name),
            name.to_uppercase(),
            Role::User,
        )
    }

    #[tokio::test]
    async fn lookup_hits_and_misses() {
        let dir = InMemoryUserDirectory::new();
        dir.insert(record("alice"));

        let found = dir.get_user_by_username(&UserName::new("alice")).await.unwrap();
        assert_eq!(found.display_name, "ALICE");

        let missing = dir.get_user_by_username(&UserName::new("mallory")).await;
        assert!(matches!(missing, Err(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn all_users_sorted_by_username() {
        let dir = InMemoryUserDirectory::new();
        dir.insert(record("carol"));
        dir.insert(record("alice"));
        dir.insert(record("bob"));

        let names: Vec<String> = dir
            .all_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username.into_string())
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }
}
