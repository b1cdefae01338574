//! Session identity registry.

use dashmap::DashMap;
use log::{debug, warn};
use palaver_auth::AuthenticatedUser;
use palaver_commons::SessionId;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide map from session identifier to authenticated identity.
///
/// Explicitly constructed at bootstrap and injected into every consumer; not
/// ambient global state. DashMap shards the key space, so operations on
/// independent sessions never contend on a common lock and one session's
/// churn cannot serialize another's.
///
/// Lifecycle per entry:
/// - inserted exactly once when the session's open frame authenticates
///   (a re-sent open frame replaces the entry, last writer wins);
/// - read on every subsequent frame of that session, from any worker;
/// - removed when the close frame is observed. Removal is idempotent.
///
/// A session whose close frame is never delivered keeps its entry until the
/// process exits; there is no liveness-driven expiry.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, AuthenticatedUser>,
    total_opened: AtomicUsize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            total_opened: AtomicUsize::new(0),
        }
    }

    /// Associate an identity with a session.
    ///
    /// Replaces any previous identity for the same session id; the value is
    /// swapped atomically, never partially written.
    pub fn insert(&self, session_id: SessionId, user: AuthenticatedUser) {
        let username = user.username.clone();
        if let Some(previous) = self.sessions.insert(session_id.clone(), user) {
            warn!(
                "Session {} re-authenticated: {} -> {}",
                session_id, previous.username, username
            );
        } else {
            self.total_opened.fetch_add(1, Ordering::Relaxed);
            debug!("Session {} bound to user {}", session_id, username);
        }
    }

    /// Resolve the identity owning a session, if any.
    ///
    /// Returns a clone; the shard guard is released before this returns, so
    /// callers are free to await or call into the directory afterwards.
    pub fn get(&self, session_id: &SessionId) -> Option<AuthenticatedUser> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    /// Drop the identity for a session.
    ///
    /// Idempotent: removing an absent entry is a no-op, not an error.
    /// Returns true when an entry was actually removed.
    pub fn remove(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.remove(session_id);
        if let Some((_, user)) = &removed {
            debug!("Session {} unbound from user {}", session_id, user.username);
        }
        removed.is_some()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Total sessions ever opened (for the stats endpoint / logs).
    pub fn total_opened(&self) -> usize {
        self.total_opened.load(Ordering::Relaxed)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
