//! In-memory registry of live sessions.
//!
//! Sessions are stored once, keyed by session id. A secondary index maps each
//! refresh token to its session id. Both maps sit behind a single lock, so
//! every lookup-then-mutate sequence below is atomic with respect to every
//! other registry operation.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

use crate::domain::UserId;

/// Server-side record binding a refresh token to a user and client metadata.
///
/// The two keys (`session_id`, `refresh_token`) are fixed at construction so
/// code holding `&mut Session` inside the registry cannot desynchronise the
/// indexes.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    session_id: String,
    refresh_token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: Option<String>,
}

impl Session {
    #[must_use]
    pub const fn new(
        session_id: String,
        refresh_token: String,
        user_id: UserId,
        created_at: DateTime<Utc>,
        ip_address: String,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            session_id,
            refresh_token,
            user_id,
            created_at,
            last_used_at: created_at,
            ip_address,
            user_agent,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("refresh_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("last_used_at", &self.last_used_at)
            .field("ip_address", &self.ip_address)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// What to do with a session after inspecting it under the lock.
#[derive(Debug)]
pub enum Disposition<T> {
    Keep(T),
    Evict(T),
}

/// Returned by [`SessionRegistry::insert`] when a key is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertConflict {
    SessionId,
    RefreshToken,
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<String, Session>,
    by_refresh_token: HashMap<String, String>,
}

impl Indexes {
    fn evict(&mut self, session_id: &str) -> Option<Session> {
        let session = self.by_id.remove(session_id)?;
        self.by_refresh_token.remove(&session.refresh_token);
        Some(session)
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<Indexes>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts under both keys. Neither key may already be present.
    pub fn insert(&self, session: Session) -> Result<(), InsertConflict> {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&session.session_id) {
            return Err(InsertConflict::SessionId);
        }
        if inner.by_refresh_token.contains_key(&session.refresh_token) {
            return Err(InsertConflict::RefreshToken);
        }

        inner
            .by_refresh_token
            .insert(session.refresh_token.clone(), session.session_id.clone());
        inner.by_id.insert(session.session_id.clone(), session);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.inner.read().by_id.get(session_id).cloned()
    }

    #[must_use]
    pub fn find_by_refresh_token(&self, refresh_token: &str) -> Option<Session> {
        let inner = self.inner.read();
        let session_id = inner.by_refresh_token.get(refresh_token)?;
        inner.by_id.get(session_id).cloned()
    }

    /// Runs `f` on the session with `session_id` while holding the write lock.
    /// Returns `None` when no such session exists.
    pub fn modify<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> Disposition<T>,
    ) -> Option<T> {
        let mut inner = self.inner.write();
        let session = inner.by_id.get_mut(session_id)?;
        match f(session) {
            Disposition::Keep(value) => Some(value),
            Disposition::Evict(value) => {
                inner.evict(session_id);
                Some(value)
            }
        }
    }

    /// Like [`Self::modify`], locating the session by its refresh token.
    pub fn modify_by_refresh_token<T>(
        &self,
        refresh_token: &str,
        f: impl FnOnce(&mut Session) -> Disposition<T>,
    ) -> Option<T> {
        let mut inner = self.inner.write();
        let session_id = inner.by_refresh_token.get(refresh_token)?.clone();
        let session = inner.by_id.get_mut(&session_id)?;
        match f(session) {
            Disposition::Keep(value) => Some(value),
            Disposition::Evict(value) => {
                inner.evict(&session_id);
                Some(value)
            }
        }
    }

    pub fn remove(&self, session_id: &str) -> Option<Session> {
        self.inner.write().evict(session_id)
    }

    /// Removes every session matching `predicate` and returns them.
    pub fn remove_where(&self, predicate: impl Fn(&Session) -> bool) -> Vec<Session> {
        let mut inner = self.inner.write();
        let doomed: Vec<String> = inner
            .by_id
            .values()
            .filter(|s| predicate(s))
            .map(|s| s.session_id.clone())
            .collect();

        doomed.iter().filter_map(|id| inner.evict(id)).collect()
    }

    pub fn remove_for_user(&self, user_id: UserId) -> Vec<Session> {
        self.remove_where(|s| s.user_id == user_id)
    }

    /// Empties the registry and returns how many sessions were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let count = inner.by_id.len();
        inner.by_id.clear();
        inner.by_refresh_token.clear();
        count
    }

    /// Consistent copy of every session.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Session> {
        self.inner.read().by_id.values().cloned().collect()
    }

    #[must_use]
    pub fn sessions_for_user(&self, user_id: UserId) -> Vec<Session> {
        self.inner
            .read()
            .by_id
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn session(id: &str, token: &str, user: i32) -> Session {
        Session::new(
            id.to_string(),
            token.to_string(),
            UserId::new(user),
            Utc::now(),
            "127.0.0.1".to_string(),
            None,
        )
    }

    #[test]
    fn reachable_by_id_and_refresh_token() {
        let registry = SessionRegistry::new();
        registry.insert(session("s1", "r1", 1)).unwrap();

        assert_eq!(registry.get("s1").unwrap().refresh_token(), "r1");
        assert_eq!(
            registry.find_by_refresh_token("r1").unwrap().session_id(),
            "s1"
        );
        assert!(registry.get("r1").is_none());
        assert!(registry.find_by_refresh_token("s1").is_none());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let registry = SessionRegistry::new();
        registry.insert(session("s1", "r1", 1)).unwrap();

        assert_eq!(
            registry.insert(session("s1", "r2", 1)),
            Err(InsertConflict::SessionId)
        );
        assert_eq!(
            registry.insert(session("s2", "r1", 1)),
            Err(InsertConflict::RefreshToken)
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_refresh_token("r2").is_none());
    }

    #[test]
    fn remove_drops_both_indexes() {
        let registry = SessionRegistry::new();
        registry.insert(session("s1", "r1", 1)).unwrap();

        assert!(registry.remove("s1").is_some());
        assert!(registry.get("s1").is_none());
        assert!(registry.find_by_refresh_token("r1").is_none());
        assert!(registry.remove("s1").is_none());
    }

    #[test]
    fn modify_can_touch_or_evict() {
        let registry = SessionRegistry::new();
        registry.insert(session("s1", "r1", 1)).unwrap();
        let later = Utc::now() + Duration::minutes(3);

        let touched = registry.modify("s1", |s| {
            s.last_used_at = later;
            Disposition::Keep(s.last_used_at)
        });
        assert_eq!(touched, Some(later));
        assert_eq!(registry.get("s1").unwrap().last_used_at, later);

        let evicted = registry.modify_by_refresh_token("r1", |s| Disposition::Evict(s.user_id));
        assert_eq!(evicted, Some(UserId::new(1)));
        assert!(registry.is_empty());
        assert!(registry.find_by_refresh_token("r1").is_none());

        assert_eq!(registry.modify("s1", |_| Disposition::Keep(())), None);
    }

    #[test]
    fn remove_for_user_leaves_other_users() {
        let registry = SessionRegistry::new();
        registry.insert(session("a1", "ra1", 1)).unwrap();
        registry.insert(session("a2", "ra2", 1)).unwrap();
        registry.insert(session("b1", "rb1", 2)).unwrap();

        let removed = registry.remove_for_user(UserId::new(1));
        assert_eq!(removed.len(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("b1").is_some());
        assert!(registry.find_by_refresh_token("ra1").is_none());
        assert!(registry.find_by_refresh_token("rb1").is_some());
    }

    #[test]
    fn clear_reports_count() {
        let registry = SessionRegistry::new();
        registry.insert(session("s1", "r1", 1)).unwrap();
        registry.insert(session("s2", "r2", 2)).unwrap();

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert!(registry.find_by_refresh_token("r2").is_none());
    }

    #[test]
    fn debug_output_redacts_refresh_token() {
        let rendered = format!("{:?}", session("s1", "super-secret-refresh", 1));
        assert!(!rendered.contains("super-secret-refresh"));
    }

    #[test]
    fn concurrent_evictions_remove_each_session_once() {
        let registry = Arc::new(SessionRegistry::new());
        for i in 0..100 {
            registry
                .insert(session(&format!("s{i}"), &format!("r{i}"), i % 4))
                .unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| registry.remove(&format!("s{i}")).is_some())
                        .count()
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 100);
        assert!(registry.is_empty());
    }
}
