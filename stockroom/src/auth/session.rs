//! Session lifecycle management.
//!
//! The server holds the canonical copy of every session, keyed by an opaque
//! token; clients only ever see the token. Logging in regenerates the token
//! so that a token fixed before authentication never survives the privilege
//! boundary. Authenticated sessions expire after a configurable idle
//! timeout, enforced by [`SessionManager::touch`] on every request;
//! abandoned entries are swept out whenever a new session is created, so
//! the store stays bounded by recent activity.
//!
//! All operations take the one store mutex, so an expiry check and a login
//! regeneration on the same token cannot interleave.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::models::{SessionSnapshot, User};

/// Idle timeout applied when none is configured: 10 minutes
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Result of touching a session before a protected-resource access
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Session is bound and within the idle timeout; timestamp refreshed
    Active(SessionSnapshot),
    /// Session is unknown, unbound, or idle past the timeout. Expired
    /// entries are destroyed before this is returned.
    Expired,
}

struct SessionEntry {
    user: Option<SessionSnapshot>,
    last_activity: Instant,
}

/// In-process session store
pub struct SessionManager {
    idle_timeout: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Create a session manager with the default 10-minute idle timeout
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    /// Create a session manager with a custom idle timeout
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Configured idle timeout
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        // A poisoned lock only means another thread panicked mid-update;
        // the map itself is still usable.
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every entry idle past the timeout. A client that walks away
    /// never touches its token again, so expiry-on-touch alone would let
    /// abandoned entries pile up; sweeping from the session-creating paths
    /// bounds the map by the number of recently active clients.
    fn purge_expired(&self, sessions: &mut HashMap<String, SessionEntry>) {
        sessions.retain(|_, entry| entry.last_activity.elapsed() <= self.idle_timeout);
    }

    /// Create a fresh anonymous session and return its token.
    ///
    /// Anonymous sessions carry no identity and are rejected by the
    /// authorization gate until [`SessionManager::authenticate`] binds one.
    pub fn create(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.guard();
        self.purge_expired(&mut sessions);
        sessions.insert(
            token.clone(),
            SessionEntry {
                user: None,
                last_activity: Instant::now(),
            },
        );
        token
    }

    /// Bind a user to a session, regenerating the token.
    ///
    /// Any prior token is destroyed and a fresh unguessable token is issued,
    /// so a session identity obtained before login is useless afterwards.
    /// Returns the new token.
    pub fn authenticate(&self, prior_token: Option<&str>, user: &User) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.guard();
        self.purge_expired(&mut sessions);
        if let Some(prior) = prior_token {
            sessions.remove(prior);
        }
        sessions.insert(
            token.clone(),
            SessionEntry {
                user: Some(SessionSnapshot {
                    user_id: user.id,
                    username: user.username.clone(),
                    role: user.role,
                }),
                last_activity: Instant::now(),
            },
        );
        token
    }

    /// Check and refresh a session before a protected-resource access.
    ///
    /// A bound session within the idle timeout has its activity timestamp
    /// refreshed and reports [`SessionStatus::Active`]. A session idle past
    /// the timeout is destroyed and reports [`SessionStatus::Expired`], as
    /// do unknown tokens and anonymous sessions.
    pub fn touch(&self, token: &str) -> SessionStatus {
        let mut sessions = self.guard();
        let Some(entry) = sessions.get_mut(token) else {
            return SessionStatus::Expired;
        };

        let Some(user) = entry.user.clone() else {
            return SessionStatus::Expired;
        };

        if entry.last_activity.elapsed() > self.idle_timeout {
            sessions.remove(token);
            return SessionStatus::Expired;
        }

        entry.last_activity = Instant::now();
        SessionStatus::Active(user)
    }

    /// Explicitly invalidate a session. Idempotent.
    pub fn destroy(&self, token: &str) {
        self.guard().remove(token);
    }

    /// Number of live sessions (anonymous included)
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Rewind a session's activity timestamp, for expiry tests.
    #[cfg(test)]
    fn backdate(&self, token: &str, by: Duration) {
        if let Some(entry) = self.guard().get_mut(token) {
            entry.last_activity = Instant::now() - by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use chrono::Utc;

    fn test_user() -> User {
        User {
            id: 7,
            email: "alice@example.com".to_string(),
            username: "alice".to_string(),
            password_hash: "digest".to_string(),
            role: Role::User,
            is_locked: false,
            failed_attempts: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_anonymous_session_is_not_active() {
        let sessions = SessionManager::new();
        let token = sessions.create();
        assert_eq!(sessions.touch(&token), SessionStatus::Expired);
    }

    #[test]
    fn test_unknown_token_is_not_active() {
        let sessions = SessionManager::new();
        assert_eq!(sessions.touch("no-such-token"), SessionStatus::Expired);
    }

    #[test]
    fn test_authenticate_regenerates_token() {
        let sessions = SessionManager::new();
        let anonymous = sessions.create();
        let authenticated = sessions.authenticate(Some(&anonymous), &test_user());

        assert_ne!(anonymous, authenticated);
        // The pre-login token must be dead after the privilege boundary.
        assert_eq!(sessions.touch(&anonymous), SessionStatus::Expired);
        assert!(matches!(
            sessions.touch(&authenticated),
            SessionStatus::Active(_)
        ));
    }

    #[test]
    fn test_authenticate_without_prior_session() {
        let sessions = SessionManager::new();
        let token = sessions.authenticate(None, &test_user());

        match sessions.touch(&token) {
            SessionStatus::Active(snapshot) => {
                assert_eq!(snapshot.user_id, 7);
                assert_eq!(snapshot.username, "alice");
                assert_eq!(snapshot.role, Role::User);
            }
            SessionStatus::Expired => panic!("fresh session should be active"),
        }
    }

    #[test]
    fn test_touch_within_timeout_is_active() {
        let sessions = SessionManager::with_idle_timeout(Duration::from_secs(600));
        let token = sessions.authenticate(None, &test_user());

        sessions.backdate(&token, Duration::from_secs(599));
        assert!(matches!(sessions.touch(&token), SessionStatus::Active(_)));
    }

    #[test]
    fn test_touch_past_timeout_destroys_session() {
        let sessions = SessionManager::with_idle_timeout(Duration::from_secs(600));
        let token = sessions.authenticate(None, &test_user());

        sessions.backdate(&token, Duration::from_secs(601));
        assert_eq!(sessions.touch(&token), SessionStatus::Expired);
        // Destroyed, not just reported: a second touch must also miss.
        assert_eq!(sessions.touch(&token), SessionStatus::Expired);
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_touch_refreshes_activity() {
        let sessions = SessionManager::with_idle_timeout(Duration::from_secs(600));
        let token = sessions.authenticate(None, &test_user());

        sessions.backdate(&token, Duration::from_secs(599));
        assert!(matches!(sessions.touch(&token), SessionStatus::Active(_)));

        // The refresh above reset the clock; another near-timeout wait
        // still finds the session alive.
        sessions.backdate(&token, Duration::from_secs(599));
        assert!(matches!(sessions.touch(&token), SessionStatus::Active(_)));
    }

    #[test]
    fn test_abandoned_session_is_purged_on_next_login() {
        let sessions = SessionManager::with_idle_timeout(Duration::from_secs(600));
        let abandoned = sessions.authenticate(None, &test_user());
        sessions.backdate(&abandoned, Duration::from_secs(601));

        // The abandoned token is never touched again; the next login
        // sweeps it out rather than leaving it in the store forever.
        let _active = sessions.authenticate(None, &test_user());

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.touch(&abandoned), SessionStatus::Expired);
    }

    #[test]
    fn test_create_purges_expired_entries() {
        let sessions = SessionManager::with_idle_timeout(Duration::from_secs(600));
        let stale_anonymous = sessions.create();
        let stale_bound = sessions.authenticate(None, &test_user());
        sessions.backdate(&stale_anonymous, Duration::from_secs(601));
        sessions.backdate(&stale_bound, Duration::from_secs(601));

        let _fresh = sessions.create();

        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_purge_spares_live_sessions() {
        let sessions = SessionManager::with_idle_timeout(Duration::from_secs(600));
        let live = sessions.authenticate(None, &test_user());
        sessions.backdate(&live, Duration::from_secs(599));

        let _fresh = sessions.create();

        assert!(matches!(sessions.touch(&live), SessionStatus::Active(_)));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let sessions = SessionManager::new();
        let token = sessions.authenticate(None, &test_user());

        sessions.destroy(&token);
        sessions.destroy(&token);
        assert_eq!(sessions.touch(&token), SessionStatus::Expired);
    }

    #[test]
    fn test_sessions_are_independent() {
        let sessions = SessionManager::with_idle_timeout(Duration::from_secs(600));
        let first = sessions.authenticate(None, &test_user());
        let second = sessions.authenticate(None, &test_user());

        sessions.backdate(&first, Duration::from_secs(601));
        assert_eq!(sessions.touch(&first), SessionStatus::Expired);
        assert!(matches!(sessions.touch(&second), SessionStatus::Active(_)));
    }
}
