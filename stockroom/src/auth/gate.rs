//! Authorization gate for protected routes.
//!
//! Routes never inspect session state directly; they ask the gate.
//! Authentication failures (no session, expired session) signal a redirect
//! back to the login screen, while authorization failures (role mismatch on
//! a live session) signal a forbidden response. The two denials must stay
//! observably different.

use super::models::{Role, SessionSnapshot};
use super::session::{SessionManager, SessionStatus};

/// Gate decision for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Request may proceed with this session view
    Granted(SessionSnapshot),
    /// No live authenticated session; send the client to the login screen
    LoginRedirect,
    /// Live session, insufficient role
    Forbidden,
}

/// Require a live authenticated session.
///
/// Touches the session first, so idle expiry is enforced before any
/// protected resource is reached. Missing tokens, unknown tokens, anonymous
/// sessions, and expired sessions all produce the same redirect signal.
pub fn require_authenticated(sessions: &SessionManager, token: Option<&str>) -> Access {
    let Some(token) = token else {
        return Access::LoginRedirect;
    };

    match sessions.touch(token) {
        SessionStatus::Active(snapshot) => Access::Granted(snapshot),
        SessionStatus::Expired => Access::LoginRedirect,
    }
}

/// Require a specific role on an already-authenticated session.
///
/// Pure function of the session snapshot; callers must have passed
/// [`require_authenticated`] first, since a role without a bound identity
/// is meaningless.
pub fn require_role(snapshot: &SessionSnapshot, required: Role) -> Access {
    if snapshot.role == required {
        Access::Granted(snapshot.clone())
    } else {
        Access::Forbidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;
    use chrono::Utc;
    use std::time::Duration;

    fn user_with_role(role: Role) -> User {
        User {
            id: 3,
            email: "gate@example.com".to_string(),
            username: "gatekeeper".to_string(),
            password_hash: "digest".to_string(),
            role,
            is_locked: false,
            failed_attempts: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_token_redirects() {
        let sessions = SessionManager::new();
        assert_eq!(require_authenticated(&sessions, None), Access::LoginRedirect);
    }

    #[test]
    fn test_anonymous_session_redirects() {
        let sessions = SessionManager::new();
        let token = sessions.create();
        assert_eq!(
            require_authenticated(&sessions, Some(&token)),
            Access::LoginRedirect
        );
    }

    #[test]
    fn test_bound_session_is_granted() {
        let sessions = SessionManager::new();
        let token = sessions.authenticate(None, &user_with_role(Role::User));

        match require_authenticated(&sessions, Some(&token)) {
            Access::Granted(snapshot) => assert_eq!(snapshot.user_id, 3),
            other => panic!("expected grant, got {other:?}"),
        }
    }

    #[test]
    fn test_expired_session_redirects() {
        let sessions = SessionManager::with_idle_timeout(Duration::ZERO);
        let token = sessions.authenticate(None, &user_with_role(Role::User));
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(
            require_authenticated(&sessions, Some(&token)),
            Access::LoginRedirect
        );
    }

    #[test]
    fn test_role_mismatch_is_forbidden_not_redirect() {
        let snapshot = SessionSnapshot {
            user_id: 3,
            username: "gatekeeper".to_string(),
            role: Role::User,
        };

        let denial = require_role(&snapshot, Role::Admin);
        assert_eq!(denial, Access::Forbidden);
        assert_ne!(denial, Access::LoginRedirect);
    }

    #[test]
    fn test_matching_role_is_granted() {
        let snapshot = SessionSnapshot {
            user_id: 3,
            username: "gatekeeper".to_string(),
            role: Role::Admin,
        };

        assert!(matches!(
            require_role(&snapshot, Role::Admin),
            Access::Granted(_)
        ));
    }
}
