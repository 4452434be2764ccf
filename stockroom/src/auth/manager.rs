//! Authentication manager implementation.

use std::sync::Arc;

use tracing::{info, warn};

use super::{
    errors::{AuthError, AuthResult},
    lockout::{self, DEFAULT_LOCKOUT_THRESHOLD, LockoutDecision},
    models::{NewUser, RegisterRequest, Role, User, UserId},
    password,
    session::SessionManager,
};
use crate::db::UserRepository;

/// Upper bound on compare-and-set retries for the failure counter. Two or
/// three racing attempts settle within a couple of rounds; anything beyond
/// this indicates the store is misbehaving.
const CAS_RETRY_LIMIT: u32 = 8;

/// Authentication manager
///
/// Orchestrates the credential store, password verifier, lockout policy,
/// and session manager for login, registration, logout, and the admin
/// account controls.
#[derive(Clone)]
pub struct AuthManager {
    repo: Arc<dyn UserRepository>,
    sessions: Arc<SessionManager>,
    pepper: String,
    lockout_threshold: u32,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Credential store
    /// * `sessions` - Session store shared with the authorization gate
    /// * `pepper` - Server-side pepper for password hashing
    pub fn new(repo: Arc<dyn UserRepository>, sessions: Arc<SessionManager>, pepper: String) -> Self {
        Self {
            repo,
            sessions,
            pepper,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
        }
    }

    /// Override the failed-attempt threshold at which accounts lock
    pub fn with_lockout_threshold(mut self, threshold: u32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    /// Session store used by this manager
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Authenticate a user and bind a session.
    ///
    /// `prior_session` is the caller's current (typically anonymous) session
    /// token, if any; it is destroyed and replaced on success so the token
    /// that existed before login never outlives the privilege boundary.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - Malformed email or empty password;
    ///   rejected before any store access
    /// * `AuthError::Unauthorized` - Unknown email or wrong password, which
    ///   are externally indistinguishable
    /// * `AuthError::AccountLocked` - Account locked, now or previously;
    ///   no password verification is attempted for an already-locked account
    pub async fn login(
        &self,
        email: &str,
        plaintext: &str,
        prior_session: Option<&str>,
    ) -> AuthResult<(User, String)> {
        if !is_valid_email(email) || plaintext.is_empty() {
            return Err(AuthError::InvalidInput(
                "A valid email address and password are required".to_string(),
            ));
        }

        let Some(user) = self.repo.find_by_email(email).await? else {
            // Same variant and message as a wrong password, so responses
            // cannot be used to probe which accounts exist.
            warn!("login attempt for unknown email");
            return Err(AuthError::Unauthorized);
        };

        if user.is_locked {
            warn!(user_id = user.id, "login attempt on locked account");
            return Err(AuthError::AccountLocked);
        }

        if self.verify_off_thread(plaintext, &user.password_hash).await? {
            self.repo.reset_failed_attempts(user.id).await?;
            let token = self.sessions.authenticate(prior_session, &user);
            info!(user_id = user.id, "login succeeded");

            let mut user = user;
            user.failed_attempts = 0;
            Ok((user, token))
        } else {
            let decision = self.record_failed_attempt(&user).await?;
            if decision.lock_account {
                warn!(
                    user_id = user.id,
                    failed_attempts = decision.failed_attempts,
                    "account locked after repeated failures"
                );
                Err(AuthError::AccountLocked)
            } else {
                warn!(
                    user_id = user.id,
                    failed_attempts = decision.failed_attempts,
                    "failed login attempt"
                );
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Register a new user and bind a session.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidInput` - Email, username, or password policy
    ///   violation; rejected before any store access
    /// * `AuthError::DuplicateAccount` - Email or username already taken
    pub async fn register(
        &self,
        request: RegisterRequest,
        prior_session: Option<&str>,
    ) -> AuthResult<(User, String)> {
        validate_email(&request.email)?;
        validate_username(&request.username)?;
        validate_password(&request.password)?;

        let password_hash = self.hash_off_thread(&request.password).await?;

        let user = self
            .repo
            .insert(NewUser {
                email: request.email,
                username: request.username,
                password_hash,
                role: Role::User,
            })
            .await?;

        let token = self.sessions.authenticate(prior_session, &user);
        info!(user_id = user.id, "registered new user");
        Ok((user, token))
    }

    /// Destroy a session. Always succeeds from the caller's perspective.
    pub fn logout(&self, session_token: &str) {
        self.sessions.destroy(session_token);
        info!("session destroyed on logout");
    }

    /// List all users, for the admin screens
    pub async fn list_users(&self) -> AuthResult<Vec<User>> {
        self.repo.list_all().await
    }

    /// Delete a user account
    pub async fn delete_user(&self, user_id: UserId) -> AuthResult<()> {
        self.repo.delete(user_id).await?;
        info!(user_id, "user deleted by administrator");
        Ok(())
    }

    /// Flip a user's lock state. Unlocking resets the failed-attempt
    /// counter so the account gets a fresh run of attempts.
    ///
    /// Returns the updated record, or `None` for an unknown user.
    pub async fn toggle_lock(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let Some(user) = self.repo.toggle_lock(user_id).await? else {
            return Ok(None);
        };

        info!(
            user_id,
            locked = user.is_locked,
            "lock state changed by administrator"
        );
        Ok(Some(user))
    }

    /// Persist a failed attempt through the lockout policy.
    ///
    /// Uses compare-and-set so two parallel wrong-password submissions
    /// cannot both read the same counter and lose the lock transition; the
    /// loser re-reads and retries against the fresh counter.
    async fn record_failed_attempt(&self, user: &User) -> AuthResult<LockoutDecision> {
        let mut attempts = user.failed_attempts.max(0) as u32;

        for _ in 0..CAS_RETRY_LIMIT {
            let decision = lockout::decide(attempts, false, self.lockout_threshold);
            let won = self
                .repo
                .apply_lockout(
                    user.id,
                    attempts as i32,
                    decision.failed_attempts as i32,
                    decision.lock_account,
                )
                .await?;
            if won {
                return Ok(decision);
            }

            let Some(fresh) = self.repo.find_by_email(&user.email).await? else {
                // Deleted mid-attempt; nothing left to count against.
                return Err(AuthError::Unauthorized);
            };
            if fresh.is_locked {
                return Ok(LockoutDecision {
                    failed_attempts: fresh.failed_attempts.max(0) as u32,
                    lock_account: true,
                });
            }
            attempts = fresh.failed_attempts.max(0) as u32;
        }

        Err(AuthError::Storage(
            "failed-attempt counter update kept losing races".to_string(),
        ))
    }

    /// Run Argon2 verification off the request path. A slow hash must not
    /// stall unrelated requests on the async executor.
    async fn verify_off_thread(&self, plaintext: &str, digest: &str) -> AuthResult<bool> {
        let plaintext = plaintext.to_string();
        let pepper = self.pepper.clone();
        let digest = digest.to_string();

        tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &pepper, &digest))
            .await
            .map_err(|_| AuthError::HashingFailed)
    }

    async fn hash_off_thread(&self, plaintext: &str) -> AuthResult<String> {
        let plaintext = plaintext.to_string();
        let pepper = self.pepper.clone();

        tokio::task::spawn_blocking(move || password::hash_password(&plaintext, &pepper))
            .await
            .map_err(|_| AuthError::HashingFailed)?
    }
}

/// Quick structural check used on the login path, where a malformed
/// identifier is rejected without touching the store.
fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn validate_email(email: &str) -> AuthResult<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AuthError::InvalidInput(
            "Email must be a valid address".to_string(),
        ))
    }
}

fn validate_username(username: &str) -> AuthResult<()> {
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err(AuthError::InvalidInput(
            "Username must be 3-20 characters".to_string(),
        ));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(AuthError::InvalidInput(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }

    Ok(())
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < 8 {
        return Err(AuthError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());

    if !has_digit || !has_uppercase || !has_lowercase {
        return Err(AuthError::InvalidInput(
            "Password must contain at least one number, one uppercase and one lowercase letter"
                .to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::mock::MockUserRepository;

    const PEPPER: &str = "test_pepper";
    const PASSWORD: &str = "Str0ng!Pass";

    fn manager_with_repo(repo: MockUserRepository) -> (AuthManager, Arc<MockUserRepository>) {
        let repo = Arc::new(repo);
        let manager = AuthManager::new(
            repo.clone(),
            Arc::new(SessionManager::new()),
            PEPPER.to_string(),
        );
        (manager, repo)
    }

    async fn register_alice(manager: &AuthManager) -> User {
        let (user, _token) = manager
            .register(
                RegisterRequest {
                    email: "a@b.com".to_string(),
                    username: "alice".to_string(),
                    password: PASSWORD.to_string(),
                },
                None,
            )
            .await
            .expect("registration should succeed");
        user
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (manager, _repo) = manager_with_repo(MockUserRepository::new());
        let registered = register_alice(&manager).await;

        assert_eq!(registered.role, Role::User);
        assert!(!registered.is_locked);
        assert_eq!(registered.failed_attempts, 0);

        let (user, token) = manager.login("a@b.com", PASSWORD, None).await.unwrap();
        assert_eq!(user.id, registered.id);
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn test_register_auto_authenticates() {
        let (manager, _repo) = manager_with_repo(MockUserRepository::new());
        let (user, token) = manager
            .register(
                RegisterRequest {
                    email: "a@b.com".to_string(),
                    username: "alice".to_string(),
                    password: PASSWORD.to_string(),
                },
                None,
            )
            .await
            .unwrap();

        match manager.sessions().touch(&token) {
            crate::auth::SessionStatus::Active(snapshot) => {
                assert_eq!(snapshot.user_id, user.id);
            }
            crate::auth::SessionStatus::Expired => panic!("session should be live"),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input_without_storage() {
        let (manager, repo) = manager_with_repo(MockUserRepository::new());

        let cases = [
            ("not-an-email", "alice", PASSWORD),
            ("a@b.com", "al", PASSWORD),
            ("a@b.com", "bad name!", PASSWORD),
            ("a@b.com", "alice", "short1A"),
            ("a@b.com", "alice", "alllowercase1"),
            ("a@b.com", "alice", "ALLUPPERCASE1"),
            ("a@b.com", "alice", "NoDigitsHere"),
        ];

        for (email, username, password) in cases {
            let result = manager
                .register(
                    RegisterRequest {
                        email: email.to_string(),
                        username: username.to_string(),
                        password: password.to_string(),
                    },
                    None,
                )
                .await;
            assert!(
                matches!(result, Err(AuthError::InvalidInput(_))),
                "{email}/{username}/{password} should be rejected"
            );
        }

        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (manager, _repo) = manager_with_repo(MockUserRepository::new());
        register_alice(&manager).await;

        let result = manager
            .register(
                RegisterRequest {
                    email: "a@b.com".to_string(),
                    username: "alice2".to_string(),
                    password: PASSWORD.to_string(),
                },
                None,
            )
            .await;

        assert!(matches!(result, Err(AuthError::DuplicateAccount)));
    }

    #[tokio::test]
    async fn test_login_unknown_email_matches_wrong_password() {
        let (manager, _repo) = manager_with_repo(MockUserRepository::new());
        register_alice(&manager).await;

        let unknown = manager
            .login("nonexistent@x.com", "anything1A", None)
            .await
            .unwrap_err();
        let wrong = manager.login("a@b.com", "wrongpass1A", None).await.unwrap_err();

        assert!(matches!(unknown, AuthError::Unauthorized));
        assert!(matches!(wrong, AuthError::Unauthorized));
        assert_eq!(unknown.client_message(), wrong.client_message());
    }

    #[tokio::test]
    async fn test_login_malformed_input_skips_store() {
        let (manager, _repo) = manager_with_repo(MockUserRepository::new());

        let result = manager.login("not-an-email", "whatever", None).await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));

        let result = manager.login("a@b.com", "", None).await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_five_failures_lock_the_account() {
        let (manager, repo) = manager_with_repo(MockUserRepository::new());
        let user = register_alice(&manager).await;

        for expected in 1..=4 {
            let err = manager.login("a@b.com", "wrongpass1A", None).await.unwrap_err();
            assert!(matches!(err, AuthError::Unauthorized));
            assert_eq!(repo.stored_attempts(user.id), Some(expected));
        }

        let err = manager.login("a@b.com", "wrongpass1A", None).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
        assert_eq!(repo.stored_attempts(user.id), Some(5));
    }

    #[tokio::test]
    async fn test_locked_account_rejects_correct_password_without_counting() {
        let (manager, repo) = manager_with_repo(MockUserRepository::new());
        let user = register_alice(&manager).await;

        for _ in 0..5 {
            let _ = manager.login("a@b.com", "wrongpass1A", None).await;
        }

        // Correct password, still locked, counter untouched.
        let err = manager.login("a@b.com", PASSWORD, None).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
        assert_eq!(repo.stored_attempts(user.id), Some(5));
    }

    #[tokio::test]
    async fn test_successful_login_resets_counter() {
        let (manager, repo) = manager_with_repo(MockUserRepository::new());
        let user = register_alice(&manager).await;

        for _ in 0..3 {
            let _ = manager.login("a@b.com", "wrongpass1A", None).await;
        }
        assert_eq!(repo.stored_attempts(user.id), Some(3));

        let (user, _token) = manager.login("a@b.com", PASSWORD, None).await.unwrap();
        assert_eq!(user.failed_attempts, 0);
        assert_eq!(repo.stored_attempts(user.id), Some(0));
    }

    #[tokio::test]
    async fn test_admin_unlock_resets_counter_and_allows_login() {
        let (manager, repo) = manager_with_repo(MockUserRepository::new());
        let user = register_alice(&manager).await;

        for _ in 0..5 {
            let _ = manager.login("a@b.com", "wrongpass1A", None).await;
        }
        assert!(matches!(
            manager.login("a@b.com", PASSWORD, None).await,
            Err(AuthError::AccountLocked)
        ));

        let unlocked = manager.toggle_lock(user.id).await.unwrap().unwrap();
        assert!(!unlocked.is_locked);
        assert_eq!(repo.stored_attempts(user.id), Some(0));

        assert!(manager.login("a@b.com", PASSWORD, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_toggle_lock_unknown_user() {
        let (manager, _repo) = manager_with_repo(MockUserRepository::new());
        assert!(manager.toggle_lock(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_regenerates_session_token() {
        let (manager, _repo) = manager_with_repo(MockUserRepository::new());
        register_alice(&manager).await;

        let anonymous = manager.sessions().create();
        let (_user, token) = manager
            .login("a@b.com", PASSWORD, Some(&anonymous))
            .await
            .unwrap();

        assert_ne!(anonymous, token);
        assert_eq!(
            manager.sessions().touch(&anonymous),
            crate::auth::SessionStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_logout_destroys_session_and_is_idempotent() {
        let (manager, _repo) = manager_with_repo(MockUserRepository::new());
        register_alice(&manager).await;

        let (_user, token) = manager.login("a@b.com", PASSWORD, None).await.unwrap();
        manager.logout(&token);
        manager.logout(&token);

        assert_eq!(
            manager.sessions().touch(&token),
            crate::auth::SessionStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_custom_lockout_threshold() {
        let repo = Arc::new(MockUserRepository::new());
        let manager = AuthManager::new(
            repo.clone(),
            Arc::new(SessionManager::new()),
            PEPPER.to_string(),
        )
        .with_lockout_threshold(2);

        register_alice(&manager).await;

        let _ = manager.login("a@b.com", "wrongpass1A", None).await;
        let err = manager.login("a@b.com", "wrongpass1A", None).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("@missing-local.com"));
        assert!(!is_valid_email("no-dot@domain"));
        assert!(!is_valid_email("spaces in@local.com"));
        assert!(!is_valid_email("trailing@dot."));
    }
}
