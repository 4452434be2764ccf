//! Authentication module providing user registration, login, lockout, and
//! session management.
//!
//! This module implements secure authentication with:
//! - Argon2id password hashing with server-side pepper
//! - Failed-attempt lockout (accounts lock after 5 consecutive failures)
//! - Opaque server-held session tokens, regenerated at login
//! - Idle-timeout session expiry (10 minutes by default)
//! - An authorization gate for authenticated-only and admin-only routes
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stockroom::auth::{AuthManager, RegisterRequest, SessionManager};
//! use stockroom::db::{Database, DatabaseConfig, PgUserRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let repo = Arc::new(PgUserRepository::new(db.pool().clone()));
//!     let sessions = Arc::new(SessionManager::new());
//!     let auth = AuthManager::new(repo, sessions, "secret_pepper".to_string());
//!
//!     let request = RegisterRequest {
//!         email: "alice@example.com".to_string(),
//!         username: "alice".to_string(),
//!         password: "Str0ng!Pass".to_string(),
//!     };
//!
//!     let (user, session_token) = auth.register(request, None).await?;
//!     println!("Registered {} with session {session_token}", user.username);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod gate;
pub mod lockout;
pub mod manager;
pub mod models;
pub mod password;
pub mod session;

pub use errors::{AuthError, AuthResult};
pub use gate::{Access, require_authenticated, require_role};
pub use lockout::{DEFAULT_LOCKOUT_THRESHOLD, LockoutDecision, decide};
pub use manager::AuthManager;
pub use models::{LoginRequest, NewUser, RegisterRequest, Role, SessionSnapshot, User, UserId};
pub use session::{DEFAULT_IDLE_TIMEOUT, SessionManager, SessionStatus};
