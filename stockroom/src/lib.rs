//! # Stockroom
//!
//! An inventory-store library with database-backed authentication and
//! session management.
//!
//! The core of the crate is the authentication and session lifecycle:
//! credential verification, account lockout, session creation and
//! regeneration, idle-timeout expiry, and the authorization gate that
//! protected routes consult before touching inventory data.
//!
//! ## Core Modules
//!
//! - [`auth`]: Authentication service, password hashing, lockout policy,
//!   session manager, and the authorization gate
//! - [`db`]: PostgreSQL connection pooling and repository traits
//! - [`inventory`]: Per-user item records read by protected routes
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stockroom::auth::{AuthManager, SessionManager};
//! use stockroom::db::{Database, DatabaseConfig, PgUserRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let repo = Arc::new(PgUserRepository::new(db.pool().clone()));
//!     let sessions = Arc::new(SessionManager::new());
//!     let auth = AuthManager::new(repo, sessions, "secret_pepper".to_string());
//!     let (user, token) = auth
//!         .login("alice@example.com", "Str0ng!Pass", None)
//!         .await?;
//!     println!("Logged in {} with session {token}", user.username);
//!     Ok(())
//! }
//! ```

/// Authentication, sessions, and authorization.
pub mod auth;
pub use auth::{AuthError, AuthManager, AuthResult, SessionManager};

/// Database connection pooling and repositories.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Inventory item records.
pub mod inventory;
