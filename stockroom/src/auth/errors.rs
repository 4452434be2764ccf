//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or policy-violating client input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Bad credentials. Covers both an unknown identifier and a wrong
    /// password so that responses cannot be used to enumerate accounts.
    #[error("Invalid email or password")]
    Unauthorized,

    /// Account locked after too many failed attempts
    #[error("Account is locked. Please contact an administrator")]
    AccountLocked,

    /// Registration with an email that already has an account
    #[error("An account with this email already exists")]
    DuplicateAccount,

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Record store failure. The detail stays server-side; callers only
    /// ever see the sanitized [`AuthError::client_message`].
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage and hashing errors are sanitized to prevent information
    /// disclosure about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Storage(_) | AuthError::HashingFailed => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
