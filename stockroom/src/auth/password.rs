//! Password hashing and verification.
//!
//! Passwords are hashed with Argon2id using a random per-hash salt and a
//! server-side pepper. The digest embeds the salt and cost parameters, so
//! verification needs only the stored string. Argon2's verifier compares
//! digests in constant time; verification never reveals how much of a
//! candidate matched.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::errors::{AuthError, AuthResult};

/// Hash a password with Argon2id + pepper
///
/// # Errors
///
/// * `AuthError::HashingFailed` - Argon2 rejected the input
pub fn hash_password(password: &str, pepper: &str) -> AuthResult<String> {
    let peppered = format!("{password}{pepper}");
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    Ok(argon2
        .hash_password(peppered.as_bytes(), &salt)
        .map_err(|_| AuthError::HashingFailed)?
        .to_string())
}

/// Verify a password against a stored digest.
///
/// Fails closed: a malformed digest is treated as a non-match, never as
/// a verification success.
pub fn verify_password(password: &str, pepper: &str, digest: &str) -> bool {
    let peppered = format!("{password}{pepper}");
    let Ok(parsed_hash) = PasswordHash::new(digest) else {
        return false;
    };

    Argon2::default()
        .verify_password(peppered.as_bytes(), &parsed_hash)
        .is_ok()
}
