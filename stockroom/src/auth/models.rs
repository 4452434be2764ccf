//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Database column representation
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse the database column representation. Unknown values fall back
    /// to the least-privileged role.
    pub fn from_str_or_user(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    /// Argon2id digest, never the raw password
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_locked: bool,
    pub failed_attempts: i32,
    pub created_at: DateTime<Utc>,
}

/// Row to insert for a newly registered user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// User registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// User login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Read-only view of an authenticated session, handed to the authorization
/// gate and to protected handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::from_str_or_user(Role::Admin.as_str()), Role::Admin);
        assert_eq!(Role::from_str_or_user(Role::User.as_str()), Role::User);
    }

    #[test]
    fn test_unknown_role_defaults_to_user() {
        assert_eq!(Role::from_str_or_user("superuser"), Role::User);
        assert_eq!(Role::from_str_or_user(""), Role::User);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: 1,
            email: "a@b.com".to_string(),
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            role: Role::User,
            is_locked: false,
            failed_attempts: 0,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }
}
