//! Repository trait definitions for testability and dependency injection.
//!
//! The authentication service talks to the credential store only through
//! [`UserRepository`]. Raw sqlx errors are translated to
//! [`AuthError::Storage`] at this boundary and never cross it.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::auth::{AuthError, AuthResult, NewUser, Role, User, UserId};

/// Trait for credential-store operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a newly registered user.
    ///
    /// A unique-constraint violation on email or username reports
    /// [`AuthError::DuplicateAccount`], distinct from generic storage
    /// failure.
    async fn insert(&self, user: NewUser) -> AuthResult<User>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Zero the failed-attempt counter after a successful login
    async fn reset_failed_attempts(&self, user_id: UserId) -> AuthResult<()>;

    /// Compare-and-set update of the lockout counters.
    ///
    /// Writes `new_attempts` (and the lock flag, if `lock` is set) only if
    /// the stored counter still equals `expected_attempts`. Returns whether
    /// the write won; a `false` return means a concurrent attempt got there
    /// first and the caller must re-read and retry.
    async fn apply_lockout(
        &self,
        user_id: UserId,
        expected_attempts: i32,
        new_attempts: i32,
        lock: bool,
    ) -> AuthResult<bool>;

    /// Atomically flip the lock flag; unlocking also resets the
    /// failed-attempt counter. The flip and the conditional reset happen in
    /// one statement, so two concurrent toggles serialize at the store
    /// instead of both reading the same prior state.
    ///
    /// Returns the updated record, or `None` for an unknown user.
    async fn toggle_lock(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Delete a user record
    async fn delete(&self, user_id: UserId) -> AuthResult<()>;

    /// List all users, for the admin screens
    async fn list_all(&self) -> AuthResult<Vec<User>>;
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, role, is_locked, failed_attempts, created_at";

fn map_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role: Role::from_str_or_user(row.get::<&str, _>("role")),
        is_locked: row.get("is_locked"),
        failed_attempts: row.get("failed_attempts"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUser) -> AuthResult<User> {
        let query = format!(
            "INSERT INTO users (email, username, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if e.as_database_error()
                    .is_some_and(|db| db.is_unique_violation())
                {
                    AuthError::DuplicateAccount
                } else {
                    AuthError::from(e)
                }
            })?;

        Ok(map_user(&row))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_user))
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_user))
    }

    async fn reset_failed_attempts(&self, user_id: UserId) -> AuthResult<()> {
        sqlx::query("UPDATE users SET failed_attempts = 0 WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn apply_lockout(
        &self,
        user_id: UserId,
        expected_attempts: i32,
        new_attempts: i32,
        lock: bool,
    ) -> AuthResult<bool> {
        // The WHERE clause doubles as the compare of the compare-and-set:
        // a concurrent writer that already bumped the counter makes this
        // update match zero rows.
        let result = sqlx::query(
            "UPDATE users
             SET failed_attempts = $3, is_locked = is_locked OR $4
             WHERE id = $1 AND failed_attempts = $2",
        )
        .bind(user_id)
        .bind(expected_attempts)
        .bind(new_attempts)
        .bind(lock)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn toggle_lock(&self, user_id: UserId) -> AuthResult<Option<User>> {
        // The CASE reads the pre-update lock state, so an unlock resets the
        // counter while a lock leaves it in place.
        let query = format!(
            "UPDATE users
             SET is_locked = NOT is_locked,
                 failed_attempts = CASE WHEN is_locked THEN 0 ELSE failed_attempts END
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_user))
    }

    async fn delete(&self, user_id: UserId) -> AuthResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_all(&self) -> AuthResult<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(map_user).collect())
    }
}
