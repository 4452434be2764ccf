//! Account lockout policy.
//!
//! A pure decision function over the stored failed-attempt counter. The
//! authentication service rejects already-locked accounts before this policy
//! runs, so a locked account never reaches a password comparison and the
//! counter stops churning once the lock engages.

/// Consecutive failures at which an account locks
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;

/// Outcome of applying the lockout policy to one login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutDecision {
    /// New value for the stored failed-attempt counter
    pub failed_attempts: u32,
    /// Whether the account should transition to locked
    pub lock_account: bool,
}

/// Decide the new counter value and lock state for a login attempt.
///
/// Success resets the counter and never locks. Failure increments the
/// counter and locks at the post-increment count, i.e. with a threshold of
/// 5 the fifth consecutive failure both writes `failed_attempts = 5` and
/// locks the account.
pub fn decide(failed_attempts: u32, successful: bool, threshold: u32) -> LockoutDecision {
    if successful {
        return LockoutDecision {
            failed_attempts: 0,
            lock_account: false,
        };
    }

    let new_count = failed_attempts.saturating_add(1);
    LockoutDecision {
        failed_attempts: new_count,
        lock_account: new_count >= threshold,
    }
}
