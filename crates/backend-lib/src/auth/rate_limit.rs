// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Rate limiting for login attempts.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::LOGIN_LOCKED_OUT;

/// Default number of failed attempts before lockout
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (5 minutes)
pub const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(5 * 60);

/// How long a failure record is kept when no lockout is active
const FAILURE_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Tracked clients above which a failed attempt first sweeps stale records
const DEFAULT_CLEANUP_THRESHOLD: usize = 10_000;

/// Entry in the rate limit map
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of consecutive failed attempts
    failed_attempts: u32,
    /// Time of the last failed attempt
    last_failure: Instant,
    /// When the lockout expires, if locked out
    lockout_expiry: Option<Instant>,
}

/// Rate limiter for login attempts, keyed by client address
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<String, RateLimitEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
    cleanup_threshold: usize,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_DURATION)
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
        }
    }

    pub fn with_cleanup_threshold(mut self, threshold: usize) -> Self {
        self.cleanup_threshold = threshold;
        self
    }

    /// Record a failed login attempt
    pub fn record_failed_attempt(&self, key: &str) {
        if self.attempts.len() >= self.cleanup_threshold {
            self.cleanup();
        }
        let now = Instant::now();

        let mut entry = self
            .attempts
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // An expired lockout starts a fresh count
        if matches!(entry.lockout_expiry, Some(expiry) if now >= expiry) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            ::metrics::counter!(LOGIN_LOCKED_OUT).increment(1);
            tracing::warn!(client = %key, attempts = entry.failed_attempts, "client locked out of login");
        }
    }

    /// Record a successful login
    pub fn record_success(&self, key: &str) {
        self.attempts.remove(key);
    }

    /// Check if a client is allowed to attempt a login
    pub fn check_rate_limit(&self, key: &str) -> bool {
        match self.attempts.get(key) {
            Some(entry) => match entry.lockout_expiry {
                Some(expiry) => Instant::now() >= expiry,
                None => true,
            },
            None => true,
        }
    }

    /// Drop expired lockouts and stale failure records
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| match entry.lockout_expiry {
            Some(expiry) => now < expiry,
            None => now.duration_since(entry.last_failure) < FAILURE_RETENTION,
        });
    }

    /// Number of clients with a failure record
    pub fn tracked_clients(&self) -> usize {
        self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_after_max_attempts() {
        let limiter = AuthRateLimiter::new(3, Duration::from_secs(60));
        let client = "10.0.0.1";

        for _ in 0..2 {
            limiter.record_failed_attempt(client);
            assert!(limiter.check_rate_limit(client));
        }

        limiter.record_failed_attempt(client);
        assert!(!limiter.check_rate_limit(client));

        // Other clients are unaffected
        assert!(limiter.check_rate_limit("10.0.0.2"));
    }

    #[test]
    fn test_success_clears_failures() {
        let limiter = AuthRateLimiter::new(2, Duration::from_secs(60));
        limiter.record_failed_attempt("client");
        limiter.record_success("client");
        limiter.record_failed_attempt("client");
        assert!(limiter.check_rate_limit("client"));
    }

    #[test]
    fn test_lockout_expires() {
        let limiter = AuthRateLimiter::new(1, Duration::ZERO);
        limiter.record_failed_attempt("client");
        assert!(limiter.check_rate_limit("client"));

        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_failures_sweep_stale_records_past_threshold() {
        let limiter = AuthRateLimiter::new(1, Duration::ZERO).with_cleanup_threshold(2);
        limiter.record_failed_attempt("10.0.0.1");
        limiter.record_failed_attempt("10.0.0.2");
        assert_eq!(limiter.tracked_clients(), 2);

        // Both earlier lockouts have expired and are swept before the insert
        limiter.record_failed_attempt("10.0.0.3");
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
