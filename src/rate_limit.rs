//! Per-(chat, user) admission control.
//!
//! Each key gets a fixed cooldown: a call is admitted when the previous
//! admitted call for the same key is at least one window old. Rejected calls
//! leave the stored instant untouched.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default cooldown between translations for one user in one chat.
pub const RATE_SECONDS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub chat_id: i64,
    pub user_id: i64,
}

impl RateKey {
    pub fn new(chat_id: i64, user_id: i64) -> Self {
        Self { chat_id, user_id }
    }
}

pub struct RateLimiter {
    window: Duration,
    last_allowed: Mutex<HashMap<RateKey, Instant>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_allowed: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject a call made now.
    pub fn allow(&self, key: RateKey) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Admit or reject a call made at `now`.
    pub fn allow_at(&self, key: RateKey, now: Instant) -> bool {
        let mut last_allowed = self.last_allowed.lock();

        if let Some(last) = last_allowed.get(&key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        last_allowed.insert(key, now);
        true
    }

    /// Drop keys whose cooldown has fully elapsed.
    ///
    /// A swept key would be admitted on its next call anyway, so sweeping
    /// never changes an admission decision. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut last_allowed = self.last_allowed.lock();
        let before = last_allowed.len();
        last_allowed.retain(|_, last| now.saturating_duration_since(*last) < self.window);
        before - last_allowed.len()
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.last_allowed.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(RATE_SECONDS))
    }
}
