//! Outstanding consent-flow `state` values.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a consent URL stays redeemable
pub const STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// One-shot `state` values issued with consent URLs
pub struct PendingAuthorizations {
    ttl: Duration,
    issued: Mutex<HashMap<String, Instant>>,
}

impl PendingAuthorizations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// Generate and remember a fresh `state`.
    pub fn issue(&self) -> String {
        let state = nanoid::nanoid!(32);
        if let Ok(mut issued) = self.issued.lock() {
            let now = Instant::now();
            issued.retain(|_, at| now.duration_since(*at) < self.ttl);
            issued.insert(state.clone(), now);
        }
        state
    }

    /// Consume `state`; true only for a value issued within the TTL that
    /// has not been redeemed before.
    pub fn redeem(&self, state: &str) -> bool {
        match self.issued.lock() {
            Ok(mut issued) => issued
                .remove(state)
                .is_some_and(|at| at.elapsed() < self.ttl),
            Err(_) => false,
        }
    }
}

impl Default for PendingAuthorizations {
    fn default() -> Self {
        Self::new(STATE_TTL)
    }
}
