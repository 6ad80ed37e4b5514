// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VAULTGATE - CREDENTIAL RATE LIMITER
//
// Fixed-window counter per credential id. Exactly `budget` requests pass
// per window; the next one is rejected immediately with a retry hint.
// No queueing, no blocking wait. Integer math only.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Recover from a poisoned mutex instead of panicking
fn safe_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct WindowCounter {
    window_start: Instant,
    used: u32,
}

#[derive(Clone)]
pub struct CredentialRateLimiter {
    counters: Arc<Mutex<HashMap<String, WindowCounter>>>,
    window: Duration,
    default_budget: u32,
    /// Per-credential budget overrides (credential id -> budget)
    overrides: HashMap<String, u32>,
    cleanup_interval: Duration,
    last_cleanup: Arc<Mutex<Instant>>,
}

impl CredentialRateLimiter {
    pub fn new(window: Duration, default_budget: u32, overrides: HashMap<String, u32>) -> Self {
        CredentialRateLimiter {
            counters: Arc::new(Mutex::new(HashMap::new())),
            window,
            default_budget,
            overrides,
            cleanup_interval: Duration::from_secs(300),
            last_cleanup: Arc::new(Mutex::new(Instant::now())),
        }
    }

    fn budget_for(&self, credential_id: &str) -> u32 {
        self.overrides
            .get(credential_id)
            .copied()
            .unwrap_or(self.default_budget)
    }

    /// Count one request against the credential's current window.
    /// Returns Err(seconds until the window resets) when over budget.
    /// The counter update is a single atomic step under the map lock.
    pub fn check_and_record(&self, credential_id: &str) -> Result<(), u64> {
        self.cleanup_if_needed();

        let now = Instant::now();
        let budget = self.budget_for(credential_id);
        let mut counters = safe_lock(&self.counters);

        let counter = counters
            .entry(credential_id.to_string())
            .or_insert_with(|| WindowCounter {
                window_start: now,
                used: 0,
            });

        // Fixed window: the counter resets completely when the window ends
        if now.duration_since(counter.window_start) >= self.window {
            counter.window_start = now;
            counter.used = 0;
        }

        if counter.used >= budget {
            let elapsed = now.duration_since(counter.window_start);
            let wait = self.window.saturating_sub(elapsed).as_secs() + 1;
            return Err(wait);
        }

        counter.used += 1;
        Ok(())
    }

    /// Remaining budget in the current window (for monitoring)
    #[allow(dead_code)]
    pub fn remaining(&self, credential_id: &str) -> u32 {
        let budget = self.budget_for(credential_id);
        let now = Instant::now();
        let counters = safe_lock(&self.counters);
        match counters.get(credential_id) {
            Some(c) if now.duration_since(c.window_start) < self.window => {
                budget.saturating_sub(c.used)
            }
            _ => budget,
        }
    }

    pub fn tracked_credentials(&self) -> usize {
        safe_lock(&self.counters).len()
    }

    /// Drop counters whose window expired long ago (idle credentials)
    fn cleanup_if_needed(&self) {
        let mut last_cleanup = safe_lock(&self.last_cleanup);
        if last_cleanup.elapsed() >= self.cleanup_interval {
            let mut counters = safe_lock(&self.counters);
            let now = Instant::now();
            let horizon = self.window * 2;
            counters.retain(|_, c| now.duration_since(c.window_start) < horizon);
            *last_cleanup = now;
        }
    }
}
