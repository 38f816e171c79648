use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::config::RateLimitConfig;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited {
        /// Seconds until the key's window resets
        retry_after: u64,
    },
}

/// One fixed counting window for a key.
/// Replaced, not incremented, once the window has elapsed.
#[derive(Debug)]
struct WindowEntry {
    window_start: DateTime<Utc>,
    count: u32,
}

/// In-memory fixed-window rate limiter, keyed by install id with a
/// caller-address fallback.
///
/// Constructed once at startup and shared across workers via `web::Data`;
/// the map is mutex-guarded so check-and-update stays atomic under
/// actix-web's multi-threaded runtime. State is process-local: restarts
/// reset all windows, and nodes do not coordinate.
pub struct RateLimiter {
    max_per_window: u32,
    window_ms: i64,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_per_window: config.max_requests_per_window,
            window_ms: config.window.as_millis() as i64,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Derives the limiter key for a submission: a non-empty reported
    /// install id wins, otherwise the caller's network address. Clients
    /// without an install id share the coarser per-address window.
    pub fn key_for(install_id: Option<&str>, remote_addr: Option<&str>) -> String {
        match install_id {
            Some(id) if !id.is_empty() => format!("id:{}", id),
            _ => format!("ip:{}", remote_addr.unwrap_or("unknown")),
        }
    }

    /// Checks and counts one request for `key`
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Utc::now())
    }

    /// Like [`check`](Self::check) with an explicit clock, so window
    /// boundaries can be tested without waiting them out.
    pub fn check_at(&self, key: &str, now: DateTime<Utc>) -> Decision {
        let mut entries = self.lock_entries();

        match entries.get_mut(key) {
            Some(entry) if !self.window_elapsed(entry, now) => {
                // Over-limit checks still count; the window stays saturated
                // until it elapses.
                entry.count = entry.count.saturating_add(1);
                if entry.count > self.max_per_window {
                    Decision::Limited {
                        retry_after: self.retry_after(entry, now),
                    }
                } else {
                    Decision::Allowed
                }
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    WindowEntry {
                        window_start: now,
                        count: 1,
                    },
                );
                Decision::Allowed
            }
        }
    }

    /// Removes entries whose window has elapsed. Returns how many were
    /// dropped. Run periodically so the map stays bounded by the number of
    /// keys active in the last window, not over the process lifetime.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|_, entry| !self.window_elapsed(entry, now));
        before - entries.len()
    }

    /// Number of tracked keys (for logging and tests)
    pub fn tracked_keys(&self) -> usize {
        self.lock_entries().len()
    }

    fn window_elapsed(&self, entry: &WindowEntry, now: DateTime<Utc>) -> bool {
        (now - entry.window_start).num_milliseconds() > self.window_ms
    }

    fn retry_after(&self, entry: &WindowEntry, now: DateTime<Utc>) -> u64 {
        let remaining_ms = self.window_ms - (now - entry.window_start).num_milliseconds();
        (remaining_ms / 1000).max(1) as u64
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, WindowEntry>> {
        // A poisoned lock only means another worker panicked mid-check;
        // the map itself is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
