//! Rate-limited warnings for hot overload paths.
//!
//! Under overload the same warning can fire thousands of times per second
//! (e.g. every dropped pull request). `ThrottledLog` emits at most one line
//! per interval and reports how many were suppressed in between.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default minimum gap between two emitted warnings.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_secs(5);

struct ThrottleState {
    last_emit: Option<Instant>,
    suppressed: u64,
}

/// A warning sink that emits at most once per `interval`.
pub struct ThrottledLog {
    component: &'static str,
    interval: Duration,
    state: Mutex<ThrottleState>,
}

impl ThrottledLog {
    pub fn new(component: &'static str, interval: Duration) -> Self {
        Self {
            component,
            interval,
            state: Mutex::new(ThrottleState {
                last_emit: None,
                suppressed: 0,
            }),
        }
    }

    /// Log `message` at WARN level unless one was emitted within the interval.
    ///
    /// Returns `true` if the line was emitted.
    pub fn warn(&self, message: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let due = state
            .last_emit
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if !due {
            state.suppressed += 1;
            return false;
        }
        let suppressed = std::mem::take(&mut state.suppressed);
        state.last_emit = Some(now);
        drop(state);

        tracing::warn!(component = self.component, suppressed, "{message}");
        true
    }

    pub fn component(&self) -> &'static str {
        self.component
    }
}
