//! Timing scopes for pipeline stages.
//!
//! # Usage
//!
//! ```
//! use stockseries_core::timing::TimedScope;
//!
//! fn consolidate() {
//!     let _scope = TimedScope::new("consolidating data");
//!     // Work happens here...
//!     // Duration logged on drop
//! }
//! ```

use std::time::{Duration, Instant};

/// Logs `starting: <label>` on creation and the elapsed time on drop.
pub struct TimedScope {
    label: &'static str,
    start: Instant,
}

impl TimedScope {
    pub fn new(label: &'static str) -> Self {
        tracing::info!("starting: {label}");
        Self {
            label,
            start: Instant::now(),
        }
    }

    /// Elapsed time without ending the scope.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimedScope {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        tracing::info!(
            "end: {} took {:.3}ms",
            self.label,
            elapsed.as_secs_f64() * 1000.0
        );
    }
}

/// Run a closure inside a `TimedScope`, returning its result and duration.
pub fn timed<F, R>(label: &'static str, f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let scope = TimedScope::new(label);
    let result = f();
    (result, scope.elapsed())
}
