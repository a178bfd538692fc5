#![forbid(unsafe_code)]

//! Time sources for the form event loop.
//!
//! Every time-dependent primitive in this workspace has an `*_at(now)`
//! variant that takes an explicit [`Instant`]. The [`Clock`] trait is the
//! seam used by owners (forms, coordinators) that need to read "now"
//! themselves:
//!
//! - [`SystemClock`] reads the monotonic platform clock.
//! - [`ManualClock`] only moves when told to, which makes debounce and
//!   validation timing reproducible in tests.
//!
//! `Instant` is re-exported from `web_time`, so the same code runs on
//! `wasm32-unknown-unknown` where `std::time::Instant::now` panics.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub use web_time::Instant;

/// A monotonic time source.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// The platform monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that advances only when told to.
///
/// Cloned handles share the same offset, so a test can keep one handle and
/// hand another to the component under test.
#[derive(Clone)]
pub struct ManualClock {
    base: Instant,
    offset_ns: Arc<AtomicU64>,
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock anchored at the current platform instant.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a clock anchored at `base`.
    #[must_use]
    pub fn starting_at(base: Instant) -> Self {
        Self {
            base,
            offset_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The anchor instant (offset zero).
    #[must_use]
    pub fn base(&self) -> Instant {
        self.base
    }

    /// Time elapsed since the anchor.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_ns.load(Ordering::SeqCst))
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_ns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_add(by))
            })
            .ok();
    }

    /// Move the clock forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Set the absolute offset from the anchor. Moving backwards is ignored.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let target = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.offset_ns.fetch_max(target, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_starts_at_base() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), clock.base());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        clock.advance_ms(150);
        clock.advance(Duration::from_millis(50));
        assert_eq!(clock.now(), clock.base() + Duration::from_millis(200));
    }

    #[test]
    fn manual_clock_handles_are_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        other.advance_ms(1000);
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn set_elapsed_never_goes_backwards() {
        let clock = ManualClock::new();
        clock.set_elapsed(Duration::from_millis(500));
        clock.set_elapsed(Duration::from_millis(100));
        assert_eq!(clock.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn arc_clock_delegates() {
        let manual = Arc::new(ManualClock::new());
        let shared: Arc<dyn Clock> = manual.clone();
        manual.advance_ms(10);
        assert_eq!(shared.now(), manual.base() + Duration::from_millis(10));
    }
}
