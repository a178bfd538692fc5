#![forbid(unsafe_code)]

//! Debounced values for rapid user input.
//!
//! A [`Debouncer`] holds the value the rest of the form sees (the
//! *published* value) and at most one *pending* value waiting for its quiet
//! period to elapse. Every push replaces the pending value and restarts its
//! timer, so a burst of keystrokes publishes only its final value.
//!
//! # Usage
//!
//! ```
//! use settle_core::clock::Instant;
//! use settle_core::debounce::Debouncer;
//! use std::time::Duration;
//!
//! let base = Instant::now();
//! let mut search = Debouncer::new(String::new(), Duration::from_millis(150));
//!
//! search.push_at("a".to_string(), base);
//! search.push_at("ab".to_string(), base + Duration::from_millis(40));
//! search.push_at("abc".to_string(), base + Duration::from_millis(80));
//!
//! // Still inside the quiet period of the last push.
//! assert!(search.tick_at(base + Duration::from_millis(200)).is_none());
//! assert_eq!(search.value(), "");
//!
//! // 150ms after "abc": published.
//! assert_eq!(
//!     search.tick_at(base + Duration::from_millis(230)).map(String::as_str),
//!     Some("abc")
//! );
//! ```
//!
//! # Invariants
//!
//! - The initial value is published immediately; only later changes wait.
//! - At most one pending value exists; a push discards the previous one.
//! - A value is published no earlier than `delay` after the push that
//!   created it.
//! - After [`Debouncer::teardown`] nothing is ever published again.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `delay = 0` | Publishes on the next tick |
//! | Tick before deadline | Returns `None`, pending kept |
//! | Push after teardown | Ignored |

use std::fmt;
use std::time::Duration;

use crate::clock::Instant;

#[inline]
fn duration_until_or_zero(deadline: Instant, now: Instant) -> Duration {
    deadline
        .checked_duration_since(now)
        .unwrap_or(Duration::ZERO)
}

/// A value waiting for its quiet period.
#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

/// Statistics for a debouncer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    /// Values pushed.
    pub pushes: u64,
    /// Pending values replaced by a newer push before their deadline.
    pub superseded: u64,
    /// Timers that fired (whether or not the value changed).
    pub fired: u64,
    /// Fired timers that changed the published value.
    pub published: u64,
    /// Pending values dropped by `cancel` or `teardown`.
    pub cancelled: u64,
}

/// Smooths rapid input into a stable, delayed value.
#[derive(Clone)]
pub struct Debouncer<T> {
    published: T,
    pending: Option<Pending<T>>,
    delay: Duration,
    revision: u64,
    torn_down: bool,
    stats: DebounceStats,
}

impl<T: fmt::Debug> fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("published", &self.published)
            .field("pending", &self.pending.as_ref().map(|p| &p.value))
            .field("delay", &self.delay)
            .field("revision", &self.revision)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl<T: Clone + PartialEq> Debouncer<T> {
    /// Create a debouncer whose published value is `initial`.
    #[must_use]
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            published: initial,
            pending: None,
            delay,
            revision: 0,
            torn_down: false,
            stats: DebounceStats::default(),
        }
    }

    /// The published (debounced) value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.published
    }

    /// The most recent input: the pending value if any, else the published one.
    #[must_use]
    pub fn latest(&self) -> &T {
        self.pending
            .as_ref()
            .map_or(&self.published, |pending| &pending.value)
    }

    /// The quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of times the published value has changed.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether a value is waiting to be published.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending value, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Time left before the pending value publishes.
    #[must_use]
    pub fn time_until_publish(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|deadline| duration_until_or_zero(deadline, now))
    }

    /// Whether [`teardown`](Self::teardown) has been called.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Counters for pushes, supersessions and publishes.
    #[must_use]
    pub fn stats(&self) -> DebounceStats {
        self.stats
    }

    /// Push a new input value using the current instant.
    pub fn push(&mut self, value: T) {
        self.push_at(value, Instant::now());
    }

    /// Push a new input value observed at `now`.
    ///
    /// Any pending value is discarded and the timer restarts from zero.
    pub fn push_at(&mut self, value: T, now: Instant) {
        if self.torn_down {
            tracing::trace!("debounce push ignored after teardown");
            return;
        }
        self.stats.pushes += 1;
        if self.pending.is_some() {
            self.stats.superseded += 1;
        }
        self.pending = Some(Pending {
            value,
            deadline: now + self.delay,
        });
    }

    /// Publish the pending value if its quiet period has elapsed, using the
    /// current instant.
    pub fn tick(&mut self) -> Option<&T> {
        self.tick_at(Instant::now())
    }

    /// Publish the pending value if its quiet period has elapsed at `now`.
    ///
    /// Returns the new published value only when it differs from the
    /// previous one.
    pub fn tick_at(&mut self, now: Instant) -> Option<&T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.deadline);
        if !due {
            return None;
        }
        let pending = self.pending.take()?;
        self.stats.fired += 1;
        if pending.value == self.published {
            return None;
        }
        self.published = pending.value;
        self.revision += 1;
        self.stats.published += 1;
        tracing::trace!(revision = self.revision, "debounced value published");
        Some(&self.published)
    }

    /// Change the quiet period using the current instant.
    pub fn set_delay(&mut self, delay: Duration) {
        self.set_delay_at(delay, Instant::now());
    }

    /// Change the quiet period at `now`.
    ///
    /// A pending value has its timer re-armed with the new delay, starting
    /// from `now`.
    pub fn set_delay_at(&mut self, delay: Duration, now: Instant) {
        self.delay = delay;
        if let Some(pending) = self.pending.as_mut() {
            pending.deadline = now + delay;
        }
    }

    /// Drop the pending value without publishing it.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            self.stats.cancelled += 1;
        }
    }

    /// Cancel the pending timer and stop accepting input.
    pub fn teardown(&mut self) {
        self.cancel();
        self.torn_down = true;
    }
}

/// Earliest deadline among a set of optional deadlines.
///
/// Forms use this to decide when their event loop must wake next.
#[must_use]
pub fn earliest_deadline<I>(deadlines: I) -> Option<Instant>
where
    I: IntoIterator<Item = Option<Instant>>,
{
    deadlines.into_iter().flatten().min()
}
