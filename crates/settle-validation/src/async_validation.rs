#![forbid(unsafe_code)]

//! Token-based staleness prevention for asynchronous validation.
//!
//! The [`ValidationCoordinator`] issues a monotonically increasing
//! [`ValidationToken`] for every validation it starts and decides, when a
//! result comes back, whether it may be applied. Only the result for the
//! most recently issued token is applied; anything older is stale. After
//! [`ValidationCoordinator::teardown`] nothing is applied at all.
//!
//! Every lifecycle step is recorded in a [`ValidationTrace`] that can be
//! checked for invariant violations and checksummed for golden comparison.
//!
//! # Invariants
//!
//! - Tokens are strictly monotonic; token 0 is never issued.
//! - A result is applied only if its token equals the current token.
//! - No result is applied after teardown.
//!
//! # Failure Modes
//!
//! | Condition | Disposition | Trace event |
//! |-----------|-------------|-------------|
//! | Token older than current | [`Disposition::Stale`] | `StaleDiscarded` |
//! | Coordinator torn down | [`Disposition::TornDown`] | `DiscardedAfterTeardown` |

use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use settle_core::{Clock, Instant, SystemClock};

// ---------------------------------------------------------------------------
// ValidationToken
// ---------------------------------------------------------------------------

/// A monotonically increasing token identifying one validation request.
///
/// # Invariants
///
/// - Tokens are strictly monotonic: `token_n < token_{n+1}`
/// - Token 0 is reserved for "no validation"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ValidationToken(u64);

impl ValidationToken {
    /// The null token representing no validation.
    pub const NONE: Self = Self(0);

    /// Create a token from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw token value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Check if this is the null token.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ValidationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ValidationEvent
// ---------------------------------------------------------------------------

/// An event in the validation lifecycle.
///
/// `elapsed_ns` is measured from coordinator creation on the coordinator's
/// clock, so traces recorded against a manual clock are reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationEvent {
    /// Validation started for a token.
    Started {
        token: ValidationToken,
        elapsed_ns: u64,
    },

    /// An in-flight validation was superseded by newer input, or dropped at
    /// teardown (`superseded_by` is [`ValidationToken::NONE`]).
    Cancelled {
        token: ValidationToken,
        superseded_by: ValidationToken,
        elapsed_ns: u64,
    },

    /// A result came back (it may or may not be applied).
    Completed {
        token: ValidationToken,
        is_valid: bool,
        duration_ns: u64,
        elapsed_ns: u64,
    },

    /// The result was applied to the current state.
    Applied {
        token: ValidationToken,
        is_valid: bool,
        elapsed_ns: u64,
    },

    /// The result was dropped because a newer token exists.
    StaleDiscarded {
        token: ValidationToken,
        current_token: ValidationToken,
        elapsed_ns: u64,
    },

    /// The result arrived after teardown and was dropped.
    DiscardedAfterTeardown {
        token: ValidationToken,
        elapsed_ns: u64,
    },
}

impl ValidationEvent {
    /// Get the token associated with this event.
    #[must_use]
    pub fn token(&self) -> ValidationToken {
        match self {
            Self::Started { token, .. }
            | Self::Cancelled { token, .. }
            | Self::Completed { token, .. }
            | Self::Applied { token, .. }
            | Self::StaleDiscarded { token, .. }
            | Self::DiscardedAfterTeardown { token, .. } => *token,
        }
    }

    /// Get the event type name for logging.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Cancelled { .. } => "cancelled",
            Self::Completed { .. } => "completed",
            Self::Applied { .. } => "applied",
            Self::StaleDiscarded { .. } => "stale_discarded",
            Self::DiscardedAfterTeardown { .. } => "discarded_after_teardown",
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationTrace
// ---------------------------------------------------------------------------

/// Default number of events a trace keeps.
pub const DEFAULT_MAX_TRACE_EVENTS: usize = 1024;

/// Ordered record of the most recent validation events.
///
/// Once `max_events` is reached the oldest event is dropped for every new
/// one. A limit of 0 keeps everything.
#[derive(Debug, Clone)]
pub struct ValidationTrace {
    events: VecDeque<ValidationEvent>,
    max_events: usize,
    dropped: u64,
}

impl Default for ValidationTrace {
    fn default() -> Self {
        Self::with_max_events(DEFAULT_MAX_TRACE_EVENTS)
    }
}

impl ValidationTrace {
    /// Create a new empty trace keeping [`DEFAULT_MAX_TRACE_EVENTS`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty trace keeping at most `max_events` (0 = unbounded).
    #[must_use]
    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_events,
            dropped: 0,
        }
    }

    /// Add an event to the trace, dropping the oldest if full.
    pub fn push(&mut self, event: ValidationEvent) {
        if self.max_events > 0 && self.events.len() >= self.max_events {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    /// Retained events, oldest first.
    #[must_use]
    pub fn events(&self) -> &VecDeque<ValidationEvent> {
        &self.events
    }

    /// Retention limit (0 = unbounded).
    #[must_use]
    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// Change the retention limit, dropping the oldest events if needed.
    pub fn set_max_events(&mut self, max_events: usize) {
        self.max_events = max_events;
        while max_events > 0 && self.events.len() > max_events {
            self.events.pop_front();
            self.dropped += 1;
        }
    }

    /// Number of events dropped to stay within the limit.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Check if the trace contains a specific event type for a token.
    #[must_use]
    pub fn contains_event_type(&self, token: ValidationToken, event_type: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.token() == token && e.event_type() == event_type)
    }

    /// Get all events for a specific token.
    #[must_use]
    pub fn events_for_token(&self, token: ValidationToken) -> Vec<&ValidationEvent> {
        self.events.iter().filter(|e| e.token() == token).collect()
    }

    /// Number of events of `event_type`.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    /// Checksum over every event and its position.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for event in &self.events {
            event.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Get the number of events in the trace.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the trace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events from the trace.
    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    /// Verify trace invariants.
    ///
    /// Returns a list of violations if any invariants are broken. When older
    /// events were dropped, applies are only checked once a start is seen.
    #[must_use]
    pub fn verify_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut latest_started = (self.dropped == 0).then_some(ValidationToken::NONE);
        let mut discarded_after_teardown = false;

        for event in &self.events {
            match event {
                ValidationEvent::Started { token, .. } => {
                    if let Some(latest) = latest_started.filter(|latest| token <= latest) {
                        violations.push(format!(
                            "Non-monotonic start token: {token} after {latest}"
                        ));
                    }
                    latest_started = Some(*token);
                }
                ValidationEvent::Applied { token, .. } => {
                    if let Some(latest) = latest_started.filter(|latest| token != latest) {
                        violations.push(format!("Applied {token} while {latest} is current"));
                    }
                    if discarded_after_teardown {
                        violations.push(format!("Applied {token} after teardown"));
                    }
                }
                ValidationEvent::StaleDiscarded {
                    token,
                    current_token,
                    ..
                } if token >= current_token => {
                    violations.push(format!(
                        "StaleDiscarded with non-stale token: {token} >= {current_token}"
                    ));
                }
                ValidationEvent::DiscardedAfterTeardown { .. } => {
                    discarded_after_teardown = true;
                }
                _ => {}
            }
        }

        violations
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// What to do with a completed validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The result belongs to the current token: apply it.
    Apply,
    /// A newer validation was started: drop it.
    Stale,
    /// The coordinator was torn down: drop it.
    TornDown,
}

impl Disposition {
    /// Whether the result should be applied.
    #[must_use]
    pub fn is_apply(self) -> bool {
        matches!(self, Self::Apply)
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    token: ValidationToken,
    started_at: Instant,
}

/// Issues tokens and judges completed results.
pub struct ValidationCoordinator {
    next_token: u64,
    current_token: ValidationToken,
    in_flight: VecDeque<InFlight>,
    trace: ValidationTrace,
    clock: Arc<dyn Clock>,
    created_at: Instant,
    torn_down: bool,
}

impl std::fmt::Debug for ValidationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationCoordinator")
            .field("current_token", &self.current_token)
            .field("in_flight_count", &self.in_flight.len())
            .field("trace_events", &self.trace.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl Default for ValidationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationCoordinator {
    /// Create a coordinator on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a coordinator reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let created_at = clock.now();
        Self {
            next_token: 1,
            current_token: ValidationToken::NONE,
            in_flight: VecDeque::new(),
            trace: ValidationTrace::new(),
            clock,
            created_at,
            torn_down: false,
        }
    }

    fn elapsed_ns(&self) -> u64 {
        duration_ns(self.clock.now().saturating_duration_since(self.created_at))
    }

    /// Start a new validation and return its token.
    ///
    /// Every in-flight validation is marked cancelled; its result will be
    /// judged stale when it arrives.
    pub fn start_validation(&mut self) -> ValidationToken {
        let token = ValidationToken(self.next_token);
        self.next_token += 1;
        let now = self.clock.now();
        let elapsed = self.elapsed_ns();

        for superseded in self.in_flight.drain(..) {
            self.trace.push(ValidationEvent::Cancelled {
                token: superseded.token,
                superseded_by: token,
                elapsed_ns: elapsed,
            });
        }

        self.in_flight.push_back(InFlight {
            token,
            started_at: now,
        });
        self.current_token = token;
        self.trace.push(ValidationEvent::Started {
            token,
            elapsed_ns: elapsed,
        });
        token
    }

    /// Record a completed result and decide whether it may be applied.
    ///
    /// `duration` is how long the validation itself took; it is recorded in
    /// the trace only.
    pub fn complete(
        &mut self,
        token: ValidationToken,
        is_valid: bool,
        duration: Duration,
    ) -> Disposition {
        let elapsed = self.elapsed_ns();
        self.trace.push(ValidationEvent::Completed {
            token,
            is_valid,
            duration_ns: duration_ns(duration),
            elapsed_ns: elapsed,
        });
        self.in_flight.retain(|v| v.token != token);

        if self.torn_down {
            self.trace.push(ValidationEvent::DiscardedAfterTeardown {
                token,
                elapsed_ns: elapsed,
            });
            return Disposition::TornDown;
        }

        if token != self.current_token {
            self.trace.push(ValidationEvent::StaleDiscarded {
                token,
                current_token: self.current_token,
                elapsed_ns: elapsed,
            });
            return Disposition::Stale;
        }

        self.trace.push(ValidationEvent::Applied {
            token,
            is_valid,
            elapsed_ns: elapsed,
        });
        Disposition::Apply
    }

    /// Drop every in-flight validation and refuse all future results.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let elapsed = self.elapsed_ns();
        for dropped in self.in_flight.drain(..) {
            self.trace.push(ValidationEvent::Cancelled {
                token: dropped.token,
                superseded_by: ValidationToken::NONE,
                elapsed_ns: elapsed,
            });
        }
        self.torn_down = true;
    }

    /// Whether [`teardown`](Self::teardown) has been called.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Get the current token.
    #[must_use]
    pub fn current_token(&self) -> ValidationToken {
        self.current_token
    }

    /// When the current validation started, if it is still in flight.
    #[must_use]
    pub fn current_started_at(&self) -> Option<Instant> {
        self.in_flight
            .iter()
            .find(|v| v.token == self.current_token)
            .map(|v| v.started_at)
    }

    /// The coordinator's clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Get the event trace.
    #[must_use]
    pub fn trace(&self) -> &ValidationTrace {
        &self.trace
    }

    /// Clear the trace.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Keep at most `max_events` trace events (0 = unbounded).
    pub fn set_trace_capacity(&mut self, max_events: usize) {
        self.trace.set_max_events(max_events);
    }

    /// Get the number of in-flight validations that may still be applied.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Check if there are any in-flight validations.
    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Verify that the trace satisfies all invariants.
    pub fn verify_trace(&self) -> Result<(), Vec<String>> {
        let violations = self.trace.verify_invariants();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn duration_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use settle_core::ManualClock;

    fn coordinator() -> (ValidationCoordinator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (ValidationCoordinator::with_clock(clock.clone()), clock)
    }

    #[test]
    fn token_none_is_zero() {
        assert_eq!(ValidationToken::NONE.raw(), 0);
        assert!(ValidationToken::NONE.is_none());
        assert!(!ValidationToken::from_raw(42).is_none());
        assert_eq!(format!("{}", ValidationToken::from_raw(123)), "Token(123)");
    }

    #[test]
    fn tokens_are_monotonic() {
        let (mut coordinator, clock) = coordinator();
        let mut tokens = Vec::new();
        for _ in 0..10 {
            clock.advance_ms(1);
            tokens.push(coordinator.start_validation());
        }
        assert!(tokens.windows(2).all(|w| w[0] < w[1]));
        assert!(coordinator.verify_trace().is_ok());
    }

    #[test]
    fn stale_result_ignored() {
        let (mut coordinator, clock) = coordinator();
        clock.advance_ms(1);
        let token1 = coordinator.start_validation();
        clock.advance_ms(1);
        let token2 = coordinator.start_validation();

        clock.advance_ms(1);
        let first = coordinator.complete(token1, false, Duration::from_millis(100));
        clock.advance_ms(1);
        let second = coordinator.complete(token2, true, Duration::from_millis(50));

        assert_eq!(first, Disposition::Stale);
        assert_eq!(second, Disposition::Apply);
        let trace = coordinator.trace();
        assert!(trace.contains_event_type(token1, "cancelled"));
        assert!(trace.contains_event_type(token1, "stale_discarded"));
        assert!(trace.contains_event_type(token2, "applied"));
        assert!(coordinator.verify_trace().is_ok());
    }

    #[test]
    fn stale_result_ignored_when_newer_completes_first() {
        let (mut coordinator, _clock) = coordinator();
        let token1 = coordinator.start_validation();
        let token2 = coordinator.start_validation();

        assert!(coordinator.complete(token2, true, Duration::ZERO).is_apply());
        assert_eq!(
            coordinator.complete(token1, false, Duration::ZERO),
            Disposition::Stale
        );
        assert_eq!(coordinator.trace().count("applied"), 1);
    }

    #[test]
    fn trace_contains_all_events() {
        let (mut coordinator, clock) = coordinator();
        let token = coordinator.start_validation();
        clock.advance_ms(5);
        coordinator.complete(token, true, Duration::from_millis(5));

        let trace = coordinator.trace();
        assert!(trace.contains_event_type(token, "started"));
        assert!(trace.contains_event_type(token, "completed"));
        assert!(trace.contains_event_type(token, "applied"));
        assert_eq!(trace.events_for_token(token).len(), 3);
        assert_eq!(
            trace.events()[2],
            ValidationEvent::Applied {
                token,
                is_valid: true,
                elapsed_ns: 5_000_000,
            }
        );
    }

    #[test]
    fn teardown_discards_results() {
        let (mut coordinator, _clock) = coordinator();
        let token = coordinator.start_validation();
        coordinator.teardown();
        assert!(coordinator.is_torn_down());
        assert!(!coordinator.has_in_flight());

        assert_eq!(
            coordinator.complete(token, true, Duration::ZERO),
            Disposition::TornDown
        );
        let trace = coordinator.trace();
        assert!(trace.contains_event_type(token, "discarded_after_teardown"));
        assert_eq!(trace.count("applied"), 0);
        assert!(coordinator.verify_trace().is_ok());
    }

    #[test]
    fn apply_clears_in_flight() {
        let (mut coordinator, _clock) = coordinator();
        let token = coordinator.start_validation();
        assert_eq!(coordinator.in_flight_count(), 1);
        assert!(coordinator.current_started_at().is_some());
        coordinator.complete(token, true, Duration::ZERO);
        assert_eq!(coordinator.in_flight_count(), 0);
        assert!(coordinator.current_started_at().is_none());
    }

    #[test]
    fn initial_state() {
        let coordinator = ValidationCoordinator::new();
        assert_eq!(coordinator.current_token(), ValidationToken::NONE);
        assert!(!coordinator.has_in_flight());
        assert!(coordinator.trace().is_empty());
    }

    #[test]
    fn checksum_is_deterministic() {
        let run = || {
            let (mut coordinator, clock) = coordinator();
            for i in 0..5 {
                clock.advance_ms(10);
                let token = coordinator.start_validation();
                clock.advance_ms(3);
                coordinator.complete(token, i % 2 == 0, Duration::from_millis(3));
            }
            coordinator.trace().checksum()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn checksum_differs_on_different_operations() {
        let (mut coordinator, _clock) = coordinator();
        let t1 = coordinator.start_validation();
        coordinator.complete(t1, true, Duration::ZERO);
        let before = coordinator.trace().checksum();

        let t2 = coordinator.start_validation();
        coordinator.complete(t2, false, Duration::ZERO);
        assert_ne!(before, coordinator.trace().checksum());
    }

    #[test]
    fn verify_flags_applied_stale_token() {
        let mut trace = ValidationTrace::new();
        let t1 = ValidationToken::from_raw(1);
        let t2 = ValidationToken::from_raw(2);
        trace.push(ValidationEvent::Started { token: t1, elapsed_ns: 0 });
        trace.push(ValidationEvent::Started { token: t2, elapsed_ns: 1 });
        trace.push(ValidationEvent::Applied {
            token: t1,
            is_valid: true,
            elapsed_ns: 2,
        });
        assert_eq!(trace.verify_invariants().len(), 1);
    }

    #[test]
    fn verify_flags_non_monotonic_start() {
        let mut trace = ValidationTrace::new();
        trace.push(ValidationEvent::Started {
            token: ValidationToken::from_raw(2),
            elapsed_ns: 0,
        });
        trace.push(ValidationEvent::Started {
            token: ValidationToken::from_raw(2),
            elapsed_ns: 1,
        });
        assert!(!trace.verify_invariants().is_empty());
    }

    #[test]
    fn trace_stays_bounded_over_many_cycles() {
        let (mut coordinator, _clock) = coordinator();
        for _ in 0..10_000 {
            let token = coordinator.start_validation();
            coordinator.complete(token, true, Duration::ZERO);
        }
        let trace = coordinator.trace();
        assert_eq!(trace.len(), DEFAULT_MAX_TRACE_EVENTS);
        assert_eq!(trace.dropped(), 30_000 - DEFAULT_MAX_TRACE_EVENTS as u64);
        assert!(trace.verify_invariants().is_empty());
    }

    #[test]
    fn trace_drops_oldest_first() {
        let mut trace = ValidationTrace::with_max_events(2);
        for raw in 1..=3 {
            trace.push(ValidationEvent::Started {
                token: ValidationToken::from_raw(raw),
                elapsed_ns: raw,
            });
        }
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.dropped(), 1);
        assert_eq!(trace.events()[0].token(), ValidationToken::from_raw(2));
    }

    #[test]
    fn shrinking_capacity_truncates() {
        let (mut coordinator, _clock) = coordinator();
        for _ in 0..5 {
            coordinator.start_validation();
        }
        coordinator.set_trace_capacity(3);
        assert_eq!(coordinator.trace().len(), 3);
        assert_eq!(coordinator.trace().max_events(), 3);
        assert!(coordinator.verify_trace().is_ok());
    }

    #[test]
    fn zero_capacity_keeps_everything() {
        let mut trace = ValidationTrace::with_max_events(0);
        for raw in 1..=2000 {
            trace.push(ValidationEvent::Started {
                token: ValidationToken::from_raw(raw),
                elapsed_ns: raw,
            });
        }
        assert_eq!(trace.len(), 2000);
        assert_eq!(trace.dropped(), 0);
    }

    #[test]
    fn truncated_window_starting_mid_cycle_verifies() {
        let mut trace = ValidationTrace::with_max_events(2);
        let t1 = ValidationToken::from_raw(1);
        trace.push(ValidationEvent::Started { token: t1, elapsed_ns: 0 });
        trace.push(ValidationEvent::Completed {
            token: t1,
            is_valid: true,
            duration_ns: 0,
            elapsed_ns: 1,
        });
        trace.push(ValidationEvent::Applied {
            token: t1,
            is_valid: true,
            elapsed_ns: 2,
        });
        assert!(trace.verify_invariants().is_empty());
    }
}
