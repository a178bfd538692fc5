//! Property-based invariant tests for the debouncer.
//!
//! 1. A burst of pushes spaced closer than the delay publishes only its last
//!    value.
//! 2. That value is not published before `delay` has elapsed since the last
//!    push.
//! 3. The initial value is observable before any delay elapses.
//! 4. Nothing is published after teardown.

use std::time::Duration;

use proptest::prelude::*;
use settle_core::{Debouncer, Instant};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Gaps strictly below the delay, so each push lands inside the previous
/// quiet period.
fn burst_strategy() -> impl Strategy<Value = (u64, Vec<(u64, u32)>)> {
    (20u64..=2000).prop_flat_map(|delay| {
        (
            Just(delay),
            prop::collection::vec((0..delay, any::<u32>()), 1..24),
        )
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Only the last value of a burst is published, after the quiet period
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn burst_publishes_only_last_value((delay_ms, pushes) in burst_strategy(), initial in any::<u32>()) {
        let delay = Duration::from_millis(delay_ms);
        let base = Instant::now();
        let mut d = Debouncer::new(initial, delay);

        let mut now = base;
        let mut observed = Vec::new();
        for (gap, value) in &pushes {
            now += Duration::from_millis(*gap);
            if let Some(v) = d.tick_at(now) {
                observed.push(*v);
            }
            d.push_at(*value, now);
        }
        let last_push = now;
        let last_value = pushes.last().map(|(_, v)| *v).unwrap_or(initial);

        // Just before the quiet period ends nothing new is visible.
        let early = last_push + delay - Duration::from_millis(1);
        prop_assert!(d.tick_at(early).is_none());
        prop_assert_eq!(*d.value(), initial);

        if let Some(v) = d.tick_at(last_push + delay) {
            observed.push(*v);
        }
        prop_assert!(observed.is_empty() || observed == vec![last_value]);
        prop_assert_eq!(*d.value(), last_value);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Immediacy of the initial value
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn initial_value_visible_without_waiting(initial in any::<i64>(), delay_ms in 0u64..10_000) {
        let d = Debouncer::new(initial, Duration::from_millis(delay_ms));
        prop_assert_eq!(*d.value(), initial);
        prop_assert!(!d.has_pending());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Teardown silences the debouncer
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn teardown_blocks_publish(values in prop::collection::vec(any::<u16>(), 0..10), wait_ms in 0u64..5000) {
        let base = Instant::now();
        let mut d = Debouncer::new(0u16, Duration::from_millis(100));
        for (i, v) in values.iter().enumerate() {
            d.push_at(*v, base + Duration::from_millis(i as u64 * 10));
        }
        d.teardown();
        for v in &values {
            d.push_at(*v, base);
        }
        prop_assert!(d.tick_at(base + Duration::from_millis(wait_ms + 1000)).is_none());
        prop_assert_eq!(*d.value(), 0);
    }
}
