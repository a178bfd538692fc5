//! Property-based tests for debounced form input.
//!
//! 1. Coalescing: a burst of keystrokes closer together than the quiet
//!    period starts exactly one validation, for the last text typed.
//! 2. Gating: `can_submit` holds exactly when the displayed outcome is
//!    valid and nothing is queued.

use std::sync::Arc;

use proptest::prelude::*;
use settle_core::ManualClock;
use settle_forms::{Form, FormConfig, LoginForm};

// ── Helpers ─────────────────────────────────────────────────────────────

fn burst_strategy() -> impl Strategy<Value = Vec<(String, u64)>> {
    prop::collection::vec(("[a-z@.]{0,10}", 0u64..999), 1..12)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Coalescing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn burst_starts_one_validation(burst in burst_strategy()) {
        let clock = Arc::new(ManualClock::new());
        let mut form = LoginForm::mount(&FormConfig::default(), clock.clone());
        form.poll_validations();
        let started = form.validation().trace().count("started");

        for (text, gap) in &burst {
            form.set_email(text.as_str());
            clock.advance_ms(*gap);
            prop_assert!(!form.tick());
        }
        clock.advance_ms(1000);
        form.tick();
        form.poll_validations();

        let last = burst.last().map(|(text, _)| text.as_str());
        prop_assert_eq!(form.email(), last);
        prop_assert_eq!(form.validation().trace().count("started"), started + 1);
        prop_assert!(form.validation().trace().verify_invariants().is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Gating
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn can_submit_matches_outcome(
        email in "[a-z]{1,6}(@[a-z]{1,6}\\.cz)?",
        password in "[a-zA-Z0-9]{0,9}",
        poll in any::<bool>(),
    ) {
        let clock = Arc::new(ManualClock::new());
        let mut form = LoginForm::mount(&FormConfig::default(), clock.clone());
        form.set_email(email);
        form.set_password(password);
        clock.advance_ms(1000);
        prop_assert!(form.tick());
        if poll {
            form.poll_validations();
        }

        let queued = form.validation().queued() > 0;
        prop_assert_eq!(queued, !poll);
        prop_assert_eq!(form.can_submit(), !queued && form.outcome().is_valid());
    }
}
