//! Property-based invariant tests for the validation pipeline.
//!
//! 1. Completeness: every failing field appears in the outcome, and the
//!    outcome is valid exactly when no field fails.
//! 2. Idempotence: validating the same candidate twice yields equal
//!    outcomes.
//! 3. Stale suppression: whatever order responses arrive in, the applied
//!    outcome is the one for the last observed candidate.
//! 4. Teardown: no response is applied after teardown.

use std::sync::Arc;

use proptest::prelude::*;
use settle_validation::{
    MaxLength, MinLength, ObjectSchema, Schema, ValidationOutcome, ValidationPipeline,
};

#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    name: Option<String>,
    code: Option<String>,
}

fn schema() -> Arc<dyn Schema<Candidate>> {
    Arc::new(
        ObjectSchema::<Candidate>::new("candidate")
            .text("name", |c| c.name.as_deref(), |f| {
                f.required("Name is required")
                    .rule(MaxLength::new(8).with_message("Name too long"))
            })
            .text("code", |c| c.code.as_deref(), |f| {
                f.rule(MinLength::new(3).with_message("Code too short"))
            }),
    )
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn candidate_strategy() -> impl Strategy<Value = Candidate> {
    (
        prop::option::of("[a-z ]{0,12}"),
        prop::option::of("[0-9]{0,5}"),
    )
        .prop_map(|(name, code)| Candidate { name, code })
}

fn expected_failures(c: &Candidate) -> Vec<&'static str> {
    let mut fields = Vec::new();
    match c.name.as_deref() {
        None => fields.push("name"),
        Some(n) if n.is_empty() || n.chars().count() > 8 => fields.push("name"),
        Some(_) => {}
    }
    if c.code.as_deref().is_some_and(|code| code.chars().count() < 3) {
        fields.push("code");
    }
    fields
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Completeness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_failing_field_is_reported(candidate in candidate_strategy()) {
        let mut pipeline = ValidationPipeline::new(schema());
        pipeline.validate_now(candidate.clone());
        let outcome = pipeline.outcome();

        let expected = expected_failures(&candidate);
        let reported: Vec<&str> = outcome.errors_by_field().keys().map(String::as_str).collect();
        let mut expected_sorted = expected.clone();
        expected_sorted.sort_unstable();
        prop_assert_eq!(reported, expected_sorted);
        prop_assert_eq!(outcome.is_valid(), expected.is_empty());
        for messages in outcome.errors_by_field().values() {
            prop_assert!(!messages.is_empty());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn same_candidate_same_outcome(candidate in candidate_strategy()) {
        let mut pipeline = ValidationPipeline::new(schema());
        pipeline.validate_now(candidate.clone());
        let first = pipeline.outcome().clone();
        pipeline.validate_now(candidate);
        prop_assert_eq!(&first, pipeline.outcome());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Stale suppression under arbitrary completion order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn last_observed_candidate_wins(
        candidates in prop::collection::vec(candidate_strategy(), 1..12),
        order in any::<prop::sample::Index>(),
        rotate in any::<prop::sample::Index>(),
    ) {
        let mut pipeline = ValidationPipeline::new(schema());
        let requests: Vec<_> = candidates.iter().cloned().map(|c| pipeline.observe(c)).collect();
        let mut responses: Vec<_> = requests.iter().map(|r| pipeline.run(r)).collect();

        // Shuffle deterministically from the sampled indices.
        let len = responses.len();
        responses.swap(order.index(len), len - 1);
        responses.rotate_left(rotate.index(len));

        let mut applied = 0;
        for response in responses {
            if pipeline.complete(response) {
                applied += 1;
            }
        }

        prop_assert_eq!(applied, 1);
        let last = candidates.last().cloned().map(|c| {
            ValidationOutcome::from(schema().validate(&c))
        });
        prop_assert_eq!(Some(pipeline.outcome().clone()), last);
        prop_assert!(pipeline.trace().verify_invariants().is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Teardown
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn nothing_applies_after_teardown(candidates in prop::collection::vec(candidate_strategy(), 0..8)) {
        let mut pipeline = ValidationPipeline::new(schema());
        let requests: Vec<_> = candidates.into_iter().map(|c| pipeline.observe(c)).collect();
        pipeline.teardown();
        for request in &requests {
            let response = pipeline.run(request);
            prop_assert!(!pipeline.complete(response));
        }
        prop_assert!(pipeline.is_valid());
        prop_assert_eq!(pipeline.trace().count("applied"), 0);
    }
}
