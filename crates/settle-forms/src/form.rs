#![forbid(unsafe_code)]

//! Shared machinery of every form: queued validation and submit gating.
//!
//! A form rebuilds its candidate whenever a debounced field publishes and
//! hands it to [`FormValidation::request`]. Requests wait in a FIFO queue
//! until [`FormValidation::poll_validations`] runs them (the asynchronous
//! completion step), or until an external executor takes them with
//! [`FormValidation::take_pending`] and returns the responses through
//! [`FormValidation::complete`].
//!
//! # Invariants
//!
//! - A form may submit only when its latest outcome is valid, no validation
//!   is in flight, and it has not been torn down.
//! - Responses for superseded candidates never replace the outcome.
//! - After teardown the queue is empty and stays empty.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use settle_core::{Clock, Instant};
use settle_validation::{
    Schema, ValidationOutcome, ValidationPipeline, ValidationRequest, ValidationResponse,
    ValidationRunner, ValidationTrace,
};

use crate::services::ServiceError;

// ─────────────────────────────────────────────────────────────────────────────
// Submission
// ─────────────────────────────────────────────────────────────────────────────

/// Why a submit did not reach the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The latest outcome has errors.
    Invalid,
    /// A validation has not come back yet.
    Validating,
    /// The form was torn down.
    TornDown,
}

/// Result of a submit attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<T> {
    /// The collaborator accepted the form.
    Submitted(T),
    /// The gate refused; no collaborator was called.
    Blocked(BlockReason),
}

impl<T> Submission<T> {
    /// Whether the collaborator was called and succeeded.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }

    /// The accepted value, if any.
    #[must_use]
    pub fn submitted(self) -> Option<T> {
        match self {
            Self::Submitted(value) => Some(value),
            Self::Blocked(_) => None,
        }
    }
}

/// A submit that reached the collaborator and failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The collaborator returned an error.
    Service(ServiceError),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(e) => write!(f, "submit failed: {e}"),
        }
    }
}

impl std::error::Error for FormError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Service(e) => Some(e),
        }
    }
}

impl From<ServiceError> for FormError {
    fn from(e: ServiceError) -> Self {
        Self::Service(e)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FormValidation
// ─────────────────────────────────────────────────────────────────────────────

/// A validation pipeline plus the queue of requests not yet run.
pub struct FormValidation<C> {
    pipeline: ValidationPipeline<C>,
    queue: VecDeque<ValidationRequest<C>>,
}

impl<C> fmt::Debug for FormValidation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValidation")
            .field("pipeline", &self.pipeline)
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl<C> FormValidation<C> {
    /// Validation for `schema`, timed by `clock`.
    #[must_use]
    pub fn new(schema: Arc<dyn Schema<C>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            pipeline: ValidationPipeline::with_clock(schema, clock),
            queue: VecDeque::new(),
        }
    }

    /// Queue a validation of `candidate`. Ignored after teardown.
    pub fn request(&mut self, candidate: C) {
        if self.pipeline.is_torn_down() {
            return;
        }
        let request = self.pipeline.observe(candidate);
        self.queue.push_back(request);
    }

    /// Run every queued request in order. Returns how many were applied.
    pub fn poll_validations(&mut self) -> usize {
        let mut applied = 0;
        while let Some(request) = self.queue.pop_front() {
            let response = self.pipeline.run(&request);
            if self.pipeline.complete(response) {
                applied += 1;
            }
        }
        applied
    }

    /// Hand every queued request to the caller.
    pub fn take_pending(&mut self) -> Vec<ValidationRequest<C>> {
        self.queue.drain(..).collect()
    }

    /// A runner for requests taken with [`take_pending`](Self::take_pending).
    #[must_use]
    pub fn runner(&self) -> ValidationRunner<C> {
        self.pipeline.runner()
    }

    /// Apply a response produced outside the form.
    pub fn complete(&mut self, response: ValidationResponse) -> bool {
        self.pipeline.complete(response)
    }

    /// Number of requests waiting to run.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// The latest applied outcome.
    #[must_use]
    pub fn outcome(&self) -> &ValidationOutcome {
        self.pipeline.outcome()
    }

    /// Messages for `field` in the latest outcome.
    #[must_use]
    pub fn errors_for(&self, field: &str) -> &[String] {
        self.pipeline.errors_for(field)
    }

    /// Whether the latest request is still unanswered.
    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        self.pipeline.has_in_flight()
    }

    /// Lifecycle trace of the underlying pipeline.
    #[must_use]
    pub fn trace(&self) -> &ValidationTrace {
        self.pipeline.trace()
    }

    /// Why a submit would be refused right now, if it would.
    #[must_use]
    pub fn block_reason(&self) -> Option<BlockReason> {
        if self.pipeline.is_torn_down() {
            Some(BlockReason::TornDown)
        } else if self.pipeline.has_in_flight() {
            Some(BlockReason::Validating)
        } else if !self.pipeline.is_valid() {
            Some(BlockReason::Invalid)
        } else {
            None
        }
    }

    /// Whether a submit would reach the collaborator.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.block_reason().is_none()
    }

    /// Drop queued requests and refuse every future response.
    pub fn teardown(&mut self) {
        self.queue.clear();
        self.pipeline.teardown();
    }

    /// Whether [`teardown`](Self::teardown) has been called.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.pipeline.is_torn_down()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Form trait
// ─────────────────────────────────────────────────────────────────────────────

/// Behaviour common to every debounced form.
pub trait Form {
    /// The object the schema validates.
    type Candidate;

    /// The form's validation state.
    fn validation(&self) -> &FormValidation<Self::Candidate>;

    /// Mutable access to the validation state.
    fn validation_mut(&mut self) -> &mut FormValidation<Self::Candidate>;

    /// The clock the form reads when no instant is given.
    fn clock(&self) -> &Arc<dyn Clock>;

    /// Fire due debouncers at `now`; queue a validation if a value changed.
    ///
    /// Returns whether a validation was queued.
    fn tick_at(&mut self, now: Instant) -> bool;

    /// Earliest instant a debouncer is due to publish.
    fn next_deadline(&self) -> Option<Instant>;

    /// Cancel every debouncer and discard in-flight validations.
    fn teardown(&mut self);

    /// [`tick_at`](Self::tick_at) on the form's clock.
    fn tick(&mut self) -> bool {
        let now = self.clock().now();
        self.tick_at(now)
    }

    /// Run queued validations.
    fn poll_validations(&mut self) -> usize {
        self.validation_mut().poll_validations()
    }

    /// The latest applied outcome.
    fn outcome(&self) -> &ValidationOutcome {
        self.validation().outcome()
    }

    /// Whether a submit would reach the collaborator.
    fn can_submit(&self) -> bool {
        self.validation().can_submit()
    }

    /// Whether the form was torn down.
    fn is_torn_down(&self) -> bool {
        self.validation().is_torn_down()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settle_core::ManualClock;
    use settle_validation::ObjectSchema;

    #[derive(Debug, Clone)]
    struct Note {
        text: Option<String>,
    }

    fn validation() -> FormValidation<Note> {
        let schema = ObjectSchema::<Note>::new("note")
            .text("text", |n| n.text.as_deref(), |f| f.required("Text is required"));
        FormValidation::new(Arc::new(schema), Arc::new(ManualClock::new()))
    }

    fn note(text: Option<&str>) -> Note {
        Note {
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn queued_request_blocks_submit_until_polled() {
        let mut v = validation();
        assert!(v.can_submit());
        v.request(note(Some("hi")));
        assert_eq!(v.block_reason(), Some(BlockReason::Validating));
        assert_eq!(v.poll_validations(), 1);
        assert!(v.can_submit());
    }

    #[test]
    fn invalid_outcome_blocks_submit() {
        let mut v = validation();
        v.request(note(None));
        v.poll_validations();
        assert_eq!(v.block_reason(), Some(BlockReason::Invalid));
        assert_eq!(v.errors_for("text"), ["Text is required"]);
    }

    #[test]
    fn fifo_poll_applies_only_latest() {
        let mut v = validation();
        v.request(note(None));
        v.request(note(Some("a")));
        v.request(note(Some("ab")));
        assert_eq!(v.queued(), 3);
        assert_eq!(v.poll_validations(), 1);
        assert!(v.outcome().is_valid());
        assert_eq!(v.trace().count("stale_discarded"), 2);
    }

    #[test]
    fn external_executor_out_of_order() {
        let mut v = validation();
        v.request(note(None));
        v.request(note(Some("ok")));
        let runner = v.runner();
        let mut pending = v.take_pending();
        assert_eq!(v.queued(), 0);

        let newer = runner.run(&pending.remove(1));
        let older = runner.run(&pending.remove(0));
        assert!(v.complete(newer));
        assert!(!v.complete(older));
        assert!(v.can_submit());
    }

    #[test]
    fn teardown_clears_queue_and_blocks() {
        let mut v = validation();
        v.request(note(Some("x")));
        v.teardown();
        assert_eq!(v.queued(), 0);
        assert_eq!(v.poll_validations(), 0);
        v.request(note(None));
        assert_eq!(v.queued(), 0);
        assert_eq!(v.block_reason(), Some(BlockReason::TornDown));
        assert!(v.is_torn_down());
    }

    #[test]
    fn submission_helpers() {
        assert!(Submission::Submitted(3).is_submitted());
        assert_eq!(Submission::Submitted(3).submitted(), Some(3));
        assert_eq!(Submission::<u8>::Blocked(BlockReason::Invalid).submitted(), None);
        let err = FormError::from(ServiceError::Unauthorized);
        assert_eq!(err.to_string(), "submit failed: unauthorized");
    }
}
