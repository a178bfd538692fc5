#![forbid(unsafe_code)]

//! The validation pipeline: candidates in, field-keyed outcomes out.
//!
//! [`ValidationPipeline::observe`] turns a candidate into a
//! [`ValidationRequest`] stamped with a fresh token. Running the request
//! against the schema (on any thread, at any later time) yields a
//! [`ValidationResponse`], which [`ValidationPipeline::complete`] applies
//! only if no newer candidate was observed in the meantime.
//!
//! ```
//! use std::sync::Arc;
//! use settle_validation::pipeline::ValidationPipeline;
//! use settle_validation::schema::ObjectSchema;
//!
//! struct Login {
//!     email: Option<String>,
//! }
//!
//! let schema = ObjectSchema::<Login>::new("login")
//!     .text("email", |c| c.email.as_deref(), |f| f.required("Email is required"));
//! let mut pipeline = ValidationPipeline::new(Arc::new(schema));
//!
//! let first = pipeline.observe(Login { email: None });
//! let second = pipeline.observe(Login { email: Some("a@b.cz".into()) });
//!
//! let late = pipeline.run(&first);
//! let fresh = pipeline.run(&second);
//! assert!(pipeline.complete(fresh));
//! assert!(!pipeline.complete(late));
//! assert!(pipeline.outcome().is_valid());
//! ```
//!
//! # Invariants
//!
//! - Every observed candidate starts a new validation; equal candidates are
//!   not short-circuited.
//! - Only the response for the latest request is applied.
//! - After [`ValidationPipeline::teardown`] nothing is applied.
//! - Before any validation is applied the outcome is valid and empty.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use settle_core::{Clock, Instant, SystemClock};

use crate::async_validation::{Disposition, ValidationCoordinator, ValidationToken, ValidationTrace};
use crate::outcome::ValidationOutcome;
use crate::schema::Schema;

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A candidate waiting to be validated.
#[derive(Debug, Clone)]
pub struct ValidationRequest<T> {
    token: ValidationToken,
    candidate: T,
    issued_at: Instant,
}

impl<T> ValidationRequest<T> {
    /// Token this request was issued with.
    #[must_use]
    pub fn token(&self) -> ValidationToken {
        self.token
    }

    /// The candidate to validate.
    #[must_use]
    pub fn candidate(&self) -> &T {
        &self.candidate
    }

    /// When the request was issued.
    #[must_use]
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Take the candidate back.
    #[must_use]
    pub fn into_candidate(self) -> T {
        self.candidate
    }
}

/// The result of running a request against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResponse {
    token: ValidationToken,
    outcome: ValidationOutcome,
    duration: Duration,
}

impl ValidationResponse {
    /// Token of the request this answers.
    #[must_use]
    pub fn token(&self) -> ValidationToken {
        self.token
    }

    /// The computed outcome.
    #[must_use]
    pub fn outcome(&self) -> &ValidationOutcome {
        &self.outcome
    }

    /// How long the schema took.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs requests against a schema without touching pipeline state.
///
/// Cheap to clone; hand it to whichever thread performs the validation.
pub struct ValidationRunner<T> {
    schema: Arc<dyn Schema<T>>,
    clock: Arc<dyn Clock>,
}

impl<T> Clone for ValidationRunner<T> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T> ValidationRunner<T> {
    /// Validate the request's candidate.
    #[must_use]
    pub fn run(&self, request: &ValidationRequest<T>) -> ValidationResponse {
        let started = self.clock.now();
        let outcome = ValidationOutcome::from(self.schema.validate(&request.candidate));
        let duration = self.clock.now().saturating_duration_since(started);
        ValidationResponse {
            token: request.token,
            outcome,
            duration,
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationPipeline
// ---------------------------------------------------------------------------

/// Re-validates candidates and keeps the latest applicable outcome.
pub struct ValidationPipeline<T> {
    runner: ValidationRunner<T>,
    coordinator: ValidationCoordinator,
    outcome: ValidationOutcome,
}

impl<T> fmt::Debug for ValidationPipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("schema", &self.runner.schema.name())
            .field("coordinator", &self.coordinator)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl<T> ValidationPipeline<T> {
    /// Create a pipeline on the system clock.
    #[must_use]
    pub fn new(schema: Arc<dyn Schema<T>>) -> Self {
        Self::with_clock(schema, Arc::new(SystemClock))
    }

    /// Create a pipeline reading time from `clock`.
    #[must_use]
    pub fn with_clock(schema: Arc<dyn Schema<T>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            coordinator: ValidationCoordinator::with_clock(Arc::clone(&clock)),
            runner: ValidationRunner { schema, clock },
            outcome: ValidationOutcome::valid(),
        }
    }

    /// Name of the schema.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        self.runner.schema.name()
    }

    /// A runner for executing requests elsewhere.
    #[must_use]
    pub fn runner(&self) -> ValidationRunner<T> {
        self.runner.clone()
    }

    /// Start validating `candidate`.
    pub fn observe(&mut self, candidate: T) -> ValidationRequest<T> {
        let token = self.coordinator.start_validation();
        tracing::debug!(schema = self.schema_name(), token = token.raw(), "validation started");
        ValidationRequest {
            token,
            candidate,
            issued_at: self.runner.clock.now(),
        }
    }

    /// Validate the request's candidate. Does not change pipeline state.
    #[must_use]
    pub fn run(&self, request: &ValidationRequest<T>) -> ValidationResponse {
        self.runner.run(request)
    }

    /// Apply `response` if it answers the latest request.
    ///
    /// Returns whether the outcome was replaced.
    pub fn complete(&mut self, response: ValidationResponse) -> bool {
        let is_valid = response.outcome.is_valid();
        match self
            .coordinator
            .complete(response.token, is_valid, response.duration)
        {
            Disposition::Apply => {
                tracing::debug!(
                    schema = self.schema_name(),
                    token = response.token.raw(),
                    valid = is_valid,
                    errors = response.outcome.error_count(),
                    "validation applied"
                );
                self.outcome = response.outcome;
                true
            }
            Disposition::Stale => {
                tracing::trace!(
                    token = response.token.raw(),
                    current = self.coordinator.current_token().raw(),
                    "stale validation discarded"
                );
                false
            }
            Disposition::TornDown => {
                tracing::trace!(
                    token = response.token.raw(),
                    "validation discarded after teardown"
                );
                false
            }
        }
    }

    /// Observe, run and complete in one step.
    pub fn validate_now(&mut self, candidate: T) -> bool {
        let request = self.observe(candidate);
        let response = self.run(&request);
        self.complete(response)
    }

    /// The latest applied outcome.
    #[must_use]
    pub fn outcome(&self) -> &ValidationOutcome {
        &self.outcome
    }

    /// Shorthand for `outcome().is_valid()`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }

    /// Messages for `field` in the latest outcome.
    #[must_use]
    pub fn errors_for(&self, field: &str) -> &[String] {
        self.outcome.errors_for(field)
    }

    /// Token of the latest request.
    #[must_use]
    pub fn current_token(&self) -> ValidationToken {
        self.coordinator.current_token()
    }

    /// Whether the latest request is still unanswered.
    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        self.coordinator.has_in_flight()
    }

    /// Lifecycle trace.
    #[must_use]
    pub fn trace(&self) -> &ValidationTrace {
        self.coordinator.trace()
    }

    /// Keep at most `max_events` trace events (0 = unbounded).
    pub fn set_trace_capacity(&mut self, max_events: usize) {
        self.coordinator.set_trace_capacity(max_events);
    }

    /// Stop applying responses.
    pub fn teardown(&mut self) {
        self.coordinator.teardown();
    }

    /// Whether [`teardown`](Self::teardown) has been called.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.coordinator.is_torn_down()
    }
}

// ---------------------------------------------------------------------------
// Thread-safe wrapper
// ---------------------------------------------------------------------------

/// A [`ValidationPipeline`] shared between threads.
///
/// Every access goes through one mutex, so observe and complete calls from
/// different threads are serialised.
pub struct SharedValidationPipeline<T> {
    inner: Arc<Mutex<ValidationPipeline<T>>>,
}

impl<T> Clone for SharedValidationPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedValidationPipeline<T> {
    /// Wrap a pipeline.
    #[must_use]
    pub fn new(pipeline: ValidationPipeline<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ValidationPipeline<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`ValidationPipeline::observe`].
    pub fn observe(&self, candidate: T) -> ValidationRequest<T> {
        self.lock().observe(candidate)
    }

    /// See [`ValidationPipeline::complete`].
    pub fn complete(&self, response: ValidationResponse) -> bool {
        self.lock().complete(response)
    }

    /// Snapshot of the latest applied outcome.
    #[must_use]
    pub fn outcome(&self) -> ValidationOutcome {
        self.lock().outcome().clone()
    }

    /// Whether the latest applied outcome is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lock().is_valid()
    }

    /// Whether the latest request is still unanswered.
    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        self.lock().has_in_flight()
    }

    /// Snapshot of the trace.
    #[must_use]
    pub fn trace(&self) -> ValidationTrace {
        self.lock().trace().clone()
    }

    /// See [`ValidationPipeline::teardown`].
    pub fn teardown(&self) {
        self.lock().teardown();
    }
}

impl<T: Send + 'static> SharedValidationPipeline<T> {
    /// Validate `candidate` on a background thread.
    ///
    /// The request is issued before this returns, so a later `observe` or
    /// `spawn` always supersedes it. The handle yields whether the result
    /// was applied.
    pub fn spawn(&self, candidate: T) -> JoinHandle<bool> {
        let (request, runner) = {
            let mut pipeline = self.lock();
            (pipeline.observe(candidate), pipeline.runner())
        };
        let shared = self.clone();
        thread::spawn(move || {
            let response = runner.run(&request);
            shared.complete(response)
        })
    }
}
