#![forbid(unsafe_code)]

//! Schema validation with stale-result suppression.
//!
//! - [`validators`]: single-value rules (`Required`, `MinLength`, ...).
//! - [`schema`]: typed object schemas that collect every violation.
//! - [`outcome`]: the field-keyed result the rendering layer reads.
//! - [`async_validation`]: tokens, lifecycle trace and staleness decisions.
//! - [`pipeline`]: candidates in, latest applicable outcome out.

pub mod async_validation;
pub mod outcome;
pub mod pipeline;
pub mod schema;
pub mod validators;

pub use async_validation::{
    DEFAULT_MAX_TRACE_EVENTS, Disposition, ValidationCoordinator, ValidationEvent,
    ValidationToken, ValidationTrace,
};
pub use outcome::ValidationOutcome;
pub use pipeline::{
    SharedValidationPipeline, ValidationPipeline, ValidationRequest, ValidationResponse,
    ValidationRunner,
};
pub use schema::{DateField, FieldViolation, ObjectSchema, Schema, TextField, ValidationFailure};
pub use validators::{
    Charset, Email, MaxLength, MinLength, Required, ValidationError, ValidationResult, Validator,
};
