#![forbid(unsafe_code)]

//! Core validation types and built-in validators.

use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Error Codes (for i18n lookup)
// ---------------------------------------------------------------------------

/// Error code for required field validation.
pub const ERROR_CODE_REQUIRED: &str = "required";
/// Error code for minimum length validation.
pub const ERROR_CODE_MIN_LENGTH: &str = "too_short";
/// Error code for maximum length validation.
pub const ERROR_CODE_MAX_LENGTH: &str = "too_long";
/// Error code for character set validation.
pub const ERROR_CODE_CHARSET: &str = "charset";
/// Error code for email validation.
pub const ERROR_CODE_EMAIL: &str = "email";
/// Error code for cross-field equality validation.
pub const ERROR_CODE_MISMATCH: &str = "mismatch";

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A validation error with code, message, and interpolation parameters.
///
/// The `code` field is a stable identifier for i18n systems.
/// The `message` field is a human-readable message template.
/// The `params` field contains key-value pairs for message interpolation.
///
/// # Example
///
/// ```rust
/// use settle_validation::ValidationError;
///
/// let error = ValidationError::new("too_short", "Must be at least {min} characters")
///     .with_param("min", 8);
///
/// assert_eq!(error.format_message(), "Must be at least 8 characters");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Stable error code for programmatic handling and i18n.
    pub code: &'static str,
    /// Human-readable error message template.
    pub message: String,
    /// Parameters for message interpolation.
    pub params: HashMap<String, String>,
}

impl ValidationError {
    /// Create a new validation error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter for message interpolation.
    ///
    /// Parameters are substituted in the message using `{key}` syntax.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Format the message with parameter substitution.
    #[must_use]
    pub fn format_message(&self) -> String {
        let mut result = self.message.clone();
        for (key, value) in &self.params {
            result = result.replace(&format!("{{{key}}}"), value);
        }
        result
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_message())
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// The result of a single validator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationResult {
    /// The value is valid.
    #[default]
    Valid,
    /// The value is invalid with an error.
    Invalid(ValidationError),
}

impl ValidationResult {
    /// Returns `true` if the result is `Valid`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Returns `true` if the result is `Invalid`.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Returns the error if the result is `Invalid`, otherwise `None`.
    #[must_use]
    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Valid => None,
            Self::Invalid(e) => Some(e),
        }
    }

    /// Returns the formatted error message if the result is `Invalid`.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ValidationError::format_message)
    }
}

// ---------------------------------------------------------------------------
// Validator Trait
// ---------------------------------------------------------------------------

/// A trait for validating values of type `T`.
///
/// # Implementing a Custom Validator
///
/// ```rust
/// use settle_validation::{Validator, ValidationResult, ValidationError};
///
/// struct NoSpaces;
///
/// impl Validator<str> for NoSpaces {
///     fn validate(&self, value: &str) -> ValidationResult {
///         if value.contains(' ') {
///             ValidationResult::Invalid(
///                 ValidationError::new("no_spaces", "Value must not contain spaces")
///             )
///         } else {
///             ValidationResult::Valid
///         }
///     }
///
///     fn error_message(&self) -> &str {
///         "Value must not contain spaces"
///     }
/// }
/// ```
pub trait Validator<T: ?Sized>: Send + Sync {
    /// Validate the given value.
    fn validate(&self, value: &T) -> ValidationResult;

    /// Return the message template this validator reports.
    fn error_message(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Built-in Validators
// ---------------------------------------------------------------------------

/// Validates that a string is not empty.
///
/// By default, whitespace-only strings are considered empty.
#[derive(Debug, Clone)]
pub struct Required {
    /// If `true`, whitespace-only strings are considered valid.
    pub allow_whitespace: bool,
    /// Reported message.
    pub message: String,
}

impl Default for Required {
    fn default() -> Self {
        Self {
            allow_whitespace: false,
            message: "This field is required".to_string(),
        }
    }
}

impl Required {
    /// Create a new `Required` validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow whitespace-only strings to pass validation.
    #[must_use]
    pub fn allow_whitespace(mut self) -> Self {
        self.allow_whitespace = true;
        self
    }

    /// Set a custom error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Whether `value` counts as empty under this validator.
    #[must_use]
    pub fn is_empty(&self, value: &str) -> bool {
        if self.allow_whitespace {
            value.is_empty()
        } else {
            value.trim().is_empty()
        }
    }
}

impl Validator<str> for Required {
    fn validate(&self, value: &str) -> ValidationResult {
        if self.is_empty(value) {
            ValidationResult::Invalid(ValidationError::new(ERROR_CODE_REQUIRED, &self.message))
        } else {
            ValidationResult::Valid
        }
    }

    fn error_message(&self) -> &str {
        &self.message
    }
}

/// Validates that a string has at least `min` characters.
#[derive(Debug, Clone)]
pub struct MinLength {
    /// Minimum number of characters required.
    pub min: usize,
    /// Reported message template (`{min}`, `{actual}` available).
    pub message: String,
}

impl MinLength {
    /// Create a new `MinLength` validator.
    #[must_use]
    pub fn new(min: usize) -> Self {
        Self {
            min,
            message: "Must be at least {min} characters".to_string(),
        }
    }

    /// Set a custom error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl Validator<str> for MinLength {
    fn validate(&self, value: &str) -> ValidationResult {
        let len = value.chars().count();
        if len < self.min {
            ValidationResult::Invalid(
                ValidationError::new(ERROR_CODE_MIN_LENGTH, &self.message)
                    .with_param("min", self.min)
                    .with_param("actual", len),
            )
        } else {
            ValidationResult::Valid
        }
    }

    fn error_message(&self) -> &str {
        &self.message
    }
}

/// Validates that a string has at most `max` characters.
#[derive(Debug, Clone)]
pub struct MaxLength {
    /// Maximum number of characters allowed.
    pub max: usize,
    /// Reported message template (`{max}`, `{actual}` available).
    pub message: String,
}

impl MaxLength {
    /// Create a new `MaxLength` validator.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            max,
            message: "Must be at most {max} characters".to_string(),
        }
    }

    /// Set a custom error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl Validator<str> for MaxLength {
    fn validate(&self, value: &str) -> ValidationResult {
        let len = value.chars().count();
        if len > self.max {
            ValidationResult::Invalid(
                ValidationError::new(ERROR_CODE_MAX_LENGTH, &self.message)
                    .with_param("max", self.max)
                    .with_param("actual", len),
            )
        } else {
            ValidationResult::Valid
        }
    }

    fn error_message(&self) -> &str {
        &self.message
    }
}

/// Validates that every character of a string belongs to an allowed set.
///
/// The empty string is valid.
#[derive(Debug, Clone)]
pub struct Charset {
    allowed: fn(char) -> bool,
    /// Reported message.
    pub message: String,
}

impl Charset {
    /// Create a validator accepting characters for which `allowed` holds.
    #[must_use]
    pub fn new(allowed: fn(char) -> bool) -> Self {
        Self {
            allowed,
            message: "Contains characters that are not allowed".to_string(),
        }
    }

    /// ASCII letters, digits, `_`, `.` and `-`.
    #[must_use]
    pub fn ascii_word() -> Self {
        Self::new(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    }

    /// Set a custom error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl Validator<str> for Charset {
    fn validate(&self, value: &str) -> ValidationResult {
        match value.chars().find(|c| !(self.allowed)(*c)) {
            None => ValidationResult::Valid,
            Some(bad) => ValidationResult::Invalid(
                ValidationError::new(ERROR_CODE_CHARSET, &self.message).with_param("char", bad),
            ),
        }
    }

    fn error_message(&self) -> &str {
        &self.message
    }
}

/// Validates that a string is a valid email address.
///
/// Uses a simple heuristic check: one `@` with text before and a dotted
/// domain after. The value is checked as given, so surrounding whitespace
/// fails. Empty input is valid (use [`Required`] for presence).
#[derive(Debug, Clone)]
pub struct Email {
    /// Reported message.
    pub message: String,
}

impl Default for Email {
    fn default() -> Self {
        Self {
            message: "Invalid email address".to_string(),
        }
    }
}

impl Email {
    /// Create a new `Email` validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn looks_valid(value: &str) -> bool {
        let Some((local, domain)) = value.split_once('@') else {
            return false;
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return false;
        }
        if local.chars().any(char::is_whitespace) || domain.chars().any(char::is_whitespace) {
            return false;
        }
        // Domain must be dotted with non-empty labels and a 2+ char TLD.
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
            return false;
        }
        labels.last().is_some_and(|tld| tld.chars().count() >= 2)
    }
}

impl Validator<str> for Email {
    fn validate(&self, value: &str) -> ValidationResult {
        if value.is_empty() || Self::looks_valid(value) {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(ValidationError::new(ERROR_CODE_EMAIL, &self.message))
        }
    }

    fn error_message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ValidationError tests --

    #[test]
    fn error_format_without_params() {
        let err = ValidationError::new("code", "Plain message");
        assert_eq!(err.format_message(), "Plain message");
    }

    #[test]
    fn error_format_with_params() {
        let err = ValidationError::new("range", "Between {min} and {max}")
            .with_param("min", 1)
            .with_param("max", 10);
        assert_eq!(err.format_message(), "Between 1 and 10");
        assert_eq!(err.to_string(), "Between 1 and 10");
    }

    #[test]
    fn result_accessors() {
        let invalid = ValidationResult::Invalid(ValidationError::new("x", "bad"));
        assert!(invalid.is_invalid());
        assert_eq!(invalid.error_message().as_deref(), Some("bad"));
        assert!(ValidationResult::Valid.error().is_none());
        assert!(ValidationResult::default().is_valid());
    }

    // -- Required tests --

    #[test]
    fn required_empty_fails() {
        let v = Required::new();
        assert!(v.validate("").is_invalid());
    }

    #[test]
    fn required_whitespace_only_fails() {
        let v = Required::new();
        assert!(v.validate("   ").is_invalid());
        assert!(v.validate("\t\n").is_invalid());
    }

    #[test]
    fn required_whitespace_allowed() {
        let v = Required::new().allow_whitespace();
        assert!(v.validate("   ").is_valid());
        assert!(v.validate("").is_invalid());
    }

    #[test]
    fn required_custom_message() {
        let v = Required::new().with_message("Name is required");
        assert_eq!(v.validate("").error_message().as_deref(), Some("Name is required"));
        assert_eq!(v.error_message(), "Name is required");
    }

    // -- MinLength tests --

    #[test]
    fn min_length_boundary() {
        let v = MinLength::new(6);
        assert!(v.validate("abcde").is_invalid());
        assert!(v.validate("abcdef").is_valid());
    }

    #[test]
    fn min_length_counts_chars_not_bytes() {
        let v = MinLength::new(4);
        assert!(v.validate("café").is_valid());
        assert!(v.validate("caf").is_invalid());
    }

    #[test]
    fn min_length_error_params() {
        let v = MinLength::new(5);
        let result = v.validate("ab");
        let Some(err) = result.error() else {
            panic!("expected invalid result");
        };
        assert_eq!(err.code, ERROR_CODE_MIN_LENGTH);
        assert_eq!(err.params.get("min"), Some(&"5".to_string()));
        assert_eq!(err.params.get("actual"), Some(&"2".to_string()));
        assert_eq!(err.format_message(), "Must be at least 5 characters");
    }

    // -- MaxLength tests --

    #[test]
    fn max_length_boundary() {
        let v = MaxLength::new(100);
        assert!(v.validate(&"x".repeat(100)).is_valid());
        assert!(v.validate(&"x".repeat(101)).is_invalid());
    }

    #[test]
    fn max_length_custom_message() {
        let v = MaxLength::new(3).with_message("Name must be shorter than {max} chars.");
        assert_eq!(
            v.validate("abcd").error_message().as_deref(),
            Some("Name must be shorter than 3 chars.")
        );
    }

    // -- Charset tests --

    #[test]
    fn charset_ascii_word() {
        let v = Charset::ascii_word();
        assert!(v.validate("").is_valid());
        assert!(v.validate("Secret_1.2-3").is_valid());
        assert!(v.validate("heslo!").is_invalid());
        assert!(v.validate("žluťoučký").is_invalid());
        assert!(v.validate("with space").is_invalid());
    }

    #[test]
    fn charset_reports_offending_char() {
        let result = Charset::ascii_word().validate("ab#c");
        assert_eq!(
            result.error().and_then(|e| e.params.get("char")).map(String::as_str),
            Some("#")
        );
    }

    // -- Email tests --

    #[test]
    fn email_valid() {
        let v = Email::new();
        assert!(v.validate("user@example.com").is_valid());
        assert!(v.validate("first.last@sub.example.cz").is_valid());
    }

    #[test]
    fn email_padding_is_not_trimmed() {
        let v = Email::new();
        assert!(v.validate("  padded@example.com  ").is_invalid());
        assert!(v.validate(" padded@example.com").is_invalid());
    }

    #[test]
    fn email_invalid() {
        let v = Email::new();
        assert!(v.validate("plain").is_invalid());
        assert!(v.validate("@example.com").is_invalid());
        assert!(v.validate("user@").is_invalid());
        assert!(v.validate("user@localhost").is_invalid());
        assert!(v.validate("user@example.c").is_invalid());
        assert!(v.validate("user@@example.com").is_invalid());
        assert!(v.validate("us er@example.com").is_invalid());
        assert!(v.validate("user@example..com").is_invalid());
    }

    #[test]
    fn email_empty_is_valid_whitespace_is_not() {
        assert!(Email::new().validate("").is_valid());
        assert!(Email::new().validate("   ").is_invalid());
    }
}
