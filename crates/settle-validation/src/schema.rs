#![forbid(unsafe_code)]

//! Declarative object schemas.
//!
//! An [`ObjectSchema`] describes the fields of a typed candidate: how to read
//! each field, whether it must be present, and which rules its value must
//! satisfy. Validation walks every field and collects every violation; it
//! never stops at the first failure.
//!
//! # Example
//!
//! ```
//! use settle_validation::schema::{ObjectSchema, Schema};
//! use settle_validation::validators::MinLength;
//!
//! struct Candidate {
//!     password: Option<String>,
//! }
//!
//! let schema = ObjectSchema::<Candidate>::new("login").text(
//!     "password",
//!     |c| c.password.as_deref(),
//!     |f| f.required("Password is required").rule(MinLength::new(6)),
//! );
//!
//! let failure = schema
//!     .validate(&Candidate { password: Some(String::new()) })
//!     .unwrap_err();
//! assert_eq!(failure.messages_for("password").len(), 2);
//! ```
//!
//! # Invariants
//!
//! - Fields are checked in declaration order; a field's messages keep the
//!   declaration order of its rules.
//! - An absent value reports only its presence rule; every other rule of
//!   that field is skipped.
//! - A present value runs every rule, including presence.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Absent optional field | No messages |
//! | Absent required field | Presence message only |
//! | `must_match` on absent value | Passes |

use std::fmt;

use chrono::{DateTime, Utc};

use crate::validators::{Required, Validator};

/// Reads a text field from a candidate.
pub type TextAccessor<T> = fn(&T) -> Option<&str>;

/// Reads a date field from a candidate.
pub type DateAccessor<T> = fn(&T) -> Option<&DateTime<Utc>>;

// ---------------------------------------------------------------------------
// Failure value
// ---------------------------------------------------------------------------

/// Every message reported for one field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Flat field identifier, e.g. `"passwordConfirmation"`.
    pub path: String,
    /// Messages in rule declaration order.
    pub messages: Vec<String>,
}

/// The error value of a failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationFailure {
    violations: Vec<FieldViolation>,
}

impl ValidationFailure {
    /// Build a failure from its violations.
    #[must_use]
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Violations in field declaration order.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Messages reported for `path`, empty when the field passed.
    #[must_use]
    pub fn messages_for(&self, path: &str) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| v.path == path)
            .flat_map(|v| v.messages.iter().map(String::as_str))
            .collect()
    }

    /// Total number of messages across all fields.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.violations.iter().map(|v| v.messages.len()).sum()
    }

    /// Whether no violation was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} ({})", violation.path, violation.messages.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

// ---------------------------------------------------------------------------
// Schema trait
// ---------------------------------------------------------------------------

/// Validates a whole candidate object.
pub trait Schema<T>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Check every field of `candidate`, collecting all violations.
    fn validate(&self, candidate: &T) -> Result<(), ValidationFailure>;
}

// ---------------------------------------------------------------------------
// Field builders
// ---------------------------------------------------------------------------

enum TextRule<T> {
    Required(Required),
    Check(Box<dyn Validator<str>>),
    Matches {
        other: TextAccessor<T>,
        message: String,
    },
}

/// Rules for one text field.
pub struct TextField<T> {
    path: &'static str,
    accessor: TextAccessor<T>,
    rules: Vec<TextRule<T>>,
}

impl<T> TextField<T> {
    fn new(path: &'static str, accessor: TextAccessor<T>) -> Self {
        Self {
            path,
            accessor,
            rules: Vec::new(),
        }
    }

    /// Require a non-null, non-empty value.
    #[must_use]
    pub fn required(mut self, message: impl Into<String>) -> Self {
        let required = Required::new().allow_whitespace().with_message(message);
        self.rules.push(TextRule::Required(required));
        self
    }

    /// Add a rule checked against present values.
    #[must_use]
    pub fn rule<V>(mut self, validator: V) -> Self
    where
        V: Validator<str> + 'static,
    {
        self.rules.push(TextRule::Check(Box::new(validator)));
        self
    }

    /// Present values must equal the value read by `other`.
    #[must_use]
    pub fn must_match(mut self, other: TextAccessor<T>, message: impl Into<String>) -> Self {
        self.rules.push(TextRule::Matches {
            other,
            message: message.into(),
        });
        self
    }

    fn check(&self, candidate: &T) -> Vec<String> {
        let Some(value) = (self.accessor)(candidate) else {
            return self
                .rules
                .iter()
                .filter_map(|rule| match rule {
                    TextRule::Required(required) => Some(required.error_message().to_string()),
                    _ => None,
                })
                .collect();
        };

        self.rules
            .iter()
            .filter_map(|rule| match rule {
                TextRule::Required(required) => required.validate(value).error_message(),
                TextRule::Check(validator) => validator.validate(value).error_message(),
                TextRule::Matches { other, message } => {
                    (other(candidate) != Some(value)).then(|| message.clone())
                }
            })
            .collect()
    }
}

/// Rules for one date field.
pub struct DateField<T> {
    path: &'static str,
    accessor: DateAccessor<T>,
    required: Option<String>,
}

impl<T> DateField<T> {
    fn new(path: &'static str, accessor: DateAccessor<T>) -> Self {
        Self {
            path,
            accessor,
            required: None,
        }
    }

    /// Require a value.
    #[must_use]
    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.required = Some(message.into());
        self
    }

    fn check(&self, candidate: &T) -> Vec<String> {
        match (&self.required, (self.accessor)(candidate)) {
            (Some(message), None) => vec![message.clone()],
            _ => Vec::new(),
        }
    }
}

enum FieldSpec<T> {
    Text(TextField<T>),
    Date(DateField<T>),
}

impl<T> FieldSpec<T> {
    fn path(&self) -> &'static str {
        match self {
            Self::Text(field) => field.path,
            Self::Date(field) => field.path,
        }
    }

    fn check(&self, candidate: &T) -> Vec<String> {
        match self {
            Self::Text(field) => field.check(candidate),
            Self::Date(field) => field.check(candidate),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectSchema
// ---------------------------------------------------------------------------

/// A schema assembled from typed field declarations.
pub struct ObjectSchema<T> {
    name: String,
    fields: Vec<FieldSpec<T>>,
}

impl<T> fmt::Debug for ObjectSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSchema")
            .field("name", &self.name)
            .field("fields", &self.field_paths())
            .finish()
    }
}

impl<T> ObjectSchema<T> {
    /// Create an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declare a text field.
    #[must_use]
    pub fn text<F>(mut self, path: &'static str, accessor: TextAccessor<T>, configure: F) -> Self
    where
        F: FnOnce(TextField<T>) -> TextField<T>,
    {
        let field = configure(TextField::new(path, accessor));
        self.fields.push(FieldSpec::Text(field));
        self
    }

    /// Declare a date field.
    #[must_use]
    pub fn date<F>(mut self, path: &'static str, accessor: DateAccessor<T>, configure: F) -> Self
    where
        F: FnOnce(DateField<T>) -> DateField<T>,
    {
        let field = configure(DateField::new(path, accessor));
        self.fields.push(FieldSpec::Date(field));
        self
    }

    /// Declared field paths, in order.
    #[must_use]
    pub fn field_paths(&self) -> Vec<&'static str> {
        self.fields.iter().map(FieldSpec::path).collect()
    }
}

impl<T> Schema<T> for ObjectSchema<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, candidate: &T) -> Result<(), ValidationFailure> {
        let violations: Vec<FieldViolation> = self
            .fields
            .iter()
            .filter_map(|field| {
                let messages = field.check(candidate);
                (!messages.is_empty()).then(|| FieldViolation {
                    path: field.path().to_string(),
                    messages,
                })
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure::new(violations))
        }
    }
}
