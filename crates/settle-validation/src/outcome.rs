#![forbid(unsafe_code)]

//! Field-keyed validation state consumed by the rendering layer.

use std::collections::BTreeMap;

use crate::schema::ValidationFailure;

/// `{is_valid, errors_by_field}` for one validated candidate.
///
/// Validity is derived from the map, so an outcome with messages can never
/// report itself valid. Keys only exist for fields with at least one message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationOutcome {
    /// The empty, valid outcome.
    #[must_use]
    pub fn valid() -> Self {
        Self::default()
    }

    /// Flatten a schema failure into per-field messages.
    ///
    /// Repeated paths are merged in order; empty message lists are dropped.
    #[must_use]
    pub fn from_failure(failure: &ValidationFailure) -> Self {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for violation in failure.violations() {
            if violation.messages.is_empty() {
                continue;
            }
            errors
                .entry(violation.path.clone())
                .or_default()
                .extend(violation.messages.iter().cloned());
        }
        Self { errors }
    }

    /// Whether no field has a message.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Every field with its messages, ordered by field path.
    #[must_use]
    pub fn errors_by_field(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Messages for `field`; empty when it has none.
    #[must_use]
    pub fn errors_for(&self, field: &str) -> &[String] {
        self.errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// Whether `field` has at least one message.
    #[must_use]
    pub fn has_errors(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Total number of messages.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }
}

impl From<Result<(), ValidationFailure>> for ValidationOutcome {
    fn from(result: Result<(), ValidationFailure>) -> Self {
        match result {
            Ok(()) => Self::valid(),
            Err(failure) => Self::from_failure(&failure),
        }
    }
}

impl From<ValidationFailure> for ValidationOutcome {
    fn from(failure: ValidationFailure) -> Self {
        Self::from_failure(&failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldViolation;

    fn violation(path: &str, messages: &[&str]) -> FieldViolation {
        FieldViolation {
            path: path.to_string(),
            messages: messages.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn valid_outcome_is_empty() {
        let outcome = ValidationOutcome::valid();
        assert!(outcome.is_valid());
        assert!(outcome.errors_by_field().is_empty());
        assert!(outcome.errors_for("email").is_empty());
    }

    #[test]
    fn failure_is_keyed_by_path() {
        let failure = ValidationFailure::new(vec![
            violation("password", &["Password is required"]),
            violation("email", &["Email is required"]),
        ]);
        let outcome = ValidationOutcome::from(Err(failure));
        assert!(!outcome.is_valid());
        assert_eq!(outcome.errors_for("password"), ["Password is required"]);
        assert_eq!(outcome.errors_for("email"), ["Email is required"]);
        assert_eq!(outcome.error_count(), 2);
        let keys: Vec<&String> = outcome.errors_by_field().keys().collect();
        assert_eq!(keys, ["email", "password"]);
    }

    #[test]
    fn repeated_paths_merge_and_empty_lists_drop() {
        let failure = ValidationFailure::new(vec![
            violation("name", &["a"]),
            violation("note", &[]),
            violation("name", &["b"]),
        ]);
        let outcome = ValidationOutcome::from(failure);
        assert_eq!(outcome.errors_for("name"), ["a", "b"]);
        assert!(!outcome.has_errors("note"));
    }

    #[test]
    fn ok_result_is_valid() {
        assert_eq!(ValidationOutcome::from(Ok(())), ValidationOutcome::valid());
    }
}
