#![forbid(unsafe_code)]

//! Which validation messages a field displays.

use settle_validation::ValidationOutcome;

/// Messages to show under `field`.
///
/// Nothing is shown until the field's debounced value is non-null, so an
/// untouched form does not greet the user with errors.
#[must_use]
pub fn field_errors<'a, V: ?Sized>(
    outcome: &'a ValidationOutcome,
    field: &str,
    debounced: Option<&V>,
) -> &'a [String] {
    if debounced.is_none() {
        return &[];
    }
    outcome.errors_for(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use settle_validation::{FieldViolation, ValidationFailure};

    fn outcome() -> ValidationOutcome {
        ValidationOutcome::from(ValidationFailure::new(vec![FieldViolation {
            path: "email".into(),
            messages: vec!["Email is required".into()],
        }]))
    }

    #[test]
    fn hidden_while_value_is_null() {
        assert!(field_errors::<str>(&outcome(), "email", None).is_empty());
    }

    #[test]
    fn shown_once_value_is_present() {
        assert_eq!(field_errors(&outcome(), "email", Some("")), ["Email is required"]);
    }

    #[test]
    fn fields_without_errors_show_nothing() {
        assert!(field_errors(&outcome(), "password", Some("x")).is_empty());
    }
}
