#![forbid(unsafe_code)]

//! The login form.

use std::sync::Arc;

use settle_core::{Clock, Debouncer, Instant, earliest_deadline};
use settle_validation::{Charset, Email, MinLength, ObjectSchema};

use crate::config::FormConfig;
use crate::form::{Form, FormError, FormValidation, Submission};
use crate::model::{Credentials, Session};
use crate::services::AuthService;
use crate::view::field_errors;

/// Field path of the email input.
pub const EMAIL: &str = "email";
/// Field path of the password input.
pub const PASSWORD: &str = "password";

/// Debounced values of the login form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginCandidate {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Rules for [`LoginCandidate`].
#[must_use]
pub fn login_schema() -> ObjectSchema<LoginCandidate> {
    ObjectSchema::<LoginCandidate>::new("login")
        .text(PASSWORD, |c| c.password.as_deref(), |f| {
            f.required("Password is required")
                .rule(MinLength::new(6).with_message("Password is too short - should be 6 chars minimum"))
                .rule(Charset::ascii_word().with_message("Password can only contain Latin letters."))
        })
        .text(EMAIL, |c| c.email.as_deref(), |f| {
            f.required("Email is required")
                .rule(Email::new().with_message("Must be a valid email"))
        })
}

/// Email and password inputs, each debounced, validated as one object.
pub struct LoginForm {
    email: Debouncer<Option<String>>,
    password: Debouncer<Option<String>>,
    validation: FormValidation<LoginCandidate>,
    clock: Arc<dyn Clock>,
}

impl LoginForm {
    /// Mount an empty form and queue validation of the empty candidate.
    #[must_use]
    pub fn mount(config: &FormConfig, clock: Arc<dyn Clock>) -> Self {
        let mut form = Self {
            email: Debouncer::new(None, config.text_debounce),
            password: Debouncer::new(None, config.text_debounce),
            validation: FormValidation::new(Arc::new(login_schema()), Arc::clone(&clock)),
            clock,
        };
        form.validation.request(form.candidate());
        form
    }

    /// Type into the email input.
    pub fn set_email(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.set_email_at(text, now);
    }

    /// Type into the email input at `now`.
    pub fn set_email_at(&mut self, text: impl Into<String>, now: Instant) {
        self.email.push_at(Some(text.into()), now);
    }

    /// Type into the password input.
    pub fn set_password(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.set_password_at(text, now);
    }

    /// Type into the password input at `now`.
    pub fn set_password_at(&mut self, text: impl Into<String>, now: Instant) {
        self.password.push_at(Some(text.into()), now);
    }

    /// Debounced email.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.value().as_deref()
    }

    /// Debounced password.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.value().as_deref()
    }

    /// The object the schema sees.
    #[must_use]
    pub fn candidate(&self) -> LoginCandidate {
        LoginCandidate {
            email: self.email.value().clone(),
            password: self.password.value().clone(),
        }
    }

    /// Messages displayed under the email input.
    #[must_use]
    pub fn email_errors(&self) -> &[String] {
        field_errors(self.validation.outcome(), EMAIL, self.email())
    }

    /// Messages displayed under the password input.
    #[must_use]
    pub fn password_errors(&self) -> &[String] {
        field_errors(self.validation.outcome(), PASSWORD, self.password())
    }

    /// Log in with the validated values.
    pub fn submit(&self, auth: &dyn AuthService) -> Result<Submission<Session>, FormError> {
        if let Some(reason) = self.validation.block_reason() {
            tracing::debug!(form = "login", ?reason, "submit blocked");
            return Ok(Submission::Blocked(reason));
        }
        let candidate = self.candidate();
        let credentials = Credentials {
            email: candidate.email.unwrap_or_default(),
            password: candidate.password.unwrap_or_default(),
        };
        let session = auth.login(&credentials)?;
        tracing::info!(form = "login", "form submitted");
        Ok(Submission::Submitted(session))
    }
}

impl Form for LoginForm {
    type Candidate = LoginCandidate;

    fn validation(&self) -> &FormValidation<LoginCandidate> {
        &self.validation
    }

    fn validation_mut(&mut self) -> &mut FormValidation<LoginCandidate> {
        &mut self.validation
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn tick_at(&mut self, now: Instant) -> bool {
        let changed = [
            self.email.tick_at(now).is_some(),
            self.password.tick_at(now).is_some(),
        ];
        if !changed.contains(&true) {
            return false;
        }
        self.validation.request(self.candidate());
        true
    }

    fn next_deadline(&self) -> Option<Instant> {
        earliest_deadline([self.email.deadline(), self.password.deadline()])
    }

    fn teardown(&mut self) {
        self.email.teardown();
        self.password.teardown();
        self.validation.teardown();
    }
}
