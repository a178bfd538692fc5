#![forbid(unsafe_code)]

//! The registration form.

use std::sync::Arc;

use settle_core::{Clock, Debouncer, Instant, earliest_deadline};
use settle_validation::{Charset, Email, MinLength, ObjectSchema};

use crate::config::FormConfig;
use crate::form::{Form, FormError, FormValidation, Submission};
use crate::model::Registration;
use crate::services::AuthService;
use crate::view::field_errors;

pub const NAME: &str = "name";
pub const EMAIL: &str = "email";
pub const PASSWORD: &str = "password";
pub const PASSWORD_CONFIRMATION: &str = "passwordConfirmation";

/// Debounced values of the registration form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterCandidate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

/// Rules for [`RegisterCandidate`].
#[must_use]
pub fn register_schema() -> ObjectSchema<RegisterCandidate> {
    ObjectSchema::<RegisterCandidate>::new("register")
        .text(NAME, |c| c.name.as_deref(), |f| f.required("Name is required"))
        .text(PASSWORD, |c| c.password.as_deref(), |f| {
            f.required("Password is required")
                .rule(MinLength::new(6).with_message("Password is too short - should be 6 chars minimum."))
                .rule(Charset::ascii_word().with_message("Password can only contain Latin letters."))
        })
        .text(PASSWORD_CONFIRMATION, |c| c.password_confirmation.as_deref(), |f| {
            f.must_match(|c| c.password.as_deref(), "Passwords must match")
        })
        .text(EMAIL, |c| c.email.as_deref(), |f| {
            f.rule(Email::new().with_message("Must be a valid e-mail."))
                .required("Email is required")
        })
}

/// Name, email, password and confirmation inputs.
pub struct RegisterForm {
    name: Debouncer<Option<String>>,
    email: Debouncer<Option<String>>,
    password: Debouncer<Option<String>>,
    password_confirmation: Debouncer<Option<String>>,
    validation: FormValidation<RegisterCandidate>,
    clock: Arc<dyn Clock>,
}

impl RegisterForm {
    /// Mount an empty form and queue validation of the empty candidate.
    #[must_use]
    pub fn mount(config: &FormConfig, clock: Arc<dyn Clock>) -> Self {
        let field = || Debouncer::new(None, config.text_debounce);
        let mut form = Self {
            name: field(),
            email: field(),
            password: field(),
            password_confirmation: field(),
            validation: FormValidation::new(Arc::new(register_schema()), Arc::clone(&clock)),
            clock,
        };
        form.validation.request(form.candidate());
        form
    }

    pub fn set_name(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.set_name_at(text, now);
    }

    pub fn set_name_at(&mut self, text: impl Into<String>, now: Instant) {
        self.name.push_at(Some(text.into()), now);
    }

    pub fn set_email(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.set_email_at(text, now);
    }

    pub fn set_email_at(&mut self, text: impl Into<String>, now: Instant) {
        self.email.push_at(Some(text.into()), now);
    }

    pub fn set_password(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.set_password_at(text, now);
    }

    pub fn set_password_at(&mut self, text: impl Into<String>, now: Instant) {
        self.password.push_at(Some(text.into()), now);
    }

    pub fn set_password_confirmation(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.set_password_confirmation_at(text, now);
    }

    pub fn set_password_confirmation_at(&mut self, text: impl Into<String>, now: Instant) {
        self.password_confirmation.push_at(Some(text.into()), now);
    }

    /// The object the schema sees.
    #[must_use]
    pub fn candidate(&self) -> RegisterCandidate {
        RegisterCandidate {
            name: self.name.value().clone(),
            email: self.email.value().clone(),
            password: self.password.value().clone(),
            password_confirmation: self.password_confirmation.value().clone(),
        }
    }

    /// Messages displayed under the input for `field`.
    ///
    /// Unknown fields show nothing.
    #[must_use]
    pub fn errors(&self, field: &str) -> &[String] {
        let debounced = match field {
            NAME => self.name.value(),
            EMAIL => self.email.value(),
            PASSWORD => self.password.value(),
            PASSWORD_CONFIRMATION => self.password_confirmation.value(),
            _ => return &[],
        };
        field_errors(self.validation.outcome(), field, debounced.as_deref())
    }

    /// Create the account with the validated values.
    pub fn submit(&self, auth: &dyn AuthService) -> Result<Submission<()>, FormError> {
        if let Some(reason) = self.validation.block_reason() {
            tracing::debug!(form = "register", ?reason, "submit blocked");
            return Ok(Submission::Blocked(reason));
        }
        let candidate = self.candidate();
        let registration = Registration {
            name: candidate.name.unwrap_or_default(),
            email: candidate.email.unwrap_or_default(),
            password: candidate.password.unwrap_or_default(),
            password_confirmation: candidate.password_confirmation.unwrap_or_default(),
        };
        auth.register(&registration)?;
        tracing::info!(form = "register", "form submitted");
        Ok(Submission::Submitted(()))
    }
}

impl Form for RegisterForm {
    type Candidate = RegisterCandidate;

    fn validation(&self) -> &FormValidation<RegisterCandidate> {
        &self.validation
    }

    fn validation_mut(&mut self) -> &mut FormValidation<RegisterCandidate> {
        &mut self.validation
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn tick_at(&mut self, now: Instant) -> bool {
        let changed = [
            self.name.tick_at(now).is_some(),
            self.email.tick_at(now).is_some(),
            self.password.tick_at(now).is_some(),
            self.password_confirmation.tick_at(now).is_some(),
        ];
        if !changed.contains(&true) {
            return false;
        }
        self.validation.request(self.candidate());
        true
    }

    fn next_deadline(&self) -> Option<Instant> {
        earliest_deadline([
            self.name.deadline(),
            self.email.deadline(),
            self.password.deadline(),
            self.password_confirmation.deadline(),
        ])
    }

    fn teardown(&mut self) {
        self.name.teardown();
        self.email.teardown();
        self.password.teardown();
        self.password_confirmation.teardown();
        self.validation.teardown();
    }
}
