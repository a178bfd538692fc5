#![forbid(unsafe_code)]

//! The todo editor: creates a new task or updates an existing one.
//!
//! Name and description are debounced; the deadline comes from a picker and
//! takes effect immediately. After a successful save every field is reset
//! and the editor returns to creating a new task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use settle_core::{Clock, Debouncer, Instant, earliest_deadline};
use settle_validation::{MaxLength, ObjectSchema};

use crate::config::FormConfig;
use crate::form::{Form, FormError, FormValidation, Submission};
use crate::model::{NewTodo, TodoItem, TodoUpdate};
use crate::services::TodoService;
use crate::view::field_errors;

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const DEADLINE: &str = "deadline";

/// Values of the editor as the schema sees them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TodoCandidate {
    /// Id of the edited task; `None` when creating.
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Rules for [`TodoCandidate`].
#[must_use]
pub fn todo_schema() -> ObjectSchema<TodoCandidate> {
    ObjectSchema::<TodoCandidate>::new("todo")
        .text(NAME, |c| c.name.as_deref(), |f| {
            f.required("Name is required")
                .rule(MaxLength::new(100).with_message("Name must be shorter than 100 chars."))
        })
        .text(DESCRIPTION, |c| c.description.as_deref(), |f| {
            f.rule(MaxLength::new(1000).with_message("Description must be shorter than 1000 chars."))
        })
        .date(DEADLINE, |c| c.deadline.as_ref(), |f| f)
}

/// Empty strings load as null, so an item without a description starts
/// with its error display hidden.
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

/// Dialog for creating and editing a task.
pub struct TodoEditor {
    item: Option<TodoItem>,
    name: Debouncer<Option<String>>,
    description: Debouncer<Option<String>>,
    deadline: Option<DateTime<Utc>>,
    validation: FormValidation<TodoCandidate>,
    clock: Arc<dyn Clock>,
}

impl TodoEditor {
    /// Mount the editor for `item` (or a new task) and queue validation.
    #[must_use]
    pub fn mount(config: &FormConfig, clock: Arc<dyn Clock>, item: Option<TodoItem>) -> Self {
        let name = non_empty(item.as_ref().map(|i| i.name.as_str()));
        let description = non_empty(item.as_ref().and_then(|i| i.description.as_deref()));
        let mut editor = Self {
            deadline: item.as_ref().and_then(|i| i.deadline),
            item,
            name: Debouncer::new(name, config.text_debounce),
            description: Debouncer::new(description, config.text_debounce),
            validation: FormValidation::new(Arc::new(todo_schema()), Arc::clone(&clock)),
            clock,
        };
        editor.validation.request(editor.candidate());
        editor
    }

    /// Switch to editing `item` (or a new task).
    ///
    /// Pending input is dropped and the fields take the item's values
    /// immediately.
    pub fn load(&mut self, item: Option<TodoItem>) {
        if self.validation.is_torn_down() {
            return;
        }
        let delay = self.name.delay();
        self.name = Debouncer::new(non_empty(item.as_ref().map(|i| i.name.as_str())), delay);
        self.description = Debouncer::new(
            non_empty(item.as_ref().and_then(|i| i.description.as_deref())),
            self.description.delay(),
        );
        self.deadline = item.as_ref().and_then(|i| i.deadline);
        self.item = item;
        self.validation.request(self.candidate());
    }

    /// The task being edited, if any.
    #[must_use]
    pub fn item(&self) -> Option<&TodoItem> {
        self.item.as_ref()
    }

    /// Whether a save will create a new task.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.item.is_none()
    }

    pub fn set_name(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.set_name_at(text, now);
    }

    pub fn set_name_at(&mut self, text: impl Into<String>, now: Instant) {
        self.name.push_at(Some(text.into()), now);
    }

    pub fn set_description(&mut self, text: impl Into<String>) {
        let now = self.clock.now();
        self.set_description_at(text, now);
    }

    pub fn set_description_at(&mut self, text: impl Into<String>, now: Instant) {
        self.description.push_at(Some(text.into()), now);
    }

    /// Pick a deadline. Not debounced: validation is queued right away.
    pub fn set_deadline(&mut self, deadline: Option<DateTime<Utc>>) {
        if self.validation.is_torn_down() || self.deadline == deadline {
            return;
        }
        self.deadline = deadline;
        self.validation.request(self.candidate());
    }

    /// Debounced name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.value().as_deref()
    }

    /// Debounced description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.value().as_deref()
    }

    /// Selected deadline.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// The object the schema sees.
    #[must_use]
    pub fn candidate(&self) -> TodoCandidate {
        TodoCandidate {
            id: self.item.as_ref().map(|i| i.id.clone()),
            name: self.name.value().clone(),
            description: self.description.value().clone(),
            deadline: self.deadline,
        }
    }

    #[must_use]
    pub fn name_errors(&self) -> &[String] {
        field_errors(self.validation.outcome(), NAME, self.name())
    }

    #[must_use]
    pub fn description_errors(&self) -> &[String] {
        field_errors(self.validation.outcome(), DESCRIPTION, self.description())
    }

    #[must_use]
    pub fn deadline_errors(&self) -> &[String] {
        field_errors(self.validation.outcome(), DEADLINE, self.deadline.as_ref())
    }

    /// Save the validated values, then reset the editor.
    ///
    /// Updates the loaded task if there is one, otherwise creates a task.
    pub fn submit(&mut self, todos: &dyn TodoService) -> Result<Submission<TodoItem>, FormError> {
        if let Some(reason) = self.validation.block_reason() {
            tracing::debug!(form = "todo", ?reason, "submit blocked");
            return Ok(Submission::Blocked(reason));
        }
        let candidate = self.candidate();
        let saved = match &self.item {
            Some(item) => todos.update(&TodoUpdate {
                id: item.id.clone(),
                name: candidate.name.unwrap_or_default(),
                description: candidate.description,
                deadline: candidate.deadline,
                finished_at: item.finished_at,
            })?,
            None => todos.create(&NewTodo {
                name: candidate.name.unwrap_or_default(),
                description: candidate.description,
                deadline: candidate.deadline,
            })?,
        };
        tracing::info!(form = "todo", id = %saved.id, "form submitted");
        self.load(None);
        Ok(Submission::Submitted(saved))
    }
}

impl Form for TodoEditor {
    type Candidate = TodoCandidate;

    fn validation(&self) -> &FormValidation<TodoCandidate> {
        &self.validation
    }

    fn validation_mut(&mut self) -> &mut FormValidation<TodoCandidate> {
        &mut self.validation
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn tick_at(&mut self, now: Instant) -> bool {
        let changed = [
            self.name.tick_at(now).is_some(),
            self.description.tick_at(now).is_some(),
        ];
        if !changed.contains(&true) {
            return false;
        }
        self.validation.request(self.candidate());
        true
    }

    fn next_deadline(&self) -> Option<Instant> {
        earliest_deadline([self.name.deadline(), self.description.deadline()])
    }

    fn teardown(&mut self) {
        self.name.teardown();
        self.description.teardown();
        self.validation.teardown();
    }
}
