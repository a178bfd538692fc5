#![forbid(unsafe_code)]

//! Forms of the todo application, built on debounced validation.
//!
//! Each form owns one [`Debouncer`](settle_core::Debouncer) per free-text
//! input and a [`FormValidation`] that re-validates the assembled candidate
//! whenever a debounced value settles.
//!
//! # Driving a form
//!
//! ```
//! use std::sync::Arc;
//! use settle_core::ManualClock;
//! use settle_forms::{Form, FormConfig, LoginForm};
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut form = LoginForm::mount(&FormConfig::default(), clock.clone());
//! form.poll_validations();
//! assert!(!form.can_submit());
//! assert!(form.email_errors().is_empty()); // untouched fields stay quiet
//!
//! form.set_email("jan@example.cz");
//! form.set_password("secret");
//! clock.advance_ms(1000);
//! assert!(form.tick());
//! form.poll_validations();
//! assert!(form.can_submit());
//! ```

pub mod config;
pub mod filter;
pub mod form;
pub mod login;
pub mod model;
pub mod register;
pub mod services;
pub mod todo;
pub mod view;

pub use config::{ApiRoutes, ConfigError, FormConfig};
pub use filter::TodoFilter;
pub use form::{BlockReason, Form, FormError, FormValidation, Submission};
pub use login::{LoginCandidate, LoginForm, login_schema};
pub use model::{Credentials, NewTodo, Registration, Session, TodoItem, TodoUpdate};
pub use register::{RegisterCandidate, RegisterForm, register_schema};
pub use services::{
    ApiCall, AuthService, InMemoryAuth, InMemoryTodos, MemorySessionStore, Method, ServiceError,
    SessionStore, TodoService, auth_headers, default_headers,
};
pub use todo::{TodoCandidate, TodoEditor, todo_schema};
pub use view::field_errors;
