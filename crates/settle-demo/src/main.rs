#![forbid(unsafe_code)]

//! Scripted walk through registration, login and the todo list.
//!
//! Keystrokes are replayed against a manual clock so the run is
//! deterministic; validation output is printed after each step.
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=debug cargo run -p settle-demo
//! ```
//!
//! Configuration is read from the `SETTLE_*` environment variables; see
//! `settle_forms::config`.

use std::error::Error;
use std::sync::Arc;

use settle_core::{Clock, ManualClock};
use settle_forms::register::{EMAIL, NAME, PASSWORD, PASSWORD_CONFIRMATION};
use settle_forms::{
    AuthService, Form, FormConfig, InMemoryAuth, InMemoryTodos, LoginForm, MemorySessionStore,
    RegisterForm, SessionStore, Submission, TodoEditor, TodoFilter, TodoService,
};

/// Type `text` one character at a time, `gap_ms` apart.
fn type_into(clock: &ManualClock, text: &str, gap_ms: u64, mut push: impl FnMut(String)) {
    let mut typed = String::new();
    for ch in text.chars() {
        typed.push(ch);
        push(typed.clone());
        clock.advance_ms(gap_ms);
    }
}

/// Advance until every debouncer of `form` has published, then validate.
fn settle<F: Form>(form: &mut F, clock: &ManualClock) {
    while let Some(deadline) = form.next_deadline() {
        let now = clock.now();
        if deadline > now {
            clock.advance(deadline - now);
        }
        form.tick();
    }
    form.poll_validations();
}

fn print_errors(label: &str, errors: &[String]) {
    if errors.is_empty() {
        println!("  {label}: ok");
    } else {
        println!("  {label}: {}", errors.join("; "));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    settle_core::logging::init("info")?;
    let config = FormConfig::from_env()?;
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(MemorySessionStore::new(config.user_storage_key.clone()));
    let auth = InMemoryAuth::new(config.routes(), store.clone());
    let todos = InMemoryTodos::new(config.routes(), store.clone());

    // ── Registration ────────────────────────────────────────────────────
    println!("register:");
    let mut register = RegisterForm::mount(&config, clock.clone());
    type_into(&clock, "Jan", 120, |t| register.set_name(t));
    type_into(&clock, "jan@example", 120, |t| register.set_email(t));
    type_into(&clock, "secret", 120, |t| register.set_password(t));
    type_into(&clock, "secreT", 120, |t| register.set_password_confirmation(t));
    settle(&mut register, &clock);
    for field in [NAME, EMAIL, PASSWORD, PASSWORD_CONFIRMATION] {
        print_errors(field, register.errors(field));
    }
    if let Submission::Blocked(reason) = register.submit(&auth)? {
        println!("  submit blocked: {reason:?}");
    }

    register.set_email("jan@example.cz");
    register.set_password_confirmation("secret");
    settle(&mut register, &clock);
    if register.submit(&auth)?.is_submitted() {
        println!("  registered");
    }
    register.teardown();

    // ── Login ───────────────────────────────────────────────────────────
    println!("login:");
    let mut login = LoginForm::mount(&config, clock.clone());
    type_into(&clock, "jan@example.cz", 80, |t| login.set_email(t));
    type_into(&clock, "secret", 80, |t| login.set_password(t));
    settle(&mut login, &clock);
    print_errors("email", login.email_errors());
    print_errors("password", login.password_errors());
    let Some(session) = login.submit(&auth)?.submitted() else {
        return Err("login was blocked".into());
    };
    println!("  logged in as {}", session.email);
    login.teardown();

    // ── Todos ───────────────────────────────────────────────────────────
    println!("todos:");
    let mut editor = TodoEditor::mount(&config, clock.clone(), None);
    for (name, description) in [
        ("Buy milk", "two litres"),
        ("Walk the dog", ""),
        ("Write report", "quarterly numbers"),
    ] {
        editor.set_name(name);
        if !description.is_empty() {
            editor.set_description(description);
        }
        settle(&mut editor, &clock);
        if let Some(item) = editor.submit(&todos)?.submitted() {
            println!("  created {} ({})", item.name, item.id);
        }
    }

    let items = todos.list()?;
    if let Some(first) = items.first() {
        todos.set_finished(first, true, chrono::Utc::now())?;
    }
    let items = todos.list()?;

    let mut filter = TodoFilter::new(&config, clock.clone());
    type_into(&clock, "report", 40, |t| filter.set_term(t));
    clock.advance(config.filter_debounce);
    filter.tick();
    for item in filter.apply(&items) {
        println!("  match '{}': {}", filter.term(), item.name);
    }
    filter.toggle_only_unfinished();
    filter.set_term("");
    clock.advance(config.filter_debounce);
    filter.tick();
    println!("  unfinished: {}", filter.apply(&items).len());
    editor.teardown();
    filter.teardown();

    auth.logout(&session)?;
    println!("logged out, session stored: {}", store.load()?.is_some());
    Ok(())
}
