#![forbid(unsafe_code)]

//! Collaborators the forms submit to.
//!
//! Forms never reach for a global client or storage: they receive an
//! [`AuthService`] or [`TodoService`] at submit time, and those services
//! read the current [`Session`] from an injected [`SessionStore`].
//!
//! The in-memory implementations behave like the REST backend (same
//! routes, headers and JSON bodies, recorded as [`ApiCall`]s) so form
//! behaviour can be tested without a network.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `ServiceError::Unauthorized` | No stored session, bad credentials | Nothing changes |
//! | `ServiceError::NotFound` | Unknown todo id | Nothing changes |
//! | `ServiceError::Rejected` | Backend refused the request | Nothing changes |
//! | `ServiceError::Storage` | Session record unreadable | Store left as is |

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ApiRoutes;
use crate::model::{Credentials, NewTodo, Registration, Session, TodoItem, TodoUpdate};

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors reported by collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Missing or invalid session, or wrong credentials.
    Unauthorized,
    /// The addressed resource does not exist.
    NotFound(String),
    /// The backend refused the request.
    Rejected(String),
    /// The request did not reach the backend.
    Transport(String),
    /// The stored session record could not be read or written.
    Storage(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Rejected(msg) => write!(f, "rejected: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Storage(msg) => write!(f, "session storage error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Result type for collaborator calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Account operations.
pub trait AuthService: Send + Sync {
    /// Exchange credentials for a session, storing it on success.
    fn login(&self, credentials: &Credentials) -> ServiceResult<Session>;

    /// Create an account.
    fn register(&self, registration: &Registration) -> ServiceResult<()>;

    /// End `session` and forget the stored record.
    fn logout(&self, session: &Session) -> ServiceResult<()>;
}

/// Todo CRUD for the logged-in user.
pub trait TodoService: Send + Sync {
    /// Every task of the current user.
    fn list(&self) -> ServiceResult<Vec<TodoItem>>;

    /// One task by id.
    fn get(&self, id: &str) -> ServiceResult<TodoItem>;

    /// Create a task.
    fn create(&self, todo: &NewTodo) -> ServiceResult<TodoItem>;

    /// Replace the editable fields of a task.
    fn update(&self, todo: &TodoUpdate) -> ServiceResult<TodoItem>;

    /// Delete a task.
    fn delete(&self, id: &str) -> ServiceResult<()>;

    /// Mark `item` done at `now`, or not done.
    fn set_finished(&self, item: &TodoItem, done: bool, now: DateTime<Utc>) -> ServiceResult<TodoItem> {
        let mut update = TodoUpdate::from(item);
        update.finished_at = done.then_some(now);
        self.update(&update)
    }
}

/// Where the logged-in user's session lives between requests.
pub trait SessionStore: Send + Sync {
    /// The stored session, if any.
    fn load(&self) -> ServiceResult<Option<Session>>;

    /// Store `session`, replacing any previous one.
    fn save(&self, session: &Session) -> ServiceResult<()>;

    /// Forget the stored session.
    fn clear(&self) -> ServiceResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Headers
// ─────────────────────────────────────────────────────────────────────────────

/// Headers sent with every request.
#[must_use]
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        ("Content-type".to_string(), "application/json".to_string()),
        ("crossDomain".to_string(), "true".to_string()),
    ]
}

/// Default headers plus the bearer and refresh tokens of `session`.
///
/// Without a session, or with either token empty, the defaults are returned
/// unchanged.
#[must_use]
pub fn auth_headers(session: Option<&Session>) -> Vec<(String, String)> {
    let mut headers = default_headers();
    if let Some(session) = session
        && !session.access_token.is_empty()
        && !session.refresh_token.is_empty()
    {
        headers.push((
            "Authorization".to_string(),
            format!("Bearer {}", session.access_token),
        ));
        headers.push(("x-refresh".to_string(), session.refresh_token.clone()));
    }
    headers
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Session Store
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps the session as a JSON string under a storage key.
#[derive(Debug)]
pub struct MemorySessionStore {
    key: String,
    data: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    /// Empty store using `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: RwLock::new(HashMap::new()),
        }
    }

    /// The storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The raw stored JSON.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.key)
            .cloned()
    }

    /// Overwrite the raw stored JSON.
    pub fn set_raw(&self, json: impl Into<String>) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.key.clone(), json.into());
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> ServiceResult<Option<Session>> {
        match self.raw() {
            None => Ok(None),
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        }
    }

    fn save(&self, session: &Session) -> ServiceResult<()> {
        let json = serde_json::to_string(session)?;
        self.set_raw(json);
        Ok(())
    }

    fn clear(&self) -> ServiceResult<()> {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request log
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A request as the REST backend would have received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<String>,
}

impl ApiCall {
    /// Value of header `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header(&self.headers, name)
    }
}

#[derive(Debug, Default)]
struct CallLog {
    calls: Mutex<Vec<ApiCall>>,
}

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<ApiCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record<B: Serialize>(
        &self,
        method: Method,
        url: String,
        headers: Vec<(String, String)>,
        body: Option<&B>,
    ) -> ServiceResult<()> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        self.lock().push(ApiCall {
            method,
            url,
            headers,
            body,
        });
        Ok(())
    }

    fn snapshot(&self) -> Vec<ApiCall> {
        self.lock().clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory auth
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Account {
    name: String,
    password: String,
}

/// Account backend kept in memory.
pub struct InMemoryAuth {
    routes: ApiRoutes,
    sessions: Arc<dyn SessionStore>,
    accounts: Mutex<HashMap<String, Account>>,
    issued: Mutex<u64>,
    log: CallLog,
}

impl fmt::Debug for InMemoryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryAuth")
            .field("routes", &self.routes)
            .field("accounts", &self.lock_accounts().len())
            .finish()
    }
}

impl InMemoryAuth {
    /// Empty backend storing sessions in `sessions`.
    #[must_use]
    pub fn new(routes: ApiRoutes, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            routes,
            sessions,
            accounts: Mutex::new(HashMap::new()),
            issued: Mutex::new(0),
            log: CallLog::default(),
        }
    }

    fn lock_accounts(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Display name of the account registered under `email`.
    #[must_use]
    pub fn account_name(&self, email: &str) -> Option<String> {
        self.lock_accounts().get(email).map(|a| a.name.clone())
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.log.snapshot()
    }
}

impl AuthService for InMemoryAuth {
    fn login(&self, credentials: &Credentials) -> ServiceResult<Session> {
        self.log.record(
            Method::Post,
            self.routes.sessions(),
            default_headers(),
            Some(credentials),
        )?;
        let matches = self
            .lock_accounts()
            .get(&credentials.email)
            .is_some_and(|account| account.password == credentials.password);
        if !matches {
            return Err(ServiceError::Unauthorized);
        }

        let n = {
            let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
            *issued += 1;
            *issued
        };
        let session = Session {
            email: credentials.email.clone(),
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
        };
        self.sessions.save(&session)?;
        Ok(session)
    }

    fn register(&self, registration: &Registration) -> ServiceResult<()> {
        self.log.record(
            Method::Post,
            self.routes.users(),
            default_headers(),
            Some(registration),
        )?;
        if registration.password != registration.password_confirmation {
            return Err(ServiceError::Rejected("passwords do not match".into()));
        }
        let mut accounts = self.lock_accounts();
        if accounts.contains_key(&registration.email) {
            return Err(ServiceError::Rejected(format!(
                "{} is already registered",
                registration.email
            )));
        }
        accounts.insert(
            registration.email.clone(),
            Account {
                name: registration.name.clone(),
                password: registration.password.clone(),
            },
        );
        Ok(())
    }

    fn logout(&self, session: &Session) -> ServiceResult<()> {
        self.log.record::<()>(
            Method::Delete,
            self.routes.sessions(),
            auth_headers(Some(session)),
            None,
        )?;
        self.sessions.clear()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory todos
// ─────────────────────────────────────────────────────────────────────────────

/// Todo backend kept in memory, scoped to the stored session's user.
pub struct InMemoryTodos {
    routes: ApiRoutes,
    sessions: Arc<dyn SessionStore>,
    items: Mutex<Vec<TodoItem>>,
    next_id: Mutex<u64>,
    now: fn() -> DateTime<Utc>,
    log: CallLog,
}

impl fmt::Debug for InMemoryTodos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTodos")
            .field("routes", &self.routes)
            .field("items", &self.lock_items().len())
            .finish()
    }
}

impl InMemoryTodos {
    /// Empty backend reading the session from `sessions`.
    #[must_use]
    pub fn new(routes: ApiRoutes, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            routes,
            sessions,
            items: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
            now: Utc::now,
            log: CallLog::default(),
        }
    }

    /// Use `now` for `createdAt` / `updatedAt` stamps.
    #[must_use]
    pub fn with_time_source(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<TodoItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.log.snapshot()
    }

    /// Record the call and return the authorised user's email.
    fn authorize<B: Serialize>(&self, method: Method, url: String, body: Option<&B>) -> ServiceResult<String> {
        let session = self.sessions.load()?;
        let headers = auth_headers(session.as_ref());
        let bearer = header(&headers, "Authorization").is_some();
        self.log.record(method, url, headers, body)?;
        match session {
            Some(session) if bearer => Ok(session.email),
            _ => Err(ServiceError::Unauthorized),
        }
    }
}

impl TodoService for InMemoryTodos {
    fn list(&self) -> ServiceResult<Vec<TodoItem>> {
        let user = self.authorize::<()>(Method::Get, self.routes.todos(), None)?;
        Ok(self
            .lock_items()
            .iter()
            .filter(|item| item.user == user)
            .cloned()
            .collect())
    }

    fn get(&self, id: &str) -> ServiceResult<TodoItem> {
        let user = self.authorize::<()>(Method::Get, self.routes.todo(id), None)?;
        self.lock_items()
            .iter()
            .find(|item| item.id == id && item.user == user)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    fn create(&self, todo: &NewTodo) -> ServiceResult<TodoItem> {
        let user = self.authorize(Method::Post, self.routes.todos(), Some(todo))?;
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
            let id = *next;
            *next += 1;
            id
        };
        let now = (self.now)();
        let item = TodoItem {
            id: format!("todo-{id}"),
            user,
            name: todo.name.clone(),
            description: todo.description.clone(),
            created_at: now,
            updated_at: now,
            finished_at: None,
            deadline: todo.deadline,
        };
        self.lock_items().push(item.clone());
        Ok(item)
    }

    fn update(&self, todo: &TodoUpdate) -> ServiceResult<TodoItem> {
        let user = self.authorize(Method::Put, self.routes.todo(&todo.id), Some(todo))?;
        let now = (self.now)();
        let mut items = self.lock_items();
        let item = items
            .iter_mut()
            .find(|item| item.id == todo.id && item.user == user)
            .ok_or_else(|| ServiceError::NotFound(todo.id.clone()))?;
        item.name = todo.name.clone();
        item.description = todo.description.clone();
        item.deadline = todo.deadline;
        item.finished_at = todo.finished_at;
        item.updated_at = now;
        Ok(item.clone())
    }

    fn delete(&self, id: &str) -> ServiceResult<()> {
        let user = self.authorize::<()>(Method::Delete, self.routes.todo(id), None)?;
        let mut items = self.lock_items();
        let before = items.len();
        items.retain(|item| !(item.id == id && item.user == user));
        if items.len() == before {
            return Err(ServiceError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
