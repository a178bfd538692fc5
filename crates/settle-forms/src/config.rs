#![forbid(unsafe_code)]

//! Form configuration and API routes.
//!
//! Defaults match the shipped application; every value can be overridden
//! from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `SETTLE_TEXT_DEBOUNCE_MS` | `text_debounce` | 1000 |
//! | `SETTLE_FILTER_DEBOUNCE_MS` | `filter_debounce` | 150 |
//! | `SETTLE_API_URL` | `api_url` | `http://localhost:1337/api/` |
//! | `SETTLE_USER_STORAGE_KEY` | `user_storage_key` | `user` |

use std::fmt;
use std::time::Duration;

/// Environment variable for the form text debounce, in milliseconds.
pub const ENV_TEXT_DEBOUNCE_MS: &str = "SETTLE_TEXT_DEBOUNCE_MS";
/// Environment variable for the list filter debounce, in milliseconds.
pub const ENV_FILTER_DEBOUNCE_MS: &str = "SETTLE_FILTER_DEBOUNCE_MS";
/// Environment variable for the REST API base URL.
pub const ENV_API_URL: &str = "SETTLE_API_URL";
/// Environment variable for the session storage key.
pub const ENV_USER_STORAGE_KEY: &str = "SETTLE_USER_STORAGE_KEY";

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// An environment value that could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Not a whole number of milliseconds.
    InvalidDuration { var: &'static str, value: String },
    /// Not an `http://` or `https://` URL.
    InvalidUrl { var: &'static str, value: String },
    /// Empty where a value is required.
    Empty { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDuration { var, value } => {
                write!(f, "{var}: expected milliseconds, got {value:?}")
            }
            Self::InvalidUrl { var, value } => {
                write!(f, "{var}: expected an http(s) URL, got {value:?}")
            }
            Self::Empty { var } => write!(f, "{var}: must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ─────────────────────────────────────────────────────────────────────────────
// FormConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Delays and endpoints shared by every form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    /// Quiet period for free-text form fields.
    pub text_debounce: Duration,
    /// Quiet period for the todo list search term.
    pub filter_debounce: Duration,
    /// REST API base URL, always ending in `/`.
    pub api_url: String,
    /// Key the session record is stored under.
    pub user_storage_key: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            text_debounce: Duration::from_millis(1000),
            filter_debounce: Duration::from_millis(150),
            api_url: "http://localhost:1337/api/".to_string(),
            user_storage_key: "user".to_string(),
        }
    }
}

impl FormConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_TEXT_DEBOUNCE_MS) {
            config.text_debounce = parse_millis(ENV_TEXT_DEBOUNCE_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_FILTER_DEBOUNCE_MS) {
            config.filter_debounce = parse_millis(ENV_FILTER_DEBOUNCE_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_API_URL) {
            config.api_url = parse_url(ENV_API_URL, &value)?;
        }
        if let Some(value) = lookup(ENV_USER_STORAGE_KEY) {
            let key = value.trim();
            if key.is_empty() {
                return Err(ConfigError::Empty {
                    var: ENV_USER_STORAGE_KEY,
                });
            }
            config.user_storage_key = key.to_string();
        }
        Ok(config)
    }

    /// Endpoint URLs under [`api_url`](Self::api_url).
    #[must_use]
    pub fn routes(&self) -> ApiRoutes {
        ApiRoutes::new(&self.api_url)
    }
}

fn parse_millis(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidDuration {
            var,
            value: value.to_string(),
        })
}

fn parse_url(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let url = value.trim();
    let scheme_ok = ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme));
    if !scheme_ok {
        return Err(ConfigError::InvalidUrl {
            var,
            value: value.to_string(),
        });
    }
    Ok(with_trailing_slash(url))
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ApiRoutes
// ─────────────────────────────────────────────────────────────────────────────

/// Full endpoint URLs of the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    base: String,
}

impl ApiRoutes {
    /// Routes under `base`; a missing trailing slash is added.
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self {
            base: with_trailing_slash(base),
        }
    }

    /// Base URL.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Login (POST) and logout (DELETE).
    #[must_use]
    pub fn sessions(&self) -> String {
        format!("{}sessions", self.base)
    }

    /// Registration (POST).
    #[must_use]
    pub fn users(&self) -> String {
        format!("{}users", self.base)
    }

    /// Todo collection: list (GET) and create (POST).
    #[must_use]
    pub fn todos(&self) -> String {
        format!("{}todos", self.base)
    }

    /// A single todo: get, update (PUT) and delete.
    #[must_use]
    pub fn todo(&self, id: &str) -> String {
        format!("{}todos/{id}", self.base)
    }
}

impl Default for ApiRoutes {
    fn default() -> Self {
        FormConfig::default().routes()
    }
}
