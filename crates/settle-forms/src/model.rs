#![forbid(unsafe_code)]

//! Records exchanged with the REST API.
//!
//! Field names serialise in the API's camelCase; todo ids travel as `_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl TodoItem {
    /// Whether the task has been marked done.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

/// Body of an update request: the editable fields of an existing task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoUpdate {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&TodoItem> for TodoUpdate {
    fn from(item: &TodoItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            deadline: item.deadline,
            finished_at: item.finished_at,
        }
    }
}

/// Login request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// The stored record of a logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn todo_item_uses_api_field_names() {
        let item = TodoItem {
            id: "abc".into(),
            user: "u1".into(),
            name: "Buy milk".into(),
            description: None,
            created_at: at(8),
            updated_at: at(9),
            finished_at: None,
            deadline: Some(at(18)),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["_id"], "abc");
        assert_eq!(json["createdAt"], "2024-03-01T08:00:00Z");
        assert!(json.get("description").is_none());
        assert!(json.get("finishedAt").is_none());

        let back: TodoItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
        assert!(!back.is_finished());
    }

    #[test]
    fn session_is_camel_case() {
        let session = Session {
            email: "a@b.cz".into(),
            access_token: "acc".into(),
            refresh_token: "ref".into(),
        };
        assert_eq!(
            serde_json::to_string(&session).unwrap(),
            r#"{"email":"a@b.cz","accessToken":"acc","refreshToken":"ref"}"#
        );
    }

    #[test]
    fn update_from_item_keeps_finish_state() {
        let item = TodoItem {
            id: "1".into(),
            user: "u".into(),
            name: "n".into(),
            description: Some("d".into()),
            created_at: at(1),
            updated_at: at(1),
            finished_at: Some(at(2)),
            deadline: None,
        };
        let update = TodoUpdate::from(&item);
        assert_eq!(update.finished_at, Some(at(2)));
        assert_eq!(update.description.as_deref(), Some("d"));
    }

    #[test]
    fn registration_field_names() {
        let json = serde_json::to_value(Registration {
            name: "n".into(),
            email: "e".into(),
            password: "p".into(),
            password_confirmation: "p".into(),
        })
        .unwrap();
        assert_eq!(json["passwordConfirmation"], "p");
    }
}
