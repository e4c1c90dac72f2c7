//! Request envelope, user record and upload inputs.
//!
//! # Design
//! The backend's payloads are loose maps whose shape depends on `run`. Only
//! `run` and `session_id` mean anything to this crate, so those two are
//! typed and every other field rides along in a `serde_json::Map`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::is_truthy;

/// One call to the API: a `run` discriminator such as `"post.list"`, an
/// optional session credential, and whatever fields the action takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub run: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Request {
    pub fn new(run: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            session_id: None,
            fields: Map::new(),
        }
    }

    /// Build a request from a caller's field map. A `run` key in the map is
    /// overridden; a string `session_id` key is lifted into the typed slot.
    pub fn from_fields(run: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove("run");
        let session_id = fields.remove("session_id").and_then(session_text);
        Self {
            run: run.into(),
            session_id,
            fields,
        }
    }

    /// Add one field. `run` and `session_id` go to their typed slots so the
    /// body never carries them twice; a non-string `session_id` is dropped.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match key {
            "run" => {
                if let Value::String(run) = value {
                    self.run = run;
                }
            }
            "session_id" => self.session_id = session_text(value),
            _ => {
                self.fields.insert(key.to_string(), value);
            }
        }
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Copy of this request with `session_id` filled from `current` when the
    /// caller did not set one. An explicit session id always wins.
    pub fn with_default_session(&self, current: Option<String>) -> Self {
        let mut request = self.clone();
        if request.session_id.is_none() {
            request.session_id = current.filter(|s| !s.is_empty());
        }
        request
    }

    /// True when the caller asked for the request to be logged in full.
    pub fn is_debug(&self) -> bool {
        self.fields.get("debug").is_some_and(is_truthy)
    }
}

/// Only a string is a session id. Anything else counts as not given.
fn session_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// The authenticated user's record as returned by the backend. Kept as a
/// raw map so a save/load cycle returns exactly what the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(pub Map<String, Value>);

impl User {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field rendered as a string. Numbers are accepted because the backend
    /// is not consistent about quoting ids.
    pub fn text(&self, field: &str) -> Option<String> {
        value_as_text(self.0.get(field)?)
    }

    pub fn idx(&self) -> Option<String> {
        self.text("idx")
    }

    pub fn session_id(&self) -> Option<String> {
        self.text("session_id")
    }

    pub fn nickname(&self) -> Option<String> {
        self.text("nickname")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for User {
    fn from(map: Map<String, Value>) -> Self {
        User(map)
    }
}

pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Which call produced a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserAction {
    Register,
    Login,
    Logout,
    Profile,
    ProfileUpdate,
    PasswordChange,
    ForgotPassword,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::Register => "register",
            UserAction::Login => "login",
            UserAction::Logout => "logout",
            UserAction::Profile => "profile",
            UserAction::ProfileUpdate => "profile-update",
            UserAction::PasswordChange => "password-change",
            UserAction::ForgotPassword => "forgot-password",
        }
    }
}

/// Published on every session write. `user` is `None` after a logout.
#[derive(Debug, Clone, PartialEq)]
pub struct UserEvent {
    pub action: UserAction,
    pub user: Option<User>,
}

/// Optional fields sent along with an uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCreateOptions {
    pub taxonomy: Option<String>,
    pub relation: Option<String>,
    pub code: Option<String>,
    pub session_id: Option<String>,
}

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: "application/octet-stream".to_string(),
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self::new(name, bytes))
    }
}
