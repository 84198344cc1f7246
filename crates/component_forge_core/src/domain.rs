//! crates/component_forge_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! They are independent of any database driver; the serde derives describe the
//! JSON shape shared by the HTTP API and the document columns that store them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Enumerations
//=========================================================================================

/// The code flavour requested from and produced by a generation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Jsx,
    Tsx,
}

impl Dialect {
    /// The lowercase name, which doubles as the JSON key and file extension.
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Jsx => "jsx",
            Dialect::Tsx => "tsx",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsx" => Ok(Dialect::Jsx),
            "tsx" => Ok(Dialect::Tsx),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Lifecycle status of a session. Archiving is reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Archived,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Archived => "archived",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "archived" => Ok(SessionStatus::Archived),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

//=========================================================================================
// Users
//=========================================================================================

/// Recognized user preferences. Unknown keys are rejected on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Preferences {
    pub theme: Theme,
    pub default_model: String,
    pub default_language: Dialect,
    pub auto_save: bool,
}

impl Preferences {
    pub fn with_default_model(default_model: impl Into<String>) -> Self {
        Self {
            theme: Theme::Light,
            default_model: default_model.into(),
            default_language: Dialect::Jsx,
            auto_save: true,
        }
    }

    /// Applies the fields present in `patch`, leaving the others untouched.
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(model) = patch.default_model {
            self.default_model = model;
        }
        if let Some(language) = patch.default_language {
            self.default_language = language;
        }
        if let Some(auto_save) = patch.auto_save {
            self.auto_save = auto_save;
        }
    }
}

/// A partial preferences record, as accepted by profile edits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub default_model: Option<String>,
    pub default_language: Option<Dialect>,
    pub auto_save: Option<bool>,
}

/// Represents a user - used throughout the app. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub avatar: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

/// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Everything needed to persist a freshly registered user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub name: String,
    pub phone: String,
    pub date_of_birth: Option<NaiveDate>,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub sessions: u64,
    pub messages: u64,
    pub components: u64,
}

//=========================================================================================
// Code bundles and messages
//=========================================================================================

/// The four co-versioned artifacts produced by one generation turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeBundle {
    pub jsx: String,
    pub tsx: String,
    pub css: String,
    pub preview: String,
}

impl CodeBundle {
    pub fn has_code(&self) -> bool {
        !self.jsx.is_empty() || !self.tsx.is_empty()
    }
}

/// The latest code bundle of a session together with its dialect and version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSnapshot {
    #[serde(flatten)]
    pub code: CodeBundle,
    #[serde(default)]
    pub language: Dialect,
    #[serde(default = "first_version")]
    pub version: u32,
}

fn first_version() -> u32 {
    1
}

/// A reference to a previously uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub model: String,
    pub language: Dialect,
    /// Milliseconds spent waiting on the completion API and normalizing.
    pub processing_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
}

/// One turn in a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_code: Option<CodeBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GenerationMetadata>,
}

//=========================================================================================
// Sessions
//=========================================================================================

/// A persisted, user-owned conversation plus its latest component snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: SessionStatus,
    pub is_shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_component: Option<ComponentSnapshot>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// The version the next generated snapshot should carry.
    pub fn next_component_version(&self) -> u32 {
        self.current_component
            .as_ref()
            .map_or(1, |snapshot| snapshot.version.saturating_add(1))
    }
}

/// Filters for listing a user's sessions.
#[derive(Debug, Clone)]
pub struct SessionQuery {
    pub status: SessionStatus,
    pub search: Option<String>,
    pub skip: u64,
    pub limit: u64,
}

/// One page of sessions plus the number of sessions matching the filter.
#[derive(Debug, Clone)]
pub struct SessionPage {
    pub sessions: Vec<Session>,
    pub total: u64,
}

/// Partial update of a session. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub messages: Option<Vec<Message>>,
    pub current_component: Option<ComponentSnapshot>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<SessionStatus>,
}
