//! crates/component_forge_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{
    ComponentSnapshot, Message, NewUser, ProfileUpdate, Session, SessionPage, SessionQuery,
    SessionStatus, SessionUpdate, User, UserCredentials, UserStats,
};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Upstream request timed out")]
    Timeout,
    #[error("Upstream rejected the configured credential")]
    UpstreamAuth,
    #[error("Upstream rate limit exceeded")]
    RateLimited,
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence of users and sessions. Every session operation is scoped by the
/// owner's id; a session owned by someone else behaves exactly like a missing one.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn record_login(&self, user_id: Uuid) -> PortResult<User>;

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User>;

    async fn user_stats(&self, user_id: Uuid) -> PortResult<UserStats>;

    // --- Sessions ---
    async fn list_sessions(&self, user_id: Uuid, query: &SessionQuery) -> PortResult<SessionPage>;

    async fn create_session(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
    ) -> PortResult<Session>;

    async fn get_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<Session>;

    async fn update_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        update: SessionUpdate,
    ) -> PortResult<Session>;

    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()>;

    async fn set_session_status(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        status: SessionStatus,
    ) -> PortResult<Session>;

    /// Records a new share token for the session and marks it shared.
    async fn share_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        share_token: &str,
    ) -> PortResult<Session>;

    /// Resolves any token previously issued by `share_session`.
    async fn get_shared_session(&self, share_token: &str) -> PortResult<Session>;

    /// Appends the turns of one generation and replaces the current snapshot.
    ///
    /// The stored snapshot's version is one past the session's current version,
    /// assigned atomically with the append; `snapshot.version` is overwritten.
    async fn append_generation(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        turns: Vec<Message>,
        snapshot: ComponentSnapshot,
    ) -> PortResult<Session>;
}

/// A single chat-style request to an external completion API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
}

/// The raw reply of the completion API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: Option<u32>,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends one request and returns the text of the first choice.
    ///
    /// Implementations map transport failures and timeouts to `PortError::Timeout`,
    /// a rejected credential to `PortError::UpstreamAuth`, throttling to
    /// `PortError::RateLimited` and anything else to `PortError::Upstream`.
    async fn complete(&self, request: CompletionRequest) -> PortResult<Completion>;
}

/// A file written by a `FileStorageService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub size: u64,
}

#[async_trait]
pub trait FileStorageService: Send + Sync {
    /// Persists the bytes under a unique name derived from `original_name`.
    async fn store(&self, original_name: &str, bytes: &[u8]) -> PortResult<StoredFile>;
}
