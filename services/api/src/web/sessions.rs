//! services/api/src/web/sessions.rs
//!
//! CRUD endpoints over a user's sessions, plus archiving and share links.
//! Every call is scoped to the authenticated user.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use component_forge_core::domain::{
    ComponentSnapshot, Message, Session, SessionQuery, SessionStatus, SessionUpdate,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::{AppState, AuthUser};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;
const LAST_MESSAGE_PREVIEW: usize = 100;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSessionsParams {
    /// 1-based page number.
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    /// `active` (default) or `archived`.
    pub status: Option<String>,
}

/// A session as shown in listings: no message bodies, just counts and a teaser.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[schema(value_type = String)]
    pub status: SessionStatus,
    pub is_shared: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub last_message: String,
    pub has_code: bool,
}

impl From<Session> for SessionSummary {
    fn from(session: Session) -> Self {
        let last_message = match session.messages.last() {
            Some(message) => format!(
                "{}...",
                message.content.chars().take(LAST_MESSAGE_PREVIEW).collect::<String>()
            ),
            None => "No messages yet".to_string(),
        };
        let has_code = session
            .messages
            .iter()
            .any(|m| m.component_code.as_ref().is_some_and(|code| code.has_code()));
        Self {
            id: session.id,
            title: session.title,
            description: session.description,
            status: session.status,
            is_shared: session.is_shared,
            tags: session.tags,
            created_at: session.created_at,
            updated_at: session.updated_at,
            message_count: session.messages.len(),
            last_message,
            has_code,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: u64,
    /// Number of pages.
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
    pub total_items: u64,
}

impl Pagination {
    fn new(page: u64, limit: u64, skip: u64, returned: u64, total_items: u64) -> Self {
        Self {
            current: page,
            total: total_items.div_ceil(limit),
            has_next: skip + returned < total_items,
            has_prev: page > 1,
            total_items,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub pagination: Pagination,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    #[schema(value_type = Option<Vec<Object>>)]
    pub messages: Option<Vec<Message>>,
    #[schema(value_type = Option<Object>)]
    pub current_component: Option<ComponentSnapshot>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    #[schema(value_type = Option<String>)]
    pub status: Option<SessionStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ArchiveResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub session: Session,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub message: String,
    pub share_url: String,
    #[schema(value_type = Object)]
    pub session: Session,
}

/// What an anonymous visitor of a share link gets to see.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedSessionView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<Message>,
    #[schema(value_type = Option<Object>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_component: Option<ComponentSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SharedSessionView {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            title: session.title,
            description: session.description,
            messages: session.messages,
            current_component: session.current_component,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// 16 random bytes, hex encoded.
fn new_share_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn session_query(params: ListSessionsParams) -> Result<(u64, SessionQuery), ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let status = match params.status.as_deref() {
        None | Some("") => SessionStatus::Active,
        Some(raw) => raw.parse().map_err(ApiError::Validation)?,
    };
    let query = SessionQuery {
        status,
        search: params.search.filter(|s| !s.trim().is_empty()),
        skip: (page - 1).saturating_mul(limit),
        limit,
    };
    Ok((page, query))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's sessions, newest activity first.
#[utoipa::path(
    get,
    path = "/api/sessions",
    params(ListSessionsParams),
    responses(
        (status = 200, description = "A page of sessions", body = SessionListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Access token required")
    ),
    security(("bearer" = []))
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListSessionsParams>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let (page, query) = session_query(params)?;
    let result = state.db.list_sessions(auth.user_id, &query).await?;

    let returned = result.sessions.len() as u64;
    let pagination = Pagination::new(page, query.limit, query.skip, returned, result.total);

    Ok(Json(SessionListResponse {
        sessions: result.sessions.into_iter().map(SessionSummary::from).collect(),
        pagination,
    }))
}

/// Start an empty session.
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created"),
        (status = 401, description = "Access token required")
    ),
    security(("bearer" = []))
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // The body is optional; an empty one means "all defaults".
    let req: CreateSessionRequest = if body.is_empty() {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::Validation(e.to_string()))?
    };
    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("New Session {}", Utc::now().format("%-m/%-d/%Y")));
    let description = req.description.unwrap_or_default().trim().to_string();

    let session = state
        .db
        .create_session(auth.user_id, &title, &description)
        .await?;
    info!("Created session {} for user {}", session.id, auth.user_id);

    Ok((StatusCode::CREATED, Json(session)))
}

/// Fetch one session with its full message history.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "The session"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    let session = state.db.get_session(auth.user_id, session_id).await?;
    Ok(Json(session))
}

/// Overwrite the supplied fields of a session. Last write wins.
#[utoipa::path(
    put,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "The updated session"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<Session>, ApiError> {
    let update = SessionUpdate {
        messages: req.messages,
        current_component: req.current_component,
        title: req
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        description: req.description.map(|d| d.trim().to_string()),
        tags: req.tags,
        status: req.status,
    };
    let session = state
        .db
        .update_session(auth.user_id, session_id, update)
        .await?;
    Ok(Json(session))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted", body = MessageResponse),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_session(auth.user_id, session_id).await?;
    info!("Deleted session {} of user {}", session_id, auth.user_id);
    Ok(Json(MessageResponse {
        message: "Session deleted successfully".to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}/archive",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session archived", body = ArchiveResponse),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn archive_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ArchiveResponse>, ApiError> {
    let session = state
        .db
        .set_session_status(auth.user_id, session_id, SessionStatus::Archived)
        .await?;
    Ok(Json(ArchiveResponse {
        message: "Session archived successfully".to_string(),
        session,
    }))
}

/// Issue a new share link. Earlier links for the same session stay valid.
#[utoipa::path(
    put,
    path = "/api/sessions/{id}/share",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Share link issued", body = ShareResponse),
        (status = 404, description = "Session not found")
    ),
    security(("bearer" = []))
)]
pub async fn share_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ShareResponse>, ApiError> {
    let token = new_share_token();
    let session = state
        .db
        .share_session(auth.user_id, session_id, &token)
        .await?;
    info!("Shared session {}", session_id);

    Ok(Json(ShareResponse {
        message: "Session shared successfully".to_string(),
        share_url: format!("{}/shared/{}", state.config.frontend_url, token),
        session,
    }))
}

/// Resolve a share token. No authentication.
#[utoipa::path(
    get,
    path = "/api/shared/{token}",
    params(("token" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "The shared session", body = SharedSessionView),
        (status = 404, description = "Shared session not found")
    )
)]
pub async fn shared_session_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<SharedSessionView>, ApiError> {
    let session = state.db.get_shared_session(&token).await?;
    Ok(Json(SharedSessionView::from(session)))
}
