//! services/api/src/web/rest.rs
//!
//! Contains the small standalone REST handlers (health, statistics) and the
//! master definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::state::{AppState, AuthUser};
use crate::web::{auth, files, generate, sessions};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::me_handler,
        auth::update_profile_handler,
        sessions::list_sessions_handler,
        sessions::create_session_handler,
        sessions::get_session_handler,
        sessions::update_session_handler,
        sessions::delete_session_handler,
        sessions::archive_session_handler,
        sessions::share_session_handler,
        sessions::shared_session_handler,
        generate::generate_handler,
        files::upload_handler,
        files::download_handler,
        stats_handler,
        health_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::UserSummary,
            auth::ProfileResponse,
            auth::ProfileUpdateRequest,
            sessions::SessionSummary,
            sessions::Pagination,
            sessions::SessionListResponse,
            sessions::CreateSessionRequest,
            sessions::UpdateSessionRequest,
            sessions::MessageResponse,
            sessions::ArchiveResponse,
            sessions::ShareResponse,
            sessions::SharedSessionView,
            generate::GenerateRequest,
            generate::PreviousCodeBody,
            generate::GenerateResponse,
            generate::ComponentCode,
            files::UploadResponse,
            files::DownloadRequest,
            StatsResponse,
            HealthResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Component Forge API", description = "Generate, preview and manage React components.")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub sessions: u64,
    pub messages: u64,
    pub components: u64,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server started.
    pub uptime: f64,
    pub environment: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Totals across the caller's sessions.
#[utoipa::path(
    get,
    path = "/api/user/stats",
    responses(
        (status = 200, description = "Usage statistics", body = StatsResponse),
        (status = 401, description = "Access token required")
    ),
    security(("bearer" = []))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.db.user_stats(auth.user_id).await?;
    Ok(Json(StatsResponse {
        sessions: stats.sessions,
        messages: stats.messages,
        components: stats.components,
    }))
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.config.environment.as_str().to_string(),
    })
}
