pub mod auth;
pub mod files;
pub mod generate;
pub mod middleware;
pub mod rate_limit;
pub mod rest;
pub mod sessions;
pub mod state;
pub mod token;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::error::ApiError;
use state::AppState;

pub use middleware::{rate_limit, require_auth};

/// Maximum accepted request body for every route except `/upload`.
pub const BODY_LIMIT: usize = 50 * 1024 * 1024;

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}

/// Builds the complete HTTP application: `/api` routes, uploaded files and the
/// cross-cutting layers.
pub fn app_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/shared/{token}", get(sessions::shared_session_handler))
        .route("/health", get(rest::health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/profile", put(auth::update_profile_handler))
        .route(
            "/sessions",
            get(sessions::list_sessions_handler).post(sessions::create_session_handler),
        )
        .route(
            "/sessions/{id}",
            get(sessions::get_session_handler)
                .put(sessions::update_session_handler)
                .delete(sessions::delete_session_handler),
        )
        .route("/sessions/{id}/archive", put(sessions::archive_session_handler))
        .route("/sessions/{id}/share", put(sessions::share_session_handler))
        .route("/generate", post(generate::generate_handler))
        .route(
            "/upload",
            post(files::upload_handler).layer(DefaultBodyLimit::max(files::UPLOAD_BODY_LIMIT)),
        )
        .route("/download", post(files::download_handler))
        .route("/user/stats", get(rest::stats_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit));

    let origin = HeaderValue::from_str(&state.config.frontend_url).map_err(|e| {
        ApiError::Internal(format!(
            "FRONTEND_URL '{}' is not a valid origin: {}",
            state.config.frontend_url, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    let uploads = ServeDir::new(&state.config.upload_dir);

    Ok(Router::new()
        .nest("/api", api_router)
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
