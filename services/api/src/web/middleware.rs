//! services/api/src/web/middleware.rs
//!
//! Authentication and throttling middleware for the API routes.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use component_forge_core::ports::PortError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::state::{AppState, AuthUser};

/// Middleware that validates the bearer token and resolves the user.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to use.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))?;

    // 2. Check signature and expiry
    let claims = state.tokens.verify(token).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        ApiError::Forbidden("Invalid or expired token".to_string())
    })?;

    // 3. The account must still exist
    let user = state.db.get_user_by_id(claims.sub).await.map_err(|e| match e {
        PortError::NotFound(_) => ApiError::Forbidden("User not found".to_string()),
        other => ApiError::Port(other),
    })?;

    req.extensions_mut().insert(AuthUser {
        user_id: user.id,
        email: user.email,
    });

    Ok(next.run(req).await)
}

/// Middleware that rejects clients exceeding their request quota.
///
/// Requests without connection info (e.g. in-process tests) share one bucket.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if state.rate_limiter.check_key(&ip).is_err() {
        warn!("Rate limit exceeded for {}", ip);
        return Err(ApiError::TooManyRequests);
    }

    Ok(next.run(req).await)
}
