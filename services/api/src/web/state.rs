//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::rate_limit::ClientRateLimiter;
use crate::web::token::TokenIssuer;
use component_forge_core::generation::ComponentGenerator;
use component_forge_core::ports::{DatabaseService, FileStorageService};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub files: Arc<dyn FileStorageService>,
    /// `None` when no completion-API key is configured.
    pub generator: Option<ComponentGenerator>,
    pub config: Arc<Config>,
    pub tokens: TokenIssuer,
    pub rate_limiter: ClientRateLimiter,
    pub started_at: Instant,
}

/// The identity established by `require_auth`, handed to every protected handler.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}
