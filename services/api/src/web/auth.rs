//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login and the caller's profile.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::NaiveDate;
use component_forge_core::domain::{NewUser, Preferences, PreferencesPatch, ProfileUpdate, User};
use component_forge_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::{AppState, AuthUser};

const MIN_PASSWORD_LEN: usize = 6;
const MIN_NAME_LEN: usize = 2;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The public subset of a user returned alongside a fresh token.
#[derive(Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[schema(value_type = Object)]
    pub preferences: Preferences,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            preferences: user.preferences.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[schema(value_type = Object)]
    pub user: User,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<serde_json::Value>,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn is_reasonable_email(email: &str) -> bool {
    if email.len() < 5 || email.len() > 254 {
        return false;
    }
    let mut parts = email.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    parts.next().is_none()
        && !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn password_matches(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    state.tokens.issue(user.id, &user.email).map_err(|e| {
        error!("Failed to issue token: {}", e);
        ApiError::Internal("Failed to issue token".to_string())
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid input or duplicate email"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate the input
    let email = req.email.trim().to_lowercase();
    if !is_reasonable_email(&email) {
        return Err(ApiError::Validation("Please provide a valid email".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }
    let name = req.name.trim().to_string();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ApiError::Validation(
            "Name must be at least 2 characters long".to_string(),
        ));
    }
    let date_of_birth = match non_blank(req.date_of_birth) {
        Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            ApiError::Validation("Date of birth must be formatted as YYYY-MM-DD".to_string())
        })?),
        None => None,
    };

    // 2. Hash the password and persist the user
    let hashed_password = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(NewUser {
            email,
            hashed_password,
            name,
            phone: non_blank(req.phone).unwrap_or_default(),
            date_of_birth,
            preferences: Preferences::with_default_model(state.config.default_model.clone()),
        })
        .await
        .map_err(|e| match e {
            PortError::Conflict(message) => ApiError::Validation(message),
            other => ApiError::Port(other),
        })?;

    // 3. Issue the bearer token
    let token = issue_token(&state, &user)?;
    info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserSummary::from(&user),
            message: "User created successfully".to_string(),
        }),
    ))
}

/// POST /auth/login - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    // 1. Find the stored credentials
    let credentials = match state.db.get_credentials_by_email(&email).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => {
            warn!("Login attempt for unknown email");
            return Err(ApiError::Validation(INVALID_CREDENTIALS.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    // 2. Verify the password
    if !password_matches(&req.password, &credentials.hashed_password) {
        warn!("Login attempt with a wrong password for user {}", credentials.user_id);
        return Err(ApiError::Validation(INVALID_CREDENTIALS.to_string()));
    }

    // 3. Stamp the login and issue a token
    let user = state.db.record_login(credentials.user_id).await?;
    let token = issue_token(&state, &user)?;
    info!("User {} logged in", user.id);

    Ok(Json(AuthResponse {
        token,
        user: UserSummary::from(&user),
        message: "Login successful".to_string(),
    }))
}

/// GET /auth/me - The authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ProfileResponse),
        (status = 401, description = "Access token required"),
        (status = 403, description = "Invalid or expired token")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.db.get_user_by_id(auth.user_id).await?;
    Ok(Json(ProfileResponse {
        message: None,
        user,
    }))
}

/// PUT /auth/profile - Edit the authenticated user's profile
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid preferences"),
        (status = 401, description = "Access token required")
    ),
    security(("bearer" = []))
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let preferences = match req.preferences {
        Some(raw) => {
            let patch: PreferencesPatch = serde_json::from_value(raw)
                .map_err(|e| ApiError::Validation(format!("Invalid preferences: {}", e)))?;
            let mut current = state.db.get_user_by_id(auth.user_id).await?.preferences;
            current.apply(patch);
            Some(current)
        }
        None => None,
    };

    let name = non_blank(req.name);
    if name.as_ref().is_some_and(|n| n.chars().count() < MIN_NAME_LEN) {
        return Err(ApiError::Validation(
            "Name must be at least 2 characters long".to_string(),
        ));
    }

    let user = state
        .db
        .update_profile(
            auth.user_id,
            ProfileUpdate {
                name,
                phone: req.phone.map(|v| v.trim().to_string()),
                bio: req.bio.map(|v| v.trim().to_string()),
                location: req.location.map(|v| v.trim().to_string()),
                website: req.website.map(|v| v.trim().to_string()),
                avatar: req.avatar,
                preferences,
            },
        )
        .await?;
    info!("Updated profile of user {}", user.id);

    Ok(Json(ProfileResponse {
        message: Some("Profile updated successfully".to_string()),
        user,
    }))
}
