//! services/api/src/web/generate.rs
//!
//! The generation endpoint: one prompt in, one normalized code bundle out.

use axum::{extract::State, Extension, Json};
use component_forge_core::codegen::PreviousCode;
use component_forge_core::domain::{Attachment, Dialect, GenerationMetadata};
use component_forge_core::generation::GenerationRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::{AppState, AuthUser};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema, Default)]
#[serde(default)]
pub struct PreviousCodeBody {
    pub jsx: String,
    pub tsx: String,
    pub css: String,
}

impl From<PreviousCodeBody> for PreviousCode {
    fn from(body: PreviousCodeBody) -> Self {
        PreviousCode {
            jsx: body.jsx,
            tsx: body.tsx,
            css: body.css,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    pub previous_code: Option<PreviousCodeBody>,
    /// Defaults to the caller's preferred model.
    pub model: Option<String>,
    /// `jsx` or `tsx`; defaults to the caller's preferred language.
    pub language: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub attachments: Vec<Attachment>,
    /// When set, the turn is appended to this session.
    pub session_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct ComponentCode {
    pub jsx: String,
    pub tsx: String,
    pub css: String,
    pub preview: String,
    pub description: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// The explanation that accompanied the code.
    pub response: String,
    pub component_code: ComponentCode,
    #[schema(value_type = Object)]
    pub metadata: GenerationMetadata,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

//=========================================================================================
// Handler
//=========================================================================================

/// Generate a React component from a prompt.
#[utoipa::path(
    post,
    path = "/api/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Component generated", body = GenerateResponse),
        (status = 400, description = "Prompt is required"),
        (status = 401, description = "Invalid OpenRouter API key"),
        (status = 404, description = "Session not found"),
        (status = 408, description = "Upstream timeout"),
        (status = 429, description = "Upstream rate limit"),
        (status = 500, description = "Generation failed or API key not configured")
    ),
    security(("bearer" = []))
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    // 1. Reject empty prompts before anything else
    if req.prompt.trim().is_empty() {
        return Err(ApiError::Validation("Prompt is required".to_string()));
    }

    let generator = state.generator.as_ref().ok_or_else(|| {
        error!("Generation requested but no completion API key is configured");
        ApiError::Configuration("OpenRouter API key not configured".to_string())
    })?;

    // 2. Fill model and language from the caller's preferences when omitted
    let mut model = non_blank(req.model);
    let mut language = match non_blank(req.language) {
        Some(raw) => Some(raw.parse::<Dialect>().map_err(ApiError::Validation)?),
        None => None,
    };
    if model.is_none() || language.is_none() {
        let preferences = state.db.get_user_by_id(auth.user_id).await?.preferences;
        model.get_or_insert(preferences.default_model);
        language.get_or_insert(preferences.default_language);
    }
    let model = model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.default_model.clone());
    let dialect = language.unwrap_or_default();

    // 3. The target session must belong to the caller; checked before going upstream
    if let Some(session_id) = req.session_id {
        state.db.get_session(auth.user_id, session_id).await?;
    }

    // 4. Generate
    let request = GenerationRequest {
        prompt: req.prompt,
        previous: req.previous_code.map(PreviousCode::from),
        model,
        dialect,
        attachments: req.attachments,
    };
    let outcome = generator.generate(&request).await.map_err(|e| {
        error!("Component generation failed: {}", e);
        ApiError::from_generation(e, state.config.environment.is_development())
    })?;

    // 5. Persist the turn; the store assigns the next version
    if let Some(session_id) = req.session_id {
        let session = state
            .db
            .append_generation(
                auth.user_id,
                session_id,
                outcome.conversation_turns(&request),
                outcome.snapshot(),
            )
            .await?;
        let version = session.current_component.map_or(0, |c| c.version);
        info!("Appended generation to session {} (version {})", session_id, version);
    }

    let component = outcome.component;
    Ok(Json(GenerateResponse {
        response: component.explanation,
        component_code: ComponentCode {
            jsx: component.code.jsx,
            tsx: component.code.tsx,
            css: component.code.css,
            preview: component.code.preview,
            description: component.description,
        },
        metadata: outcome.metadata,
    }))
}
