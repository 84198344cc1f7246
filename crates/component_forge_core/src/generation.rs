//! crates/component_forge_core/src/generation.rs
//!
//! Orchestrates a single generation turn: validate the request, compose the chat
//! request, call the completion port once, and normalize the reply.

use crate::codegen::{normalize, system_prompt, user_prompt, NormalizedComponent, PreviousCode};
use crate::domain::{Attachment, ComponentSnapshot, Dialect, GenerationMetadata, Message, Role};
use crate::ports::{CompletionRequest, CompletionService, PortError, PortResult};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Everything a caller supplies for one turn.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub previous: Option<PreviousCode>,
    pub model: String,
    pub dialect: Dialect,
    pub attachments: Vec<Attachment>,
}

impl GenerationRequest {
    /// Rejects empty or whitespace-only prompts.
    pub fn validate(&self) -> PortResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(PortError::Validation("Prompt is required".to_string()));
        }
        Ok(())
    }

    fn to_completion_request(&self) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system: system_prompt(self.dialect),
            user: user_prompt(
                &self.prompt,
                &self.attachments,
                self.previous.as_ref(),
                self.dialect,
            ),
        }
    }
}

/// The normalized component of a turn and how it was produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub component: NormalizedComponent,
    pub metadata: GenerationMetadata,
}

impl GenerationOutcome {
    /// The snapshot a session should hold after this turn. It carries the first
    /// version; the session store renumbers it when appending.
    pub fn snapshot(&self) -> ComponentSnapshot {
        ComponentSnapshot {
            code: self.component.code.clone(),
            language: self.metadata.language,
            version: 1,
        }
    }

    /// The user turn and the assistant turn to append to a session.
    pub fn conversation_turns(&self, request: &GenerationRequest) -> Vec<Message> {
        let now = Utc::now();
        vec![
            Message {
                role: Role::User,
                content: request.prompt.clone(),
                timestamp: now,
                attachments: request.attachments.clone(),
                component_code: None,
                metadata: None,
            },
            Message {
                role: Role::Assistant,
                content: self.component.explanation.clone(),
                timestamp: now,
                attachments: Vec::new(),
                component_code: Some(self.component.code.clone()),
                metadata: Some(self.metadata.clone()),
            },
        ]
    }
}

/// Generates components through a `CompletionService`.
#[derive(Clone)]
pub struct ComponentGenerator {
    completion: Arc<dyn CompletionService>,
}

impl ComponentGenerator {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Runs one turn. Upstream errors are returned unchanged; the reply itself
    /// never causes an error because normalization always degrades gracefully.
    pub async fn generate(&self, request: &GenerationRequest) -> PortResult<GenerationOutcome> {
        request.validate()?;

        let started = Instant::now();
        info!(model = %request.model, language = %request.dialect, "Generating component");

        let completion = self
            .completion
            .complete(request.to_completion_request())
            .await?;
        let component = normalize(&completion.text, request.dialect);

        let metadata = GenerationMetadata {
            model: request.model.clone(),
            language: request.dialect,
            processing_time: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            tokens: completion.total_tokens,
        };
        info!(
            processing_time_ms = metadata.processing_time,
            tokens = ?metadata.tokens,
            "Component generated"
        );

        Ok(GenerationOutcome {
            component,
            metadata,
        })
    }
}
