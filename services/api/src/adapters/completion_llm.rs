//! Chat-completion adapter for an OpenRouter-compatible endpoint.
//!
//! The request body is built with `async-openai`'s typed builders and posted with
//! `reqwest`, so the HTTP status of a failure is available for mapping.

use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use component_forge_core::ports::{
    Completion, CompletionRequest, CompletionService, PortError, PortResult,
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, warn};

const APP_TITLE: &str = "AI Component Generator";
const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;

pub struct OpenRouterCompletionAdapter {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    referer: String,
}

impl OpenRouterCompletionAdapter {
    pub fn new(
        api_key: String,
        api_base: &str,
        referer: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            referer,
        })
    }

    fn build_request(&self, request: CompletionRequest) -> PortResult<CreateChatCompletionRequest> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(request.user)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(request.model)
            .messages(messages)
            .max_tokens(MAX_TOKENS)
            .temperature(TEMPERATURE)
            .top_p(TOP_P)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

// Only the fields we read; providers attach plenty of extras.
#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: Option<u32>,
}

fn map_transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() || e.is_connect() {
        PortError::Timeout
    } else {
        PortError::Upstream(e.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> PortError {
    match status {
        StatusCode::UNAUTHORIZED => PortError::UpstreamAuth,
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => PortError::Timeout,
        other => PortError::Upstream(format!("{}: {}", other, body)),
    }
}

#[async_trait]
impl CompletionService for OpenRouterCompletionAdapter {
    async fn complete(&self, request: CompletionRequest) -> PortResult<Completion> {
        let body = self.build_request(request)?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Completion API returned {}", status);
            return Err(map_status(status, &text));
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            error!("Unreadable completion reply: {}", e);
            PortError::Upstream(e.to_string())
        })?;

        let text = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PortError::Upstream("No completion returned".to_string()))?;

        Ok(Completion {
            text,
            total_tokens: reply.usage.and_then(|usage| usage.total_tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_port_errors() {
        assert!(matches!(map_status(StatusCode::UNAUTHORIZED, ""), PortError::UpstreamAuth));
        assert!(matches!(map_status(StatusCode::TOO_MANY_REQUESTS, ""), PortError::RateLimited));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, "down"),
            PortError::Upstream(msg) if msg.contains("down")
        ));
    }

    #[test]
    fn request_carries_sampling_parameters() {
        let adapter = OpenRouterCompletionAdapter::new(
            "key".into(),
            "https://example.test/api/v1/",
            "http://localhost:3000".into(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(adapter.endpoint, "https://example.test/api/v1/chat/completions");

        let body = adapter
            .build_request(CompletionRequest {
                model: "some/model".into(),
                system: "sys".into(),
                user: "make a button".into(),
            })
            .unwrap();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "some/model");
        assert_eq!(json["max_tokens"], 4000);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "make a button");
    }

    #[test]
    fn reply_without_usage_parses() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#)
                .unwrap();
        assert!(reply.usage.is_none());
        assert_eq!(reply.choices[0].message.content.as_deref(), Some("hi"));
    }
}
