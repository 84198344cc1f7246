mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use api_lib::web::files::{MAX_FILES, MAX_FILE_SIZE};
use common::{ScriptedCompletion, TestApp, COUNTER_REPLY};
use component_forge_core::ports::PortError;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

//=========================================================================================
// Infrastructure
//=========================================================================================

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.json(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["environment"], "test");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn unknown_routes_answer_json_404() {
    let app = TestApp::new().await;
    let (status, body) = app.json(Method::GET, "/api/nope", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = TestApp::new().await;
    let response = app
        .send(Request::get("/api/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
}

//=========================================================================================
// Authentication
//=========================================================================================

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new().await;
    let (_, user_id) = app.register("Ada@Example.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["preferences"]["defaultModel"], "test/default-model");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.json(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id.to_string());
    assert!(body["user"].get("hashedPassword").is_none());
}

#[tokio::test]
async fn registration_rejects_duplicates_and_bad_input() {
    let app = TestApp::new().await;
    app.register("ada@example.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "secret123", "name": "Ada" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists with this email");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "bob@example.com", "password": "123", "name": "Bob" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new().await;
    app.register("ada@example.com").await;

    let attempts = [("ada@example.com", "wrong-one"), ("ghost@example.com", "secret123")];
    for (email, password) in attempts {
        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email or password");
    }
}

#[tokio::test]
async fn bearer_gate_statuses() {
    let app = TestApp::new().await;

    let (status, body) = app.json(Method::GET, "/api/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Access token required");

    let (status, body) = app
        .json(Method::GET, "/api/sessions", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid or expired token");

    let (token, user_id) = app.register("gone@example.com").await;
    app.db.forget_user(user_id);
    let (status, body) = app.json(Method::GET, "/api/sessions", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn profile_edits_reject_unknown_preference_keys() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/auth/profile",
            Some(&token),
            Some(json!({ "bio": "Builds UIs", "preferences": { "theme": "dark" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["bio"], "Builds UIs");
    assert_eq!(body["user"]["preferences"]["theme"], "dark");
    assert_eq!(body["user"]["preferences"]["defaultLanguage"], "jsx");

    let (status, _) = app
        .json(
            Method::PUT,
            "/api/auth/profile",
            Some(&token),
            Some(json!({ "preferences": { "fontSize": 14 } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

//=========================================================================================
// Sessions
//=========================================================================================

#[tokio::test]
async fn sessions_are_invisible_to_other_users() {
    let app = TestApp::new().await;
    let (alice, _) = app.register("alice@example.com").await;
    let (bob, _) = app.register("bob@example.com").await;
    let session_id = app.create_session(&alice, "Alice's work").await;
    let uri = format!("/api/sessions/{}", session_id);

    let (status, body) = app.json(Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");
    assert!(body.get("title").is_none());

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&bob), Some(json!({ "title": "mine now" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.json(Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Alice's work");
}

#[tokio::test]
async fn blank_titles_get_a_dated_default() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let (status, body) = app
        .json(Method::POST, "/api/sessions", Some(&token), Some(json!({ "title": "  " })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["title"].as_str().unwrap().starts_with("New Session "));
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn pagination_reports_has_next() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;
    for title in ["One", "Two", "Three"] {
        app.create_session(&token, title).await;
    }

    let (status, body) = app
        .json(Method::GET, "/api/sessions?page=1&limit=2", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["hasNext"], true);
    assert_eq!(body["pagination"]["hasPrev"], false);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["totalItems"], 3);

    let (_, body) = app
        .json(Method::GET, "/api/sessions?page=2&limit=2", Some(&token), None)
        .await;
    assert_eq!(body["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["hasNext"], false);
    assert_eq!(body["pagination"]["hasPrev"], true);
    assert_eq!(body["sessions"][0]["lastMessage"], "No messages yet");
    assert_eq!(body["sessions"][0]["messageCount"], 0);
}

#[tokio::test]
async fn search_matches_title_case_insensitively() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;
    app.create_session(&token, "Pricing Table").await;
    app.create_session(&token, "Navbar").await;

    let (_, body) = app
        .json(Method::GET, "/api/sessions?search=pricing", Some(&token), None)
        .await;
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["title"], "Pricing Table");
}

#[tokio::test]
async fn archived_sessions_leave_the_active_list() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;
    let keep = app.create_session(&token, "Keep").await;
    let archive = app.create_session(&token, "Archive me").await;

    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/api/sessions/{}/archive", archive),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["status"], "archived");

    let (_, body) = app.json(Method::GET, "/api/sessions", Some(&token), None).await;
    let ids: Vec<&str> = body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [keep.to_string()]);

    let (_, body) = app
        .json(Method::GET, "/api/sessions?status=archived", Some(&token), None)
        .await;
    assert_eq!(body["sessions"][0]["id"], archive.to_string());
}

#[tokio::test]
async fn updates_apply_only_supplied_fields() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;
    let session_id = app.create_session(&token, "Original").await;
    let uri = format!("/api/sessions/{}", session_id);

    let (status, body) = app
        .json(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "title": "   ", "description": "  now described ", "tags": ["ui"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Original");
    assert_eq!(body["description"], "now described");
    assert_eq!(body["tags"], json!(["ui"]));

    let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Session deleted successfully");
    let (status, _) = app.json(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn every_share_token_resolves() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;
    let session_id = app.create_session(&token, "Shared work").await;
    let uri = format!("/api/sessions/{}/share", session_id);

    let (status, first) = app.json(Method::PUT, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app.json(Method::PUT, &uri, Some(&token), None).await;

    let first_url = first["shareUrl"].as_str().unwrap();
    let second_url = second["shareUrl"].as_str().unwrap();
    assert!(first_url.starts_with("http://localhost:3000/shared/"));
    assert_ne!(first_url, second_url);
    assert_eq!(second["session"]["isShared"], true);

    for url in [first_url, second_url] {
        let share_token = url.rsplit('/').next().unwrap();
        let (status, body) = app
            .json(Method::GET, &format!("/api/shared/{}", share_token), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], session_id.to_string());
        assert_eq!(body["title"], "Shared work");
    }

    let (status, _) = app
        .json(Method::GET, "/api/shared/does-not-exist", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//=========================================================================================
// Generation
//=========================================================================================

#[tokio::test]
async fn empty_prompt_never_reaches_upstream() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let (status, body) = app
        .json(Method::POST, "/api/generate", Some(&token), Some(json!({ "prompt": "" })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Prompt is required");
    assert_eq!(app.completion.calls(), 0);
}

#[tokio::test]
async fn counter_prompt_yields_both_dialects() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({ "prompt": "Create a counter button", "language": "jsx" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["componentCode"]["jsx"], "function C(){return null;}");
    let tsx = body["componentCode"]["tsx"].as_str().unwrap();
    assert!(tsx.contains("React.FC"));
    assert!(body["componentCode"]["preview"].as_str().unwrap().contains("<!DOCTYPE html>"));
    assert_eq!(body["response"], "Here is a simple counter button.");
    assert_eq!(body["metadata"]["model"], "test/default-model");
    assert_eq!(body["metadata"]["language"], "jsx");
    assert_eq!(body["metadata"]["tokens"], 128);

    assert_eq!(app.completion.calls(), 1);
    let sent = app.completion.last_request().unwrap();
    assert_eq!(sent.model, "test/default-model");
    assert!(sent.user.starts_with("Create a counter button"));
}

#[tokio::test]
async fn generation_turns_are_appended_to_the_session() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;
    let session_id = app.create_session(&token, "Counter").await;

    for expected_version in [1, 2] {
        let (status, _) = app
            .json(
                Method::POST,
                "/api/generate",
                Some(&token),
                Some(json!({
                    "prompt": "Create a counter button",
                    "model": "explicit/model",
                    "sessionId": session_id,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let session = app.db.session(session_id).unwrap();
        let snapshot = session.current_component.unwrap();
        assert_eq!(snapshot.version, expected_version);
        assert_eq!(snapshot.code.jsx, "function C(){return null;}");
    }

    let (_, body) = app
        .json(Method::GET, &format!("/api/sessions/{}", session_id), Some(&token), None)
        .await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["metadata"]["model"], "explicit/model");
    assert_eq!(body["currentComponent"]["version"], 2);

    let (_, stats) = app.json(Method::GET, "/api/user/stats", Some(&token), None).await;
    assert_eq!(stats, json!({ "sessions": 1, "messages": 4, "components": 1 }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_turns_get_distinct_versions() {
    let completion = ScriptedCompletion::replying_after(COUNTER_REPLY, Duration::from_millis(200));
    let app = Arc::new(TestApp::with_completion(completion).await);
    let (token, _) = app.register("ada@example.com").await;
    let session_id = app.create_session(&token, "Counter").await;

    let turns: Vec<_> = (0..2)
        .map(|_| {
            let app = app.clone();
            let token = token.clone();
            tokio::spawn(async move {
                app.json(
                    Method::POST,
                    "/api/generate",
                    Some(&token),
                    Some(json!({ "prompt": "Create a counter button", "sessionId": session_id })),
                )
                .await
                .0
            })
        })
        .collect();
    for turn in turns {
        assert_eq!(turn.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(app.completion.calls(), 2);

    let session = app.db.session(session_id).unwrap();
    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.current_component.unwrap().version, 2);
}

#[tokio::test]
async fn foreign_session_is_checked_before_upstream() {
    let app = TestApp::new().await;
    let (alice, _) = app.register("alice@example.com").await;
    let (bob, _) = app.register("bob@example.com").await;
    let session_id = app.create_session(&alice, "Alice's").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/api/generate",
            Some(&bob),
            Some(json!({ "prompt": "Make a card", "sessionId": session_id })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.completion.calls(), 0);
}

#[tokio::test]
async fn upstream_failures_map_to_statuses() {
    let cases: [(fn() -> PortError, StatusCode); 4] = [
        (|| PortError::Timeout, StatusCode::REQUEST_TIMEOUT),
        (|| PortError::UpstreamAuth, StatusCode::UNAUTHORIZED),
        (|| PortError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        (
            || PortError::Upstream("502 Bad Gateway".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (make_error, expected) in cases {
        let app = TestApp::with_completion(ScriptedCompletion::failing(make_error)).await;
        let (token, _) = app.register("ada@example.com").await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/generate",
                Some(&token),
                Some(json!({ "prompt": "Make a card" })),
            )
            .await;

        assert_eq!(status, expected);
        assert!(body["error"].is_string());
        // Details are only exposed in development.
        assert!(body.get("details").is_none());
    }
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_error() {
    let app = TestApp::without_api_key().await;
    let (token, _) = app.register("ada@example.com").await;

    let (status, body) = app
        .json(Method::POST, "/api/generate", Some(&token), Some(json!({ "prompt": "Make a card" })))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "OpenRouter API key not configured");

    let (status, _) = app
        .json(Method::POST, "/api/generate", Some(&token), Some(json!({ "prompt": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

//=========================================================================================
// Files
//=========================================================================================

fn multipart_request(token: &str, parts: &[(&str, &str, &str, &[u8])]) -> Request<Body> {
    let boundary = "forge-test-boundary";
    let mut body = Vec::new();
    for (field, file_name, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn uploads_are_stored_and_served() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let response = app
        .send(multipart_request(
            &token,
            &[("files", "mock up.png", "image/png", &b"not really a png"[..])],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    let file = &body["files"][0];
    assert_eq!(file["originalName"], "mock up.png");
    assert_eq!(file["mimetype"], "image/png");
    assert_eq!(file["size"], 16);
    let filename = file["filename"].as_str().unwrap();
    assert!(filename.ends_with("-mock_up.png"));
    assert_eq!(file["url"], format!("/uploads/{}", filename));

    let served = app
        .send(
            Request::get(file["url"].as_str().unwrap())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(served.status(), StatusCode::OK);
    let bytes = to_bytes(served.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"not really a png");
}

#[tokio::test]
async fn uploads_reject_disallowed_types_and_empty_requests() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let response = app
        .send(multipart_request(
            &token,
            &[("files", "payload.js", "text/javascript", &b"alert(1)"[..])],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid file type");

    let response = app.send(multipart_request(&token, &[])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No files uploaded");

    let six: Vec<(&str, &str, &str, &[u8])> =
        (0..6).map(|_| ("files", "a.txt", "text/plain", &b"x"[..])).collect();
    let response = app.send(multipart_request(&token, &six)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_accept_five_files_at_the_size_cap() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let at_cap = vec![b'x'; MAX_FILE_SIZE];
    let five: Vec<(&str, &str, &str, &[u8])> = (0..MAX_FILES)
        .map(|_| ("files", "a.txt", "text/plain", &at_cap[..]))
        .collect();
    let response = app.send(multipart_request(&token, &five)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), MAX_FILES);
    assert!(files.iter().all(|f| f["size"] == MAX_FILE_SIZE));
}

#[tokio::test]
async fn uploads_reject_a_file_over_the_size_cap() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let over_cap = vec![b'x'; MAX_FILE_SIZE + 1];
    let response = app
        .send(multipart_request(
            &token,
            &[("files", "big.txt", "text/plain", &over_cap[..])],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "File too large. Maximum size is 10MB");
}

#[tokio::test]
async fn download_returns_a_zip() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/download")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "jsx": "function Card(){}", "css": ".card{}", "filename": "My Card" })
                .to_string(),
        ))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"MyCard.zip\""
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(names, ["MyCard.css", "MyCard.jsx", "README.md", "package.json"]);
}

#[tokio::test]
async fn download_accepts_a_stylesheet_alone() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/download")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "css": ".x{}" }).to_string()))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    assert!(archive.file_names().any(|name| name == "component.css"));
}

#[tokio::test]
async fn download_without_code_is_rejected() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ada@example.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/download",
            Some(&token),
            Some(json!({ "jsx": "  ", "filename": "Empty" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No code to download");
}

#[tokio::test]
async fn tokens_for_random_users_are_refused() {
    let app = TestApp::new().await;
    let token = app.tokens.issue(Uuid::new_v4(), "nobody@example.com").unwrap();

    let (status, body) = app.json(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User not found");
}
