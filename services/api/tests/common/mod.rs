//! Shared fixtures for the HTTP integration tests: an in-memory database, a
//! scripted completion API and a helper that drives the real router.

#![allow(dead_code)]

use api_lib::config::{AppEnvironment, Config};
use api_lib::web::{
    app_router, rate_limit::new_client_rate_limiter, state::AppState, token::TokenIssuer,
};
use api_lib::adapters::LocalFileStore;
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use component_forge_core::domain::{
    ComponentSnapshot, Message, NewUser, ProfileUpdate, Session, SessionPage, SessionQuery,
    SessionStatus, SessionUpdate, User, UserCredentials, UserStats,
};
use component_forge_core::generation::ComponentGenerator;
use component_forge_core::ports::{
    Completion, CompletionRequest, CompletionService, DatabaseService, PortError, PortResult,
};
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

//=========================================================================================
// In-memory DatabaseService
//=========================================================================================

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, (User, String)>,
    sessions: HashMap<Uuid, Session>,
    shares: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct InMemoryDb {
    store: Mutex<Store>,
}

fn session_not_found() -> PortError {
    PortError::NotFound("Session not found".to_string())
}

impl InMemoryDb {
    /// Removes a user while leaving any issued tokens alive.
    pub fn forget_user(&self, user_id: Uuid) {
        self.store.lock().unwrap().users.remove(&user_id);
    }

    pub fn session(&self, session_id: Uuid) -> Option<Session> {
        self.store.lock().unwrap().sessions.get(&session_id).cloned()
    }

    fn with_owned_session<T>(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        f: impl FnOnce(&mut Session) -> T,
    ) -> PortResult<T> {
        let mut store = self.store.lock().unwrap();
        match store.sessions.get_mut(&session_id) {
            Some(session) if session.user_id == user_id => Ok(f(session)),
            _ => Err(session_not_found()),
        }
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        if store.users.values().any(|(u, _)| u.email == user.email) {
            return Err(PortError::Conflict("User already exists with this email".to_string()));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            phone: user.phone,
            date_of_birth: user.date_of_birth,
            avatar: String::new(),
            bio: String::new(),
            location: String::new(),
            website: String::new(),
            preferences: user.preferences,
            created_at: now,
            last_login: now,
        };
        store
            .users
            .insert(created.id, (created.clone(), user.hashed_password));
        Ok(created)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.store
            .lock()
            .unwrap()
            .users
            .get(&user_id)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.store
            .lock()
            .unwrap()
            .users
            .values()
            .find(|(user, _)| user.email == email)
            .map(|(user, hash)| UserCredentials {
                user_id: user.id,
                email: user.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(email.to_string()))
    }

    async fn record_login(&self, user_id: Uuid) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        let (user, _) = store
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        user.last_login = Utc::now();
        Ok(user.clone())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let mut store = self.store.lock().unwrap();
        let (user, _) = store
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(phone) = update.phone {
            user.phone = phone;
        }
        if let Some(bio) = update.bio {
            user.bio = bio;
        }
        if let Some(location) = update.location {
            user.location = location;
        }
        if let Some(website) = update.website {
            user.website = website;
        }
        if let Some(avatar) = update.avatar {
            user.avatar = avatar;
        }
        if let Some(preferences) = update.preferences {
            user.preferences = preferences;
        }
        Ok(user.clone())
    }

    async fn user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let store = self.store.lock().unwrap();
        let owned: Vec<&Session> = store
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .collect();
        Ok(UserStats {
            sessions: owned.len() as u64,
            messages: owned.iter().map(|s| s.messages.len() as u64).sum(),
            components: owned
                .iter()
                .filter(|s| s.current_component.as_ref().is_some_and(|c| c.code.has_code()))
                .count() as u64,
        })
    }

    async fn list_sessions(&self, user_id: Uuid, query: &SessionQuery) -> PortResult<SessionPage> {
        let store = self.store.lock().unwrap();
        let needle = query.search.as_ref().map(|s| s.to_lowercase());
        let mut matching: Vec<Session> = store
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.status == query.status)
            .filter(|s| match &needle {
                Some(n) => {
                    s.title.to_lowercase().contains(n) || s.description.to_lowercase().contains(n)
                }
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let total = matching.len() as u64;
        let sessions = matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .collect();
        Ok(SessionPage { sessions, total })
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
    ) -> PortResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            description: description.to_string(),
            status: SessionStatus::Active,
            is_shared: false,
            share_id: None,
            messages: Vec::new(),
            current_component: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.store
            .lock()
            .unwrap()
            .sessions
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<Session> {
        self.with_owned_session(user_id, session_id, |s| s.clone())
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        update: SessionUpdate,
    ) -> PortResult<Session> {
        self.with_owned_session(user_id, session_id, |s| {
            if let Some(messages) = update.messages {
                s.messages = messages;
            }
            if let Some(component) = update.current_component {
                s.current_component = Some(component);
            }
            if let Some(title) = update.title {
                s.title = title;
            }
            if let Some(description) = update.description {
                s.description = description;
            }
            if let Some(tags) = update.tags {
                s.tags = tags;
            }
            if let Some(status) = update.status {
                s.status = status;
            }
            s.updated_at = Utc::now();
            s.clone()
        })
    }

    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        let mut store = self.store.lock().unwrap();
        let owned = store
            .sessions
            .get(&session_id)
            .is_some_and(|s| s.user_id == user_id);
        if !owned {
            return Err(session_not_found());
        }
        store.sessions.remove(&session_id);
        store.shares.retain(|_, id| *id != session_id);
        Ok(())
    }

    async fn set_session_status(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        status: SessionStatus,
    ) -> PortResult<Session> {
        self.with_owned_session(user_id, session_id, |s| {
            s.status = status;
            s.updated_at = Utc::now();
            s.clone()
        })
    }

    async fn share_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        share_token: &str,
    ) -> PortResult<Session> {
        let session = self.with_owned_session(user_id, session_id, |s| {
            s.is_shared = true;
            s.share_id = Some(share_token.to_string());
            s.updated_at = Utc::now();
            s.clone()
        })?;
        self.store
            .lock()
            .unwrap()
            .shares
            .insert(share_token.to_string(), session_id);
        Ok(session)
    }

    async fn get_shared_session(&self, share_token: &str) -> PortResult<Session> {
        let store = self.store.lock().unwrap();
        store
            .shares
            .get(share_token)
            .and_then(|id| store.sessions.get(id))
            .filter(|s| s.is_shared)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Shared session not found".to_string()))
    }

    async fn append_generation(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        turns: Vec<Message>,
        mut snapshot: ComponentSnapshot,
    ) -> PortResult<Session> {
        self.with_owned_session(user_id, session_id, |s| {
            snapshot.version = s.next_component_version();
            s.messages.extend(turns);
            s.current_component = Some(snapshot);
            s.updated_at = Utc::now();
            s.clone()
        })
    }
}

//=========================================================================================
// Scripted CompletionService
//=========================================================================================

type Script = Box<dyn Fn() -> PortResult<Completion> + Send + Sync>;

pub struct ScriptedCompletion {
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::scripted(Box::new(move || {
            Ok(Completion {
                text: text.clone(),
                total_tokens: Some(128),
            })
        }))
    }

    /// Like `replying`, but every call takes `delay` before answering.
    pub fn replying_after(text: &str, delay: Duration) -> Arc<Self> {
        let text = text.to_string();
        Arc::new(Self {
            delay,
            ..Self::bare(Box::new(move || {
                Ok(Completion {
                    text: text.clone(),
                    total_tokens: Some(128),
                })
            }))
        })
    }

    pub fn failing(make_error: fn() -> PortError) -> Arc<Self> {
        Self::scripted(Box::new(move || Err(make_error())))
    }

    fn scripted(script: Script) -> Arc<Self> {
        Arc::new(Self::bare(script))
    }

    fn bare(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> PortResult<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.script)()
    }
}

//=========================================================================================
// Test application
//=========================================================================================

pub const COUNTER_REPLY: &str =
    "Here is a simple counter button.\n{\"jsx\":\"function C(){return null;}\"}";

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub completion: Arc<ScriptedCompletion>,
    pub tokens: TokenIssuer,
    _uploads: TempDir,
}

pub fn test_config(upload_dir: &std::path::Path) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        environment: AppEnvironment::Test,
        jwt_secret: JWT_SECRET.to_string(),
        token_ttl_days: 7,
        openrouter_api_key: Some("test-key".to_string()),
        completion_api_base: "http://127.0.0.1:9".to_string(),
        completion_timeout: Duration::from_secs(30),
        default_model: "test/default-model".to_string(),
        frontend_url: "http://localhost:3000".to_string(),
        upload_dir: upload_dir.to_path_buf(),
        rate_limit_max_requests: NonZeroU32::new(1000).unwrap(),
        rate_limit_window: Duration::from_secs(900),
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(ScriptedCompletion::replying(COUNTER_REPLY), true).await
    }

    pub async fn with_completion(completion: Arc<ScriptedCompletion>) -> Self {
        Self::build(completion, true).await
    }

    pub async fn without_api_key() -> Self {
        Self::build(ScriptedCompletion::replying(COUNTER_REPLY), false).await
    }

    async fn build(completion: Arc<ScriptedCompletion>, with_key: bool) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = test_config(uploads.path());
        if !with_key {
            config.openrouter_api_key = None;
        }
        let config = Arc::new(config);

        let db = Arc::new(InMemoryDb::default());
        let files = Arc::new(LocalFileStore::new(uploads.path()).await.unwrap());
        let generator = with_key.then(|| ComponentGenerator::new(completion.clone()));
        let tokens = TokenIssuer::new(JWT_SECRET, config.token_ttl_days);

        let state = Arc::new(AppState {
            db: db.clone(),
            files,
            generator,
            config: config.clone(),
            tokens: tokens.clone(),
            rate_limiter: new_client_rate_limiter(
                config.rate_limit_max_requests,
                config.rate_limit_window,
            ),
            started_at: Instant::now(),
        });

        Self {
            router: app_router(state).unwrap(),
            db,
            completion,
            tokens,
            _uploads: uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a JSON request and returns the status and the parsed body.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Registers a user and returns their bearer token and id.
    pub async fn register(&self, email: &str) -> (String, Uuid) {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": "secret123",
                    "name": "Test User"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let token = body["token"].as_str().unwrap().to_string();
        let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
        (token, id)
    }

    pub async fn create_session(&self, token: &str, title: &str) -> Uuid {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/sessions",
                Some(token),
                Some(serde_json::json!({ "title": title })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().parse().unwrap()
    }
}
