//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use component_forge_core::domain::{
    ComponentSnapshot, Message, NewUser, Preferences, ProfileUpdate, Session, SessionPage,
    SessionQuery, SessionStatus, SessionUpdate, User, UserCredentials, UserStats,
};
use component_forge_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Closes the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

const USER_COLUMNS: &str = "id, email, name, phone, date_of_birth, avatar, bio, location, \
                            website, preferences, created_at, last_login";

const SESSION_COLUMNS: &str = "id, user_id, title, description, status, is_shared, share_id, \
                               messages, current_component, tags, created_at, updated_at";

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn session_not_found() -> PortError {
    PortError::NotFound("Session not found".to_string())
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    name: String,
    phone: String,
    date_of_birth: Option<NaiveDate>,
    avatar: String,
    bio: String,
    location: String,
    website: String,
    preferences: Json<Preferences>,
    created_at: DateTime<Utc>,
    last_login: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            name: self.name,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            avatar: self.avatar,
            bio: self.bio,
            location: self.location,
            website: self.website,
            preferences: self.preferences.0,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    status: String,
    is_shared: bool,
    share_id: Option<String>,
    messages: Json<Vec<Message>>,
    current_component: Option<Json<ComponentSnapshot>>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> Session {
        let status = self.status.parse().unwrap_or_else(|e| {
            warn!("Session {} has {}; treating it as active", self.id, e);
            SessionStatus::Active
        });
        Session {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            status,
            is_shared: self.is_shared,
            share_id: self.share_id,
            messages: self.messages.0,
            current_component: self.current_component.map(|json| json.0),
            tags: self.tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct StatsRecord {
    sessions: i64,
    messages: i64,
    components: i64,
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, name, phone, date_of_birth, preferences) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(&user.name)
            .bind(&user.phone)
            .bind(user.date_of_birth)
            .bind(Json(&user.preferences))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    PortError::Conflict("User already exists with this email".to_string())
                }
                other => unexpected(other),
            })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CredentialsRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("No user with email {}", email)))
    }

    async fn record_login(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET last_login = now() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                phone = COALESCE($3, phone), \
                bio = COALESCE($4, bio), \
                location = COALESCE($5, location), \
                website = COALESCE($6, website), \
                avatar = COALESCE($7, avatar), \
                preferences = COALESCE($8, preferences) \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(update.name)
            .bind(update.phone)
            .bind(update.bio)
            .bind(update.location)
            .bind(update.website)
            .bind(update.avatar)
            .bind(update.preferences.map(Json))
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))
    }

    async fn user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let record = sqlx::query_as::<_, StatsRecord>(
            "SELECT \
                COUNT(*) AS sessions, \
                COALESCE(SUM(jsonb_array_length(messages)), 0)::BIGINT AS messages, \
                COUNT(*) FILTER (WHERE COALESCE(current_component->>'jsx', '') <> '' \
                                    OR COALESCE(current_component->>'tsx', '') <> '') AS components \
             FROM sessions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(UserStats {
            sessions: record.sessions.max(0) as u64,
            messages: record.messages.max(0) as u64,
            components: record.components.max(0) as u64,
        })
    }

    async fn list_sessions(&self, user_id: Uuid, query: &SessionQuery) -> PortResult<SessionPage> {
        const FILTER: &str = "user_id = $1 AND status = $2 \
                              AND ($3::TEXT IS NULL OR title ILIKE $3 OR description ILIKE $3)";
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let count_sql = format!("SELECT COUNT(*) FROM sessions WHERE {}", FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(user_id)
            .bind(query.status.as_str())
            .bind(pattern.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;

        let sql = format!(
            "SELECT {} FROM sessions WHERE {} ORDER BY updated_at DESC OFFSET $4 LIMIT $5",
            SESSION_COLUMNS, FILTER
        );
        let records = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(user_id)
            .bind(query.status.as_str())
            .bind(pattern.as_deref())
            .bind(i64::try_from(query.skip).unwrap_or(i64::MAX))
            .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(SessionPage {
            sessions: records.into_iter().map(SessionRecord::to_domain).collect(),
            total: total.max(0) as u64,
        })
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
    ) -> PortResult<Session> {
        let sql = format!(
            "INSERT INTO sessions (id, user_id, title, description) VALUES ($1, $2, $3, $4) RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(title)
            .bind(description)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<Session> {
        let sql = format!(
            "SELECT {} FROM sessions WHERE id = $1 AND user_id = $2",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(SessionRecord::to_domain)
            .ok_or_else(session_not_found)
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        update: SessionUpdate,
    ) -> PortResult<Session> {
        let sql = format!(
            "UPDATE sessions SET \
                messages = COALESCE($3, messages), \
                current_component = COALESCE($4, current_component), \
                title = COALESCE($5, title), \
                description = COALESCE($6, description), \
                tags = COALESCE($7, tags), \
                status = COALESCE($8, status), \
                updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .bind(user_id)
            .bind(update.messages.map(Json))
            .bind(update.current_component.map(Json))
            .bind(update.title)
            .bind(update.description)
            .bind(update.tags)
            .bind(update.status.map(SessionStatus::as_str))
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(SessionRecord::to_domain)
            .ok_or_else(session_not_found)
    }

    async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(session_not_found());
        }
        Ok(())
    }

    async fn set_session_status(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        status: SessionStatus,
    ) -> PortResult<Session> {
        let sql = format!(
            "UPDATE sessions SET status = $3, updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(SessionRecord::to_domain)
            .ok_or_else(session_not_found)
    }

    async fn share_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        share_token: &str,
    ) -> PortResult<Session> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "UPDATE sessions SET is_shared = TRUE, share_id = $3, updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .bind(user_id)
            .bind(share_token)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(session_not_found)?;

        sqlx::query("INSERT INTO session_shares (token, session_id) VALUES ($1, $2)")
            .bind(share_token)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_shared_session(&self, share_token: &str) -> PortResult<Session> {
        let sql = format!(
            "SELECT {} FROM sessions \
             WHERE id = (SELECT session_id FROM session_shares WHERE token = $1) AND is_shared",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(share_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(SessionRecord::to_domain)
            .ok_or_else(|| PortError::NotFound("Shared session not found".to_string()))
    }

    async fn append_generation(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        turns: Vec<Message>,
        snapshot: ComponentSnapshot,
    ) -> PortResult<Session> {
        let sql = format!(
            "UPDATE sessions SET messages = messages || $3, \
             current_component = jsonb_set($4::jsonb, '{{version}}', \
                 to_jsonb(COALESCE((current_component->>'version')::int, 0) + 1)), \
             updated_at = now() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(session_id)
            .bind(user_id)
            .bind(Json(turns))
            .bind(Json(snapshot))
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(SessionRecord::to_domain)
            .ok_or_else(session_not_found)
    }
}
