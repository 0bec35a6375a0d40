//! Per-visitor session storage and the dashboard visit counter

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Session key holding the dashboard visit counter
pub const NUM_VISITS: &str = "num_visits";

/// Key/value storage scoped to a session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> AppResult<Option<Value>>;
    async fn set(&self, session_id: &str, key: &str, value: Value) -> AppResult<()>;
    /// Atomically add `delta` to an integer value (missing counts as 0), returning the result
    async fn incr(&self, session_id: &str, key: &str, delta: i64) -> AppResult<i64>;
}

struct MemorySession {
    values: HashMap<String, Value>,
    expires_at: Instant,
}

/// Sessions kept in process memory; lost on restart. Idle sessions expire after the TTL
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, MemorySession>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(u64::try_from(ttl_seconds).unwrap_or(0)),
        }
    }

    /// Live session for writing with its expiry pushed out. Starting a new session
    /// sweeps out the expired ones; an expired session comes back empty
    fn touch<'a>(
        &self,
        sessions: &'a mut HashMap<String, MemorySession>,
        session_id: &str,
    ) -> &'a mut HashMap<String, Value> {
        let now = Instant::now();
        if !sessions.contains_key(session_id) {
            sessions.retain(|_, s| s.expires_at > now);
        }
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| MemorySession {
                values: HashMap::new(),
                expires_at: now,
            });
        if session.expires_at <= now {
            session.values.clear();
        }
        session.expires_at = now + self.ttl;
        &mut session.values
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> AppResult<Option<Value>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|s| s.expires_at > Instant::now())
            .and_then(|s| s.values.get(key))
            .cloned())
    }

    async fn set(&self, session_id: &str, key: &str, value: Value) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        self.touch(&mut sessions, session_id)
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn incr(&self, session_id: &str, key: &str, delta: i64) -> AppResult<i64> {
        let mut sessions = self.sessions.write().await;
        let values = self.touch(&mut sessions, session_id);
        let next = values
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .saturating_add(delta);
        values.insert(key.to_string(), Value::from(next));
        Ok(next)
    }
}

/// Sessions stored as Redis hashes (`session:{id}`), expiring after the configured TTL
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Client,
    ttl_seconds: i64,
}

impl RedisSessionStore {
    /// Open the client and check the server answers
    pub async fn new(url: &str, ttl_seconds: i64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Unavailable(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Unavailable(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client, ttl_seconds })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Unavailable(format!("Failed to get Redis connection: {}", e)))
    }

    fn key(session_id: &str) -> String {
        format!("session:{}", session_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, session_id: &str, key: &str) -> AppResult<Option<Value>> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .hget(Self::key(session_id), key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read session from Redis: {}", e)))?;

        raw.map(|s| {
            serde_json::from_str(&s)
                .map_err(|e| AppError::Internal(format!("Corrupt session value for {}: {}", key, e)))
        })
        .transpose()
    }

    async fn set(&self, session_id: &str, key: &str, value: Value) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let redis_key = Self::key(session_id);

        conn.hset::<_, _, _, ()>(&redis_key, key, value.to_string())
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write session to Redis: {}", e)))?;
        conn.expire::<_, ()>(&redis_key, self.ttl_seconds)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to refresh session expiry: {}", e)))?;

        Ok(())
    }

    async fn incr(&self, session_id: &str, key: &str, delta: i64) -> AppResult<i64> {
        let mut conn = self.connection().await?;
        let redis_key = Self::key(session_id);

        let value: i64 = conn
            .hincr(&redis_key, key, delta)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to increment session value: {}", e)))?;
        conn.expire::<_, ()>(&redis_key, self.ttl_seconds)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to refresh session expiry: {}", e)))?;

        Ok(value)
    }
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Increment and persist the session's visit counter, returning the new value
    pub async fn record_visit(&self, session_id: &str) -> AppResult<i64> {
        self.store.incr(session_id, NUM_VISITS, 1).await
    }
}
