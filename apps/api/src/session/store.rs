use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{SessionError, SessionStore};
use crate::models::session::SessionState;

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

/// Sessions stored as JSON strings with a TTL that is refreshed on every save.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: MultiplexedConnection,
    ttl_secs: u64,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn, ttl_secs })
    }

    fn session_key(id: Uuid) -> String {
        format!("session:{id}")
    }

    fn link_key(key: &str) -> String {
        format!("session-link:{key}")
    }

    fn event_key(event_id: &str) -> String {
        format!("event:{event_id}")
    }

    async fn set_with_ttl(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, SessionError> {
        match self.get(&Self::session_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, id: Uuid, state: &SessionState) -> Result<(), SessionError> {
        let payload = serde_json::to_string(state)?;
        self.set_with_ttl(&Self::session_key(id), &payload).await?;
        debug!("Saved session {id} ({} bytes)", payload.len());
        Ok(())
    }

    async fn link(&self, key: &str, id: Uuid) -> Result<(), SessionError> {
        self.set_with_ttl(&Self::link_key(key), &id.to_string()).await
    }

    async fn resolve(&self, key: &str) -> Result<Option<Uuid>, SessionError> {
        Ok(self
            .get(&Self::link_key(key))
            .await?
            .and_then(|raw| Uuid::parse_str(&raw).ok()))
    }

    async fn claim_event(&self, event_id: &str) -> Result<bool, SessionError> {
        let mut conn = self.conn.clone();
        // SET NX answers nil when the key already exists.
        let claimed = redis::cmd("SET")
            .arg(Self::event_key(event_id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(claimed.is_some())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

type Stamped<T> = (Instant, T);

/// Process-local store used when no Redis URL is configured, and in tests.
/// Sessions, links and processed event ids share one TTL; expired entries
/// are swept on every write.
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Stamped<SessionState>>>,
    links: RwLock<HashMap<String, Stamped<Uuid>>>,
    events: RwLock<HashMap<String, Instant>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
            links: RwLock::new(HashMap::new()),
            events: RwLock::new(HashMap::new()),
        }
    }

    fn live(&self, saved_at: &Instant) -> bool {
        saved_at.elapsed() <= self.ttl
    }

    #[cfg(test)]
    async fn sizes(&self) -> (usize, usize, usize) {
        (
            self.sessions.read().await.len(),
            self.links.read().await.len(),
            self.events.read().await.len(),
        )
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, SessionError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&id)
            .filter(|(saved_at, _)| self.live(saved_at))
            .map(|(_, state)| state.clone()))
    }

    async fn save(&self, id: Uuid, state: &SessionState) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (saved_at, _)| self.live(saved_at));
        sessions.insert(id, (Instant::now(), state.clone()));
        Ok(())
    }

    async fn link(&self, key: &str, id: Uuid) -> Result<(), SessionError> {
        let mut links = self.links.write().await;
        links.retain(|_, (saved_at, _)| self.live(saved_at));
        links.insert(key.to_string(), (Instant::now(), id));
        Ok(())
    }

    async fn resolve(&self, key: &str) -> Result<Option<Uuid>, SessionError> {
        Ok(self
            .links
            .read()
            .await
            .get(key)
            .filter(|(saved_at, _)| self.live(saved_at))
            .map(|(_, id)| *id))
    }

    async fn claim_event(&self, event_id: &str) -> Result<bool, SessionError> {
        let mut events = self.events.write().await;
        events.retain(|_, seen_at| self.live(seen_at));
        if events.contains_key(event_id) {
            return Ok(false);
        }
        events.insert(event_id.to_string(), Instant::now());
        Ok(true)
    }
}
