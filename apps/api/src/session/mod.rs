//! Server-held session state keyed by a client-chosen session id.
//!
//! Handlers load the state at the start of a request and save it at the end.
//! There is no locking across requests: the last writer wins.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::session::SessionState;

pub mod extract;
pub mod handlers;
pub mod store;

pub use extract::SessionId;
pub use store::{InMemorySessionStore, RedisSessionStore};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt session payload: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persistence backend for session state.
///
/// Carried in `AppState` as `Arc<dyn SessionStore>`. Besides sessions it keeps
/// links from payment-provider identifiers (customer or subscription ids) to
/// the session that owns them, so cancellation webhooks can find their session,
/// and the ids of processed webhook events so redeliveries are skipped.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<SessionState>, SessionError>;

    async fn save(&self, id: Uuid, state: &SessionState) -> Result<(), SessionError>;

    async fn link(&self, key: &str, id: Uuid) -> Result<(), SessionError>;

    async fn resolve(&self, key: &str) -> Result<Option<Uuid>, SessionError>;

    /// Records a payment-provider event id. `false` when it was already seen
    /// within the TTL.
    async fn claim_event(&self, event_id: &str) -> Result<bool, SessionError>;

    /// Loads a session, starting a fresh one for ids the store has not seen.
    async fn load_or_default(&self, id: Uuid) -> Result<SessionState, SessionError> {
        Ok(self.load(id).await?.unwrap_or_default())
    }
}
