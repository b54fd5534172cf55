//! Active session tracking
//!
//! Maps host session ids to the cancellation token of their handler. A
//! session is registered before its connection is opened and removed once
//! the handler exits.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Handle returned when a session is registered
#[derive(Debug, Clone)]
pub struct SessionSlot {
    /// Distinguishes this registration from a later one under the same id
    pub generation: u64,
    /// Cancelled when the session is stopped or replaced
    pub token: CancellationToken,
}

/// Registry of running sessions
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionSlot>>>,
    next_generation: Arc<AtomicU64>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, cancelling any session already using the id
    pub async fn register(&self, session_id: &str) -> SessionSlot {
        let slot = SessionSlot {
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        };

        let replaced = self
            .sessions
            .write()
            .await
            .insert(session_id.to_string(), slot.clone());

        if let Some(old) = replaced {
            tracing::info!(session_id, "replacing existing session");
            old.token.cancel();
        }

        slot
    }

    /// Cancel and forget a session
    ///
    /// Returns false if the id is unknown.
    pub async fn stop(&self, session_id: &str) -> bool {
        match self.sessions.write().await.remove(session_id) {
            Some(slot) => {
                slot.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget a session once its handler has exited
    ///
    /// Does nothing if the id has since been taken by a newer registration.
    pub async fn remove(&self, session_id: &str, generation: u64) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(session_id)
            .is_some_and(|slot| slot.generation == generation)
        {
            sessions.remove(session_id);
        }
    }

    /// Cancel every session
    pub async fn stop_all(&self) {
        let mut sessions = self.sessions.write().await;
        for (_, slot) in sessions.drain() {
            slot.token.cancel();
        }
    }

    /// Number of running sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is running
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
