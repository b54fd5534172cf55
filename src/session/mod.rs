//! Host sessions
//!
//! Each session the host starts gets its own websocket connection and its
//! own [`SessionHandler`]; nothing but the [`Assistant`] services is shared
//! between sessions.

mod handler;
pub mod protocol;
mod registry;
pub mod transport;

use std::sync::Arc;

pub use handler::{Assistant, SessionHandler};
pub use protocol::{BatteryStatus, SessionEvent};
pub use registry::{SessionRegistry, SessionSlot};
pub use transport::{HostCredentials, HostDisplay};

/// Starts and stops sessions on behalf of the webhook
#[derive(Clone)]
pub struct SessionLauncher {
    assistant: Arc<Assistant>,
    credentials: HostCredentials,
    registry: SessionRegistry,
}

impl SessionLauncher {
    /// Create a launcher with an empty registry
    #[must_use]
    pub fn new(assistant: Arc<Assistant>, credentials: HostCredentials) -> Self {
        Self {
            assistant,
            credentials,
            registry: SessionRegistry::new(),
        }
    }

    /// Registry of running sessions
    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Register a session and connect to it in the background
    ///
    /// Returns as soon as the session is registered; connection failures
    /// are logged and the registration is dropped.
    pub async fn start(&self, session_id: String, user_id: String, websocket_url: String) {
        let slot = self.registry.register(&session_id).await;
        let launcher = self.clone();

        tracing::info!(%session_id, %user_id, "starting session");

        tokio::spawn(async move {
            let connected = transport::connect(
                &websocket_url,
                &launcher.credentials,
                &session_id,
                slot.token.clone(),
            )
            .await;

            match connected {
                Ok((display, events)) => {
                    let handler = SessionHandler::new(
                        session_id.clone(),
                        Arc::clone(&launcher.assistant),
                        Arc::new(display),
                    );
                    handler.run(events, slot.token.clone()).await;
                }
                Err(e) => {
                    tracing::error!(%session_id, error = %e, "failed to connect session");
                }
            }

            slot.token.cancel();
            launcher.registry.remove(&session_id, slot.generation).await;
        });
    }

    /// Stop a running session
    ///
    /// Returns false if the id is unknown.
    pub async fn stop(&self, session_id: &str) -> bool {
        let stopped = self.registry.stop(session_id).await;
        if stopped {
            tracing::info!(session_id, "stopping session");
        }
        stopped
    }
}
