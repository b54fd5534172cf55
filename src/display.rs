//! Display output boundary
//!
//! Rendering happens on the glasses; the gateway only hands over text, a
//! duration, and a target view.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::Result;

/// Display surface on the glasses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    /// Foreground view
    #[default]
    Main,
    /// Glanceable dashboard view
    Dashboard,
}

/// How to show a piece of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    /// How long to keep the text up; `None` leaves it to the host
    pub duration: Option<Duration>,
    /// Target view
    pub view: ViewType,
}

impl DisplayOptions {
    /// Main view for a fixed duration
    #[must_use]
    pub const fn main_for(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            view: ViewType::Main,
        }
    }

    /// Duration in whole milliseconds, as the host protocol expects
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration.map(|d| d.as_millis() as u64)
    }
}

/// Accepts text for display
#[async_trait]
pub trait DisplaySink: Send + Sync {
    /// Show `text` on the glasses
    ///
    /// # Errors
    ///
    /// Returns error if the text could not be handed to the host
    async fn show_text(&self, text: &str, options: DisplayOptions) -> Result<()>;
}

/// Display sink that prints to stdout
///
/// Used by the `next`/`agenda`/`ask` CLI commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDisplay;

#[async_trait]
impl DisplaySink for ConsoleDisplay {
    async fn show_text(&self, text: &str, options: DisplayOptions) -> Result<()> {
        tracing::debug!(view = ?options.view, duration_ms = ?options.duration_ms(), "display");
        println!("{text}");
        Ok(())
    }
}

/// Display sink that only records what it was asked to show
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    shown: Arc<Mutex<Vec<(String, DisplayOptions)>>>,
}

impl RecordingDisplay {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything shown so far, oldest first
    pub async fn shown(&self) -> Vec<(String, DisplayOptions)> {
        self.shown.lock().await.clone()
    }

    /// Texts shown so far, oldest first
    pub async fn texts(&self) -> Vec<String> {
        self.shown
            .lock()
            .await
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl DisplaySink for RecordingDisplay {
    async fn show_text(&self, text: &str, options: DisplayOptions) -> Result<()> {
        tracing::info!(view = ?options.view, duration_ms = ?options.duration_ms(), "display: {text}");
        self.shown.lock().await.push((text.to_string(), options));
        Ok(())
    }
}
