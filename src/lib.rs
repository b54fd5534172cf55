//! Glance Gateway - Calendar and conversation assistant for smart glasses
//!
//! The glasses host streams speech transcripts to this gateway over a
//! per-session websocket. Each finalized transcript is routed to one of
//! two capabilities and the answer is rendered back on the glasses:
//! - Calendar lookups (next event, today's agenda) from an iCalendar feed
//! - Sticky conversation mode backed by a Gemini language model
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Glasses host                        │
//! │   session webhook  │  transcription  │  display      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Glance Gateway                       │
//! │   API  │  Sessions  │  Intent router  │  Conversation│
//! └──────────┬─────────────────────────────┬────────────┘
//!            │                             │
//! ┌──────────▼──────────┐       ┌──────────▼────────────┐
//! │   Calendar feed     │       │   Gemini              │
//! │   (iCalendar/HTTP)  │       │   generateContent     │
//! └─────────────────────┘       └───────────────────────┘
//! ```

pub mod api;
pub mod calendar;
pub mod config;
pub mod conversation;
pub mod display;
pub mod error;
pub mod intent;
pub mod llm;
pub mod session;

pub use calendar::{CalendarEvent, CalendarService};
pub use config::Config;
pub use conversation::{ConversationController, ConversationState};
pub use display::{DisplayOptions, DisplaySink, ViewType};
pub use error::{Error, Result};
pub use intent::{Intent, IntentRouter, Utterance};
pub use llm::{GeminiClient, LanguageModel};
pub use session::{Assistant, SessionHandler, SessionLauncher};
