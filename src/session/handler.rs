//! Per-session event loop
//!
//! One handler owns one session's conversation state. It reacts to host
//! events, runs calendar lookups and model calls as background tasks, and
//! switches conversation mode off when its deadline passes.
//!
//! ```text
//! events ──▶ IntentRouter ──▶ calendar task ──────────────▶ display
//!                        └──▶ model task ──▶ turn outcome ─▶ history + display
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::protocol::SessionEvent;
use crate::Result;
use crate::calendar::CalendarService;
use crate::config::{Config, DisplayConfig};
use crate::conversation::{ConversationController, DEFAULT_TIMEOUT};
use crate::display::{DisplayOptions, DisplaySink};
use crate::intent::{Intent, IntentRouter, Utterance};
use crate::llm::{GeminiClient, LanguageModel};

/// Services shared by every session
pub struct Assistant {
    router: IntentRouter,
    calendar: CalendarService,
    model: Arc<dyn LanguageModel>,
    conversation_timeout: Duration,
    display: DisplayConfig,
    welcome_text: String,
}

impl Assistant {
    /// Create an assistant with default timing and no welcome text
    #[must_use]
    pub fn new(router: IntentRouter, calendar: CalendarService, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            router,
            calendar,
            model,
            conversation_timeout: DEFAULT_TIMEOUT,
            display: DisplayConfig::default(),
            welcome_text: String::new(),
        }
    }

    /// Build the assistant described by `config`
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let router = IntentRouter::new(config.assistant.wake_phrases.clone());
        let calendar = CalendarService::new(config.calendar.feed_url.clone(), config.calendar.timezone);
        let model = GeminiClient::new(config.llm.api_key.clone(), config.llm.model.clone())
            .with_base_url(config.llm.base_url.clone());

        Self::new(router, calendar, Arc::new(model))
            .with_conversation_timeout(config.assistant.conversation_timeout)
            .with_display(config.display)
            .with_welcome_text(config.assistant.welcome_text.clone())
    }

    /// Set the conversation idle timeout
    #[must_use]
    pub const fn with_conversation_timeout(mut self, timeout: Duration) -> Self {
        self.conversation_timeout = timeout;
        self
    }

    /// Set display durations
    #[must_use]
    pub const fn with_display(mut self, display: DisplayConfig) -> Self {
        self.display = display;
        self
    }

    /// Set the text shown when a session starts; empty disables it
    #[must_use]
    pub fn with_welcome_text(mut self, text: impl Into<String>) -> Self {
        self.welcome_text = text.into();
        self
    }

    /// Intent router
    #[must_use]
    pub const fn router(&self) -> &IntentRouter {
        &self.router
    }

    /// Calendar service
    #[must_use]
    pub const fn calendar(&self) -> &CalendarService {
        &self.calendar
    }

    /// Language model
    #[must_use]
    pub fn model(&self) -> Arc<dyn LanguageModel> {
        Arc::clone(&self.model)
    }
}

#[derive(Debug, Clone, Copy)]
enum CalendarQuery {
    NextEvent,
    TodayAgenda,
}

/// Result of a model call, fed back into the loop
struct TurnOutcome {
    result: Result<String>,
}

/// Event loop for one host session
pub struct SessionHandler {
    session_id: String,
    assistant: Arc<Assistant>,
    display: Arc<dyn DisplaySink>,
    conversation: ConversationController,
    tasks: JoinSet<()>,
    turn_tx: mpsc::Sender<TurnOutcome>,
    turn_rx: mpsc::Receiver<TurnOutcome>,
}

impl SessionHandler {
    /// Create a handler in the idle state
    #[must_use]
    pub fn new(session_id: impl Into<String>, assistant: Arc<Assistant>, display: Arc<dyn DisplaySink>) -> Self {
        let (turn_tx, turn_rx) = mpsc::channel(16);
        let conversation = ConversationController::new(assistant.conversation_timeout);

        Self {
            session_id: session_id.into(),
            assistant,
            display,
            conversation,
            tasks: JoinSet::new(),
            turn_tx,
            turn_rx,
        }
    }

    /// Process events until the stream ends or `cancel` fires
    ///
    /// In-flight calendar lookups and model calls are aborted on exit, so
    /// nothing reaches the display after the session is gone.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>, cancel: CancellationToken) {
        tracing::info!(session_id = %self.session_id, "session started");
        self.show_welcome();

        loop {
            let deadline = self.conversation.deadline();

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(session_id = %self.session_id, "session cancelled");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.handle_event(event);
                }
                Some(outcome) = self.turn_rx.recv() => self.finish_turn(outcome),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        tracing::error!(session_id = %self.session_id, error = %e, "session task panicked");
                    }
                }
                () = sleep_until(deadline) => {
                    self.conversation.expire_if_due(Instant::now());
                }
            }
        }

        self.conversation.end();
        self.tasks.shutdown().await;
        tracing::info!(session_id = %self.session_id, "session ended");
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transcription(utterance) => self.route(&utterance),
            SessionEvent::Battery(status) => tracing::info!(
                session_id = %self.session_id,
                level = ?status.level,
                charging = ?status.charging,
                "glasses battery"
            ),
        }
    }

    fn route(&mut self, utterance: &Utterance) {
        let now = Instant::now();
        let active = self.conversation.is_active(now);
        let intent = self.assistant.router.classify(utterance, active);

        if intent == Intent::NoOp {
            tracing::trace!(text = %utterance.text, is_final = utterance.is_final, "ignored");
            return;
        }

        tracing::info!(session_id = %self.session_id, ?intent, text = %utterance.text, "routing utterance");

        match intent {
            Intent::NextEvent => self.spawn_calendar(CalendarQuery::NextEvent),
            Intent::TodayAgenda => self.spawn_calendar(CalendarQuery::TodayAgenda),
            Intent::ConversationTurn => self.start_turn(&utterance.text, now),
            Intent::NoOp => {}
        }
    }

    fn spawn_calendar(&mut self, query: CalendarQuery) {
        let assistant = Arc::clone(&self.assistant);
        let display = Arc::clone(&self.display);
        let session_id = self.session_id.clone();

        self.tasks.spawn(async move {
            let result = match query {
                CalendarQuery::NextEvent => assistant.calendar.next_event_text().await,
                CalendarQuery::TodayAgenda => assistant.calendar.agenda_text().await,
            };

            let text = result.unwrap_or_else(|e| {
                tracing::warn!(%session_id, ?query, error = %e, "calendar lookup failed");
                e.fallback_message().to_string()
            });

            let options = DisplayOptions::main_for(assistant.display.calendar_duration);
            show(display.as_ref(), &session_id, &text, options).await;
        });
    }

    fn start_turn(&mut self, text: &str, now: Instant) {
        let prompt = self.conversation.begin_turn(text, now);
        let model = Arc::clone(&self.assistant.model);
        let tx = self.turn_tx.clone();

        self.tasks.spawn(async move {
            let result = model.generate(&prompt).await;
            // receiver only goes away with the session
            let _ = tx.send(TurnOutcome { result }).await;
        });
    }

    fn finish_turn(&mut self, outcome: TurnOutcome) {
        let text = match outcome.result {
            Ok(answer) => {
                self.conversation.record_reply(&answer);
                answer
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "conversation turn failed");
                e.fallback_message().to_string()
            }
        };

        let options = DisplayOptions::main_for(self.assistant.display.answer_duration);
        self.spawn_display(text, options);
    }

    fn show_welcome(&mut self) {
        if self.assistant.welcome_text.is_empty() {
            return;
        }
        let text = self.assistant.welcome_text.clone();
        self.spawn_display(text, DisplayOptions::main_for(self.assistant.display.calendar_duration));
    }

    fn spawn_display(&mut self, text: String, options: DisplayOptions) {
        let display = Arc::clone(&self.display);
        let session_id = self.session_id.clone();

        self.tasks.spawn(async move {
            show(display.as_ref(), &session_id, &text, options).await;
        });
    }
}

async fn show(display: &dyn DisplaySink, session_id: &str, text: &str, options: DisplayOptions) {
    if let Err(e) = display.show_text(text, options).await {
        tracing::warn!(session_id, error = %e, "failed to display text");
    }
}

/// Sleep until `deadline`, or forever when there is none
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
