//! Sticky conversation mode
//!
//! ```text
//!   Idle ──wake phrase──▶ Active ──timeout──▶ Idle
//!                          │  ▲
//!                          └──┘ qualifying utterance re-arms timeout
//! ```
//!
//! The controller is owned by a single session's event loop, so it needs
//! no locking. The loop reads [`ConversationController::deadline`] on every
//! iteration; re-arming replaces the deadline instead of stacking timers.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Default idle timeout for conversation mode
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Instructions prepended to every conversation prompt
pub const PROMPT_TEMPLATE: &str = "You are a voice assistant shown on smart glasses. \
The wearer sees your reply on a tiny display for a few seconds, so answer in one or two short sentences. \
Use the conversation so far for context. \
Respond ONLY with a JSON object of the form {\"Answer\": \"<your reply>\"} and nothing else.";

/// Who said a history line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of conversation history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.speaker {
            Speaker::User => write!(f, "User said: {}", self.text),
            Speaker::Assistant => write!(f, "AI replied: {}", self.text),
        }
    }
}

/// Conversation mode state for one session
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    /// Whether conversation mode is on
    pub active: bool,
    /// Append-only transcript and reply history
    pub history: Vec<HistoryEntry>,
    /// When conversation mode lapses without another utterance
    pub expires_at: Option<Instant>,
}

/// Drives conversation mode and builds prompts
#[derive(Debug)]
pub struct ConversationController {
    state: ConversationState,
    timeout: Duration,
}

impl ConversationController {
    /// Create an idle controller with an empty history
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: ConversationState::default(),
            timeout,
        }
    }

    /// Whether conversation mode is active at `now`
    #[must_use]
    pub fn is_active(&self, now: Instant) -> bool {
        self.state.active && self.state.expires_at.is_some_and(|deadline| now < deadline)
    }

    /// Pending timeout deadline, if conversation mode is on
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        if self.state.active {
            self.state.expires_at
        } else {
            None
        }
    }

    /// Start or continue a turn and return the prompt for the model
    ///
    /// Enters (or stays in) Active, re-arms the timeout, and appends the
    /// utterance to history. The prompt carries the history from before
    /// this utterance.
    pub fn begin_turn(&mut self, text: &str, now: Instant) -> String {
        let prompt = build_prompt(text, &self.state.history);

        if !self.state.active {
            tracing::info!(timeout_secs = self.timeout.as_secs(), "conversation mode on");
        }
        self.state.active = true;
        self.state.expires_at = Some(now + self.timeout);

        self.state.history.push(HistoryEntry {
            speaker: Speaker::User,
            text: text.to_string(),
        });

        prompt
    }

    /// Record a model answer
    pub fn record_reply(&mut self, answer: &str) {
        self.state.history.push(HistoryEntry {
            speaker: Speaker::Assistant,
            text: answer.to_string(),
        });
    }

    /// Leave conversation mode if the deadline has passed
    ///
    /// Returns true if this call switched the mode off.
    pub fn expire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.state.active = false;
                self.state.expires_at = None;
                tracing::info!(history = self.state.history.len(), "conversation mode timed out");
                true
            }
            _ => false,
        }
    }

    /// Switch conversation mode off immediately
    pub fn end(&mut self) {
        self.state.active = false;
        self.state.expires_at = None;
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &ConversationState {
        &self.state
    }

    /// History lines so far
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.state.history
    }
}

impl Default for ConversationController {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Template, then the new utterance, then the prior history
#[must_use]
pub fn build_prompt(text: &str, history: &[HistoryEntry]) -> String {
    let mut prompt = format!("{PROMPT_TEMPLATE}\n\nThe user just said: {text}\n");

    if !history.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for entry in history {
            prompt.push_str(&entry.to_string());
            prompt.push('\n');
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let controller = ConversationController::default();
        let now = Instant::now();

        assert!(!controller.is_active(now));
        assert!(controller.deadline().is_none());
        assert!(controller.history().is_empty());
    }

    #[test]
    fn test_turn_activates_and_records_history() {
        let mut controller = ConversationController::new(Duration::from_secs(20));
        let now = Instant::now();

        let prompt = controller.begin_turn("hey glance how tall is everest", now);
        assert!(prompt.starts_with(PROMPT_TEMPLATE));
        assert!(prompt.contains("how tall is everest"));
        assert!(!prompt.contains("Conversation so far"));

        assert!(controller.is_active(now));
        assert_eq!(controller.deadline(), Some(now + Duration::from_secs(20)));

        controller.record_reply("About 8849 meters.");
        let lines: Vec<String> = controller.history().iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "User said: hey glance how tall is everest",
                "AI replied: About 8849 meters."
            ]
        );
    }

    #[test]
    fn test_follow_up_prompt_carries_prior_history() {
        let mut controller = ConversationController::default();
        let now = Instant::now();

        controller.begin_turn("hey glance who wrote dune", now);
        controller.record_reply("Frank Herbert.");
        let prompt = controller.begin_turn("when was it published", now + Duration::from_secs(5));

        let current = prompt.find("when was it published").unwrap();
        let history = prompt.find("User said: hey glance who wrote dune").unwrap();
        assert!(current < history);
        assert!(prompt.contains("AI replied: Frank Herbert."));
    }

    #[test]
    fn test_each_turn_extends_deadline() {
        let mut controller = ConversationController::new(Duration::from_secs(20));
        let start = Instant::now();

        controller.begin_turn("hey glance", start);
        controller.begin_turn("tell me more", start + Duration::from_secs(15));

        assert!(controller.is_active(start + Duration::from_secs(30)));
        assert!(!controller.expire_if_due(start + Duration::from_secs(30)));
        assert!(controller.expire_if_due(start + Duration::from_secs(35)));
        assert!(!controller.is_active(start + Duration::from_secs(35)));
    }

    #[test]
    fn test_timeout_keeps_history() {
        let mut controller = ConversationController::new(Duration::from_secs(1));
        let start = Instant::now();

        controller.begin_turn("hey glance", start);
        controller.record_reply("Hi!");
        assert!(controller.expire_if_due(start + Duration::from_secs(2)));

        assert!(!controller.state().active);
        assert!(controller.deadline().is_none());
        assert_eq!(controller.history().len(), 2);
    }

    #[test]
    fn test_end_clears_mode() {
        let mut controller = ConversationController::default();
        let now = Instant::now();

        controller.begin_turn("hey glance", now);
        controller.end();

        assert!(!controller.is_active(now));
        assert!(!controller.expire_if_due(now + DEFAULT_TIMEOUT));
    }
}
