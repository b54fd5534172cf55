//! Intent classification for finalized transcripts
//!
//! Matching is a case-insensitive substring test against an ordered rule
//! table; the first matching rule wins.

use serde::Deserialize;

/// A transcription event from the host session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub text: String,
    pub is_final: bool,
}

impl Utterance {
    /// A finalized transcript
    #[must_use]
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    /// A streaming partial transcript
    #[must_use]
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// What a transcript asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Wake phrase heard, or conversation mode already active
    ConversationTurn,
    /// "What's next?"
    NextEvent,
    /// "What's on my schedule / agenda?"
    TodayAgenda,
    /// Nothing to do
    NoOp,
}

/// Keyword rules checked after the conversation rule, in order
const KEYWORD_RULES: &[(Intent, &[&str])] = &[
    (Intent::NextEvent, &["next"]),
    (Intent::TodayAgenda, &["schedule", "agenda"]),
];

/// Classifies utterances into intents
#[derive(Debug, Clone)]
pub struct IntentRouter {
    wake_phrases: Vec<String>,
}

impl IntentRouter {
    /// Create a router for the given wake phrases
    ///
    /// Phrases are trimmed and lower-cased; blank phrases are dropped.
    #[must_use]
    pub fn new(wake_phrases: Vec<String>) -> Self {
        let normalized: Vec<String> = wake_phrases
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        tracing::debug!(wake_phrases = ?normalized, "intent router initialized");

        Self {
            wake_phrases: normalized,
        }
    }

    /// Classify an utterance
    ///
    /// Precedence: conversation (active mode or wake phrase), then
    /// "next", then "schedule"/"agenda". Partial and blank transcripts are
    /// always `NoOp`.
    #[must_use]
    pub fn classify(&self, utterance: &Utterance, conversation_active: bool) -> Intent {
        if !utterance.is_final || utterance.text.trim().is_empty() {
            return Intent::NoOp;
        }

        let normalized = utterance.text.to_lowercase();

        if conversation_active || self.contains_wake_phrase(&normalized) {
            return Intent::ConversationTurn;
        }

        KEYWORD_RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k)))
            .map_or(Intent::NoOp, |(intent, _)| *intent)
    }

    /// Check lower-cased text for any wake phrase
    #[must_use]
    pub fn contains_wake_phrase(&self, normalized: &str) -> bool {
        self.wake_phrases
            .iter()
            .any(|phrase| normalized.contains(phrase.as_str()))
    }

    /// Get the configured wake phrases
    #[must_use]
    pub fn wake_phrases(&self) -> &[String] {
        &self.wake_phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> IntentRouter {
        IntentRouter::new(vec!["hey glance".to_string()])
    }

    #[test]
    fn test_keyword_intents() {
        let router = router();

        assert_eq!(
            router.classify(&Utterance::final_text("What's on my schedule"), false),
            Intent::TodayAgenda
        );
        assert_eq!(
            router.classify(&Utterance::final_text("read me the AGENDA"), false),
            Intent::TodayAgenda
        );
        assert_eq!(
            router.classify(&Utterance::final_text("what's next"), false),
            Intent::NextEvent
        );
        assert_eq!(
            router.classify(&Utterance::final_text("nice weather"), false),
            Intent::NoOp
        );
    }

    #[test]
    fn test_next_beats_agenda() {
        let router = router();

        assert_eq!(
            router.classify(&Utterance::final_text("next item on the agenda"), false),
            Intent::NextEvent
        );
    }

    #[test]
    fn test_conversation_beats_keywords() {
        let router = router();

        assert_eq!(
            router.classify(&Utterance::final_text("Hey Glance, what's next?"), false),
            Intent::ConversationTurn
        );
        assert_eq!(
            router.classify(&Utterance::final_text("what's on my schedule"), true),
            Intent::ConversationTurn
        );
    }

    #[test]
    fn test_partial_and_blank_are_noop() {
        let router = router();

        assert_eq!(router.classify(&Utterance::partial("what's next"), false), Intent::NoOp);
        assert_eq!(router.classify(&Utterance::partial("hey glance"), true), Intent::NoOp);
        assert_eq!(router.classify(&Utterance::final_text("   "), true), Intent::NoOp);
    }

    #[test]
    fn test_wake_phrase_normalization() {
        let router = IntentRouter::new(vec!["  Hey GLANCE ".to_string(), String::new()]);

        assert_eq!(router.wake_phrases(), &["hey glance"]);
    }
}
