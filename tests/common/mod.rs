//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use glance_gateway::display::RecordingDisplay;
use glance_gateway::{Assistant, CalendarService, IntentRouter, LanguageModel, Result};

/// Wake phrase used across tests
pub const WAKE_PHRASE: &str = "hey glance";

/// Build an iCalendar feed from `(summary, start)` pairs
#[must_use]
pub fn ics(events: &[(&str, DateTime<Utc>)]) -> String {
    let mut out = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//glance tests//EN\r\n");
    for (i, (summary, start)) in events.iter().enumerate() {
        write!(
            out,
            "BEGIN:VEVENT\r\nUID:{i}@glance\r\nSUMMARY:{summary}\r\nDTSTART:{}\r\nEND:VEVENT\r\n",
            start.format("%Y%m%dT%H%M%SZ")
        )
        .expect("write to string");
    }
    out.push_str("END:VCALENDAR\r\n");
    out
}

/// Language model that replays scripted replies and records prompts
///
/// Once the script runs out it answers "answer <n>".
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn with_replies(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::default(),
        })
    }

    /// Prompts received so far, oldest first
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let n = {
            let mut prompts = self.prompts.lock().expect("prompts lock");
            prompts.push(prompt.to_string());
            prompts.len()
        };

        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Ok(format!("answer {n}")))
    }
}

/// Assistant over a UTC calendar at `feed_url` and the given model
#[must_use]
pub fn assistant(feed_url: &str, model: Arc<ScriptedModel>) -> Assistant {
    Assistant::new(
        IntentRouter::new(vec![WAKE_PHRASE.to_string()]),
        CalendarService::new(feed_url, Tz::UTC),
        model,
    )
}

/// Wait until `display` has shown at least `count` texts
///
/// # Panics
///
/// Panics if that doesn't happen within five seconds (virtual or real)
pub async fn wait_for_texts(display: &RecordingDisplay, count: usize) -> Vec<String> {
    for _ in 0..500 {
        let texts = display.texts().await;
        if texts.len() >= count {
            return texts;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {count} displayed texts, got {:?}",
        display.texts().await
    );
}
