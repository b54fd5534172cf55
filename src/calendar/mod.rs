//! Calendar feed retrieval and filtering
//!
//! Fetches an iCalendar feed over HTTP and answers two questions about it:
//! what comes next, and what is on today.

mod feed;
mod format;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Client;

pub use feed::{CalendarEvent, UNTITLED, next_event, parse_events, today_events};
pub use format::{
    NO_EVENTS_TODAY, NO_UPCOMING_EVENTS, TIME_FORMAT, format_agenda, format_next_event,
    format_time,
};

use crate::{Error, Result};

/// Client for a single calendar feed URL
#[derive(Debug, Clone)]
pub struct CalendarService {
    /// HTTP client
    client: Client,
    /// Feed URL (often a private, secret-bearing link; never logged)
    feed_url: String,
    /// Zone used for "today" and for rendering times
    timezone: Tz,
}

impl CalendarService {
    /// Create a new calendar service
    #[must_use]
    pub fn new(feed_url: impl Into<String>, timezone: Tz) -> Self {
        Self {
            client: Client::new(),
            feed_url: feed_url.into(),
            timezone,
        }
    }

    /// Display time zone
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current time in the display zone
    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    /// Download the raw feed text
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` on network failure or a non-success status
    pub async fn fetch_feed(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "calendar feed returned {}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Fetch(e.without_url().to_string()))?;

        tracing::debug!(bytes = text.len(), "fetched calendar feed");

        Ok(text)
    }

    /// Fetch the feed and render the next upcoming event
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` or `Error::Parse`
    pub async fn next_event_text(&self) -> Result<String> {
        let feed = self.fetch_feed().await?;
        let now = self.now();

        let event = next_event(&feed, &now)?;
        tracing::debug!(found = event.is_some(), "selected next event");

        Ok(format_next_event(event.as_ref(), &self.timezone))
    }

    /// Fetch the feed and render today's agenda
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` or `Error::Parse`
    pub async fn agenda_text(&self) -> Result<String> {
        let feed = self.fetch_feed().await?;
        let now = self.now();

        let events = today_events(&feed, &now)?;
        tracing::debug!(count = events.len(), "selected today's events");

        if events.is_empty() {
            return Ok(NO_EVENTS_TODAY.to_string());
        }

        Ok(format_agenda(&events, &self.timezone))
    }
}
