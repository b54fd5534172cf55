//! Configuration management for Glance gateway
//!
//! Precedence is env > TOML file > default. The host credentials, port,
//! calendar feed and LLM settings are required; startup fails fast without
//! them.

pub mod file;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::conversation::DEFAULT_TIMEOUT;
use crate::llm::DEFAULT_BASE_URL;
use crate::{Error, Result};

use self::file::GlanceConfigFile;

/// Wake phrase used when none is configured
pub const DEFAULT_WAKE_PHRASE: &str = "hey glance";

/// Text shown when a session starts
pub const DEFAULT_WELCOME_TEXT: &str = "Glance is ready";

/// How long calendar answers stay on screen
pub const DEFAULT_CALENDAR_DURATION: Duration = Duration::from_millis(7500);

/// How long model answers stay on screen
pub const DEFAULT_ANSWER_DURATION: Duration = Duration::from_millis(10_000);

/// Glance gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosting platform credentials
    pub host: HostConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Calendar feed configuration
    pub calendar: CalendarConfig,

    /// Language model configuration
    pub llm: LlmConfig,

    /// Intent and conversation behaviour
    pub assistant: AssistantConfig,

    /// Display durations
    pub display: DisplayConfig,
}

/// Hosting platform credentials
#[derive(Clone)]
pub struct HostConfig {
    /// App package identifier registered with the host (`PACKAGE_NAME`)
    pub package_name: String,

    /// Host API key (`AUGMENTOS_API_KEY`)
    pub api_key: String,
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfig")
            .field("package_name", &self.package_name)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// Calendar feed configuration
#[derive(Clone)]
pub struct CalendarConfig {
    /// iCalendar feed URL (`ICAL_URL`, legacy `ICAL`)
    pub feed_url: String,

    /// Zone used for "today" and rendered times
    pub timezone: Tz,
}

impl fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("feed_url", &"<redacted>")
            .field("timezone", &self.timezone)
            .finish()
    }
}

/// Language model configuration
#[derive(Clone)]
pub struct LlmConfig {
    /// Gemini API key (`GEMINI_API_KEY`)
    pub api_key: String,

    /// Model name (`GEMINI_MODEL`)
    pub model: String,

    /// API host (`GEMINI_BASE_URL`)
    pub base_url: String,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Intent and conversation behaviour
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Phrases that switch conversation mode on
    pub wake_phrases: Vec<String>,

    /// Idle time before conversation mode lapses
    pub conversation_timeout: Duration,

    /// Text shown when a session starts; empty disables it
    pub welcome_text: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake_phrases: vec![DEFAULT_WAKE_PHRASE.to_string()],
            conversation_timeout: DEFAULT_TIMEOUT,
            welcome_text: DEFAULT_WELCOME_TEXT.to_string(),
        }
    }
}

/// Display durations
#[derive(Debug, Clone, Copy)]
pub struct DisplayConfig {
    /// Next-event and agenda answers
    pub calendar_duration: Duration,

    /// Conversation answers and failure messages
    pub answer_duration: Duration,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            calendar_duration: DEFAULT_CALENDAR_DURATION,
            answer_duration: DEFAULT_ANSWER_DURATION,
        }
    }
}

impl Config {
    /// Load configuration from the process environment and config file
    ///
    /// `port` (from the CLI) takes precedence over `PORT`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a required setting is missing or a value
    /// is invalid
    pub fn load(port: Option<u16>) -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), &fc, port)
    }

    /// Build configuration from an environment lookup and a parsed file
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a required setting is missing or a value
    /// is invalid
    pub fn from_sources(
        env: impl Fn(&str) -> Option<String>,
        fc: &GlanceConfigFile,
        port: Option<u16>,
    ) -> Result<Self> {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let host = HostConfig {
            package_name: required(&lookup, "PACKAGE_NAME")?,
            api_key: required(&lookup, "AUGMENTOS_API_KEY")?,
        };

        // CLI > env > toml
        let port = match port {
            Some(port) => port,
            None => match parse_opt::<u16>(&lookup, "PORT")?.or(fc.server.port) {
                Some(port) => port,
                None => return Err(Error::Config("PORT is not set".to_string())),
            },
        };
        let api_server = ApiServerConfig { port };

        let feed_url = lookup("ICAL_URL")
            .or_else(|| lookup("ICAL"))
            .ok_or_else(|| Error::Config("ICAL_URL is not set".to_string()))?;
        let timezone = match lookup("GLANCE_TIMEZONE").or_else(|| fc.calendar.timezone.clone()) {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|e| Error::Config(format!("invalid time zone '{name}': {e}")))?,
            None => Tz::UTC,
        };
        let calendar = CalendarConfig { feed_url, timezone };

        let llm = LlmConfig {
            api_key: required(&lookup, "GEMINI_API_KEY")?,
            model: lookup("GEMINI_MODEL")
                .or_else(|| fc.llm.model.clone())
                .ok_or_else(|| Error::Config("GEMINI_MODEL is not set".to_string()))?,
            base_url: lookup("GEMINI_BASE_URL")
                .or_else(|| fc.llm.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };

        let defaults = AssistantConfig::default();
        let wake_phrases = lookup("GLANCE_WAKE_PHRASES")
            .map(|list| list.split(',').map(|p| p.trim().to_string()).collect())
            .or_else(|| fc.assistant.wake_phrases.clone())
            .unwrap_or(defaults.wake_phrases);
        if wake_phrases.iter().all(|p: &String| p.trim().is_empty()) {
            return Err(Error::Config("at least one wake phrase is required".to_string()));
        }
        let assistant = AssistantConfig {
            wake_phrases,
            conversation_timeout: parse_opt::<u64>(&lookup, "GLANCE_CONVERSATION_TIMEOUT_SECS")?
                .or(fc.assistant.conversation_timeout_secs)
                .map_or(defaults.conversation_timeout, Duration::from_secs),
            welcome_text: env("GLANCE_WELCOME_TEXT")
                .or_else(|| fc.assistant.welcome_text.clone())
                .unwrap_or(defaults.welcome_text),
        };
        if assistant.conversation_timeout.is_zero() {
            return Err(Error::Config("conversation timeout must be positive".to_string()));
        }

        let display_defaults = DisplayConfig::default();
        let display = DisplayConfig {
            calendar_duration: parse_opt::<u64>(&lookup, "GLANCE_CALENDAR_DURATION_MS")?
                .or(fc.display.calendar_duration_ms)
                .map_or(display_defaults.calendar_duration, Duration::from_millis),
            answer_duration: parse_opt::<u64>(&lookup, "GLANCE_ANSWER_DURATION_MS")?
                .or(fc.display.answer_duration_ms)
                .map_or(display_defaults.answer_duration, Duration::from_millis),
        };

        Ok(Self {
            host,
            api_server,
            calendar,
            llm,
            assistant,
            display,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).ok_or_else(|| Error::Config(format!("{key} is not set")))
}

fn parse_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("invalid {key} '{raw}': {e}")))
        })
        .transpose()
}
