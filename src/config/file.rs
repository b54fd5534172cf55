//! TOML configuration file loading
//!
//! Supports `~/.config/glance/config.toml` (or `GLANCE_CONFIG`) as a
//! persistent source for the optional settings. Secrets and the required
//! host settings come from the environment only.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GlanceConfigFile {
    /// Assistant behaviour
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Calendar settings
    #[serde(default)]
    pub calendar: CalendarFileConfig,

    /// Display durations
    #[serde(default)]
    pub display: DisplayFileConfig,

    /// LLM settings
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Assistant behaviour
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Phrases that switch conversation mode on
    pub wake_phrases: Option<Vec<String>>,

    /// Seconds of silence before conversation mode lapses
    pub conversation_timeout_secs: Option<u64>,

    /// Text shown when a session starts
    pub welcome_text: Option<String>,
}

/// Calendar settings
#[derive(Debug, Default, Deserialize)]
pub struct CalendarFileConfig {
    /// IANA zone used for "today" and rendered times (e.g. "Europe/Paris")
    pub timezone: Option<String>,
}

/// Display durations
#[derive(Debug, Default, Deserialize)]
pub struct DisplayFileConfig {
    pub calendar_duration_ms: Option<u64>,
    pub answer_duration_ms: Option<u64>,
}

/// LLM settings
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model name (e.g. "gemini-2.0-flash")
    pub model: Option<String>,

    /// API host override
    pub base_url: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,
}

/// Load the TOML config file from the standard path
///
/// Returns `GlanceConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> GlanceConfigFile {
    let Some(path) = config_file_path() else {
        return GlanceConfigFile::default();
    };

    if !path.exists() {
        return GlanceConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GlanceConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GlanceConfigFile::default()
        }
    }
}

/// Return the config file path: `GLANCE_CONFIG` or `~/.config/glance/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("GLANCE_CONFIG") {
        return Some(PathBuf::from(path));
    }

    directories::BaseDirs::new().map(|d| d.config_dir().join("glance").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let file: GlanceConfigFile = toml::from_str(
            r#"
            [assistant]
            wake_phrases = ["ok glasses"]

            [calendar]
            timezone = "America/Chicago"
            "#,
        )
        .unwrap();

        assert_eq!(file.assistant.wake_phrases.unwrap(), vec!["ok glasses"]);
        assert_eq!(file.calendar.timezone.as_deref(), Some("America/Chicago"));
        assert!(file.llm.model.is_none());
        assert!(file.server.port.is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        let file: GlanceConfigFile = toml::from_str("").unwrap();
        assert!(file.assistant.conversation_timeout_secs.is_none());
    }
}
