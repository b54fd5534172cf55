//! Host app-session wire protocol
//!
//! JSON messages exchanged with the glasses host over the session
//! websocket. Every message carries a `type` tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::{DisplayOptions, ViewType};
use crate::intent::Utterance;

/// Stream carrying speech transcripts
pub const TRANSCRIPTION_STREAM: &str = "transcription";

/// Stream carrying glasses battery telemetry
pub const BATTERY_STREAM: &str = "glasses_battery_update";

/// Message sent from the gateway to the host
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppMessage {
    /// First message on a new connection
    #[serde(rename_all = "camelCase")]
    TpaConnectionInit {
        package_name: String,
        session_id: String,
        api_key: String,
    },
    /// Streams this app wants to receive
    #[serde(rename_all = "camelCase")]
    SubscriptionUpdate {
        package_name: String,
        session_id: String,
        subscriptions: Vec<String>,
    },
    /// Render a layout on the glasses
    #[serde(rename_all = "camelCase")]
    DisplayEvent {
        package_name: String,
        session_id: String,
        view: ViewType,
        layout: Layout,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        timestamp: DateTime<Utc>,
    },
}

impl AppMessage {
    /// A text-wall display request
    #[must_use]
    pub fn text_wall(package_name: &str, session_id: &str, text: &str, options: DisplayOptions) -> Self {
        Self::DisplayEvent {
            package_name: package_name.to_string(),
            session_id: session_id.to_string(),
            view: options.view,
            layout: Layout::TextWall {
                text: text.to_string(),
            },
            duration_ms: options.duration_ms(),
            timestamp: Utc::now(),
        }
    }
}

/// Display layout
#[derive(Debug, Serialize)]
#[serde(tag = "layoutType", rename_all = "snake_case")]
pub enum Layout {
    /// Plain block of text
    TextWall { text: String },
}

/// Message sent from the host to the gateway
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Handshake accepted
    TpaConnectionAck,
    /// Handshake rejected
    TpaConnectionError {
        #[serde(default)]
        message: String,
    },
    /// Data from a subscribed stream
    #[serde(rename_all = "camelCase")]
    DataStream {
        stream_type: String,
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Anything else the host may send
    #[serde(other)]
    Unknown,
}

/// Battery telemetry from the glasses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct BatteryStatus {
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub charging: Option<bool>,
}

/// Event delivered to a session handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Speech transcript, partial or final
    Transcription(Utterance),
    /// Battery telemetry (logged only)
    Battery(BatteryStatus),
}

impl HostMessage {
    /// Convert a data stream message into a session event
    ///
    /// Returns `None` for unrelated streams and payloads that don't match
    /// the stream's shape.
    #[must_use]
    pub fn into_event(self) -> Option<SessionEvent> {
        let Self::DataStream { stream_type, data } = self else {
            return None;
        };

        // language-tagged streams look like "transcription:en-US"
        if stream_type == TRANSCRIPTION_STREAM
            || stream_type.starts_with("transcription:")
        {
            return serde_json::from_value(data)
                .ok()
                .map(SessionEvent::Transcription);
        }

        if stream_type == BATTERY_STREAM {
            return serde_json::from_value(data).ok().map(SessionEvent::Battery);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_init_serialization() {
        let init = AppMessage::TpaConnectionInit {
            package_name: "dev.omni.glance".to_string(),
            session_id: "s-1".to_string(),
            api_key: "k".to_string(),
        };

        let json = serde_json::to_value(&init).unwrap();
        assert_eq!(json["type"], "tpa_connection_init");
        assert_eq!(json["packageName"], "dev.omni.glance");
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["apiKey"], "k");
    }

    #[test]
    fn test_display_event_serialization() {
        let msg = AppMessage::text_wall(
            "dev.omni.glance",
            "s-1",
            "Next event: Standup at 10:00 AM",
            DisplayOptions::main_for(Duration::from_millis(7500)),
        );

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "display_event");
        assert_eq!(json["view"], "main");
        assert_eq!(json["layout"]["layoutType"], "text_wall");
        assert_eq!(json["layout"]["text"], "Next event: Standup at 10:00 AM");
        assert_eq!(json["durationMs"], 7500);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_transcription_stream_to_event() {
        let msg: HostMessage = serde_json::from_str(
            r#"{"type":"data_stream","streamType":"transcription","data":{"type":"transcription","text":"what's next","isFinal":true}}"#,
        )
        .unwrap();

        assert_eq!(
            msg.into_event(),
            Some(SessionEvent::Transcription(Utterance::final_text("what's next")))
        );
    }

    #[test]
    fn test_language_tagged_stream_and_battery() {
        let msg: HostMessage = serde_json::from_str(
            r#"{"type":"data_stream","streamType":"transcription:en-US","data":{"text":"hey","isFinal":false}}"#,
        )
        .unwrap();
        assert_eq!(
            msg.into_event(),
            Some(SessionEvent::Transcription(Utterance::partial("hey")))
        );

        let msg: HostMessage = serde_json::from_str(
            r#"{"type":"data_stream","streamType":"glasses_battery_update","data":{"level":42,"charging":false}}"#,
        )
        .unwrap();
        assert_eq!(
            msg.into_event(),
            Some(SessionEvent::Battery(BatteryStatus {
                level: Some(42),
                charging: Some(false)
            }))
        );
    }

    #[test]
    fn test_unknown_messages_are_tolerated() {
        let msg: HostMessage = serde_json::from_str(r#"{"type":"settings_update","settings":[]}"#).unwrap();
        assert!(matches!(msg, HostMessage::Unknown));
        assert!(msg.into_event().is_none());

        let ack: HostMessage = serde_json::from_str(r#"{"type":"tpa_connection_ack","settings":[]}"#).unwrap();
        assert!(matches!(ack, HostMessage::TpaConnectionAck));
    }
}
