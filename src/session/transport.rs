//! Websocket transport to the glasses host
//!
//! Performs the app handshake, subscribes to the streams the assistant
//! needs, then runs a reader task (host → session events) and a writer task
//! (display requests → host) until the socket closes or the session is
//! cancelled.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use super::protocol::{AppMessage, BATTERY_STREAM, HostMessage, SessionEvent, TRANSCRIPTION_STREAM};
use crate::display::{DisplayOptions, DisplaySink};
use crate::{Error, Result};

/// How long the host has to acknowledge the handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffered events per session
const EVENT_BUFFER: usize = 64;

/// Identity presented to the host
#[derive(Clone)]
pub struct HostCredentials {
    pub package_name: String,
    pub api_key: String,
}

/// Display sink that forwards text to the host session
#[derive(Debug, Clone)]
pub struct HostDisplay {
    package_name: String,
    session_id: String,
    tx: mpsc::Sender<AppMessage>,
}

#[async_trait]
impl DisplaySink for HostDisplay {
    async fn show_text(&self, text: &str, options: DisplayOptions) -> Result<()> {
        let message = AppMessage::text_wall(&self.package_name, &self.session_id, text, options);
        self.tx
            .send(message)
            .await
            .map_err(|_| Error::Session("session connection closed".to_string()))
    }
}

/// Connect to the host and start pumping messages
///
/// Returns the display sink and the stream of session events. Cancelling
/// `cancel` closes the socket; a socket closed by the host cancels it.
///
/// # Errors
///
/// Returns `Error::WebSocket` if the connection fails and `Error::Session`
/// if the host rejects or never acknowledges the handshake
pub async fn connect(
    url: &str,
    credentials: &HostCredentials,
    session_id: &str,
    cancel: CancellationToken,
) -> Result<(HostDisplay, mpsc::Receiver<SessionEvent>)> {
    let (socket, _) = connect_async(url).await?;
    let (mut sink, mut stream) = socket.split();

    let init = AppMessage::TpaConnectionInit {
        package_name: credentials.package_name.clone(),
        session_id: session_id.to_string(),
        api_key: credentials.api_key.clone(),
    };
    sink.send(encode(&init)?).await?;

    tokio::time::timeout(HANDSHAKE_TIMEOUT, wait_for_ack(&mut stream))
        .await
        .map_err(|_| Error::Session("timed out waiting for host acknowledgement".to_string()))??;

    tracing::info!(session_id, "host session connected");

    let subscribe = AppMessage::SubscriptionUpdate {
        package_name: credentials.package_name.clone(),
        session_id: session_id.to_string(),
        subscriptions: vec![TRANSCRIPTION_STREAM.to_string(), BATTERY_STREAM.to_string()],
    };
    sink.send(encode(&subscribe)?).await?;

    let (out_tx, mut out_rx) = mpsc::channel::<AppMessage>(32);
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(EVENT_BUFFER);

    // Writer: display requests → host
    let writer_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = writer_cancel.cancelled() => break,
                message = out_rx.recv() => {
                    let Some(message) = message else { break };
                    let frame = match encode(&message) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to encode app message");
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(frame).await {
                        tracing::warn!(error = %e, "failed to send to host");
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    // Reader: host → session events
    let reader_session = session_id.to_string();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let Some(event) = decode_event(text.as_str()) else { continue };
                        if event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(session_id = %reader_session, "host closed session socket");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(session_id = %reader_session, error = %e, "host socket error");
                        break;
                    }
                }
            }
        }
        cancel.cancel();
    });

    let display = HostDisplay {
        package_name: credentials.package_name.clone(),
        session_id: session_id.to_string(),
        tx: out_tx,
    };

    Ok((display, event_rx))
}

async fn wait_for_ack<S>(stream: &mut S) -> Result<()>
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => match serde_json::from_str::<HostMessage>(text.as_str()) {
                Ok(HostMessage::TpaConnectionAck) => return Ok(()),
                Ok(HostMessage::TpaConnectionError { message }) => {
                    return Err(Error::Session(format!("host rejected connection: {message}")));
                }
                Ok(other) => tracing::debug!(?other, "ignoring message before acknowledgement"),
                Err(e) => tracing::debug!(error = %e, "ignoring unparseable message before acknowledgement"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    Err(Error::Session("host closed connection during handshake".to_string()))
}

fn decode_event(text: &str) -> Option<SessionEvent> {
    match serde_json::from_str::<HostMessage>(text) {
        Ok(message) => message.into_event(),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unparseable host message");
            None
        }
    }
}

fn encode(message: &AppMessage) -> Result<Message> {
    Ok(Message::Text(serde_json::to_string(message)?.into()))
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;
    use crate::intent::Utterance;

    #[test]
    fn test_decode_event_ignores_noise() {
        assert!(decode_event("not json").is_none());
        assert!(decode_event(r#"{"type":"settings_update"}"#).is_none());
        assert_eq!(
            decode_event(
                r#"{"type":"data_stream","streamType":"transcription","data":{"text":"agenda","isFinal":true}}"#
            ),
            Some(SessionEvent::Transcription(Utterance::final_text("agenda")))
        );
    }

    #[tokio::test]
    async fn test_wait_for_ack_skips_noise() {
        let frames = vec![
            Ok(Message::Text("garbage".into())),
            Ok(Message::Text(r#"{"type":"settings_update"}"#.into())),
            Ok(Message::Text(r#"{"type":"tpa_connection_ack"}"#.into())),
        ];
        let mut stream = stream::iter(frames);

        assert!(wait_for_ack(&mut stream).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_ack_reports_rejection() {
        let frames = vec![Ok(Message::Text(
            r#"{"type":"tpa_connection_error","message":"invalid api key"}"#.into(),
        ))];
        let mut stream = stream::iter(frames);

        let err = wait_for_ack(&mut stream).await.unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_wait_for_ack_on_early_close() {
        let mut stream = stream::iter(Vec::<std::result::Result<Message, tungstenite::Error>>::new());

        assert!(matches!(wait_for_ack(&mut stream).await, Err(Error::Session(_))));
    }

    #[tokio::test]
    async fn test_host_display_sends_text_wall() {
        let (tx, mut rx) = mpsc::channel(4);
        let display = HostDisplay {
            package_name: "dev.omni.glance".to_string(),
            session_id: "s-1".to_string(),
            tx,
        };

        display
            .show_text("hello", DisplayOptions::main_for(Duration::from_secs(2)))
            .await
            .unwrap();

        let json = serde_json::to_value(rx.recv().await.unwrap()).unwrap();
        assert_eq!(json["layout"]["text"], "hello");
        assert_eq!(json["durationMs"], 2000);
    }
}
