//! Host session webhook
//!
//! The host calls this when a wearer opens or closes the app. Session work
//! happens in the background; the webhook only acknowledges.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::ApiState;

/// Webhook request from the host
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebhookRequest {
    /// A wearer opened the app
    #[serde(rename_all = "camelCase")]
    SessionRequest {
        session_id: String,
        #[serde(default)]
        user_id: String,
        #[serde(rename = "augmentOSWebsocketUrl")]
        websocket_url: String,
    },
    /// A wearer closed the app, or the host ended the session
    #[serde(rename_all = "camelCase")]
    StopRequest {
        session_id: String,
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Webhook response
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookResponse {
    const fn success() -> Self {
        Self {
            status: "success",
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
        }
    }
}

/// Handle a host webhook
pub async fn handle_webhook(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> (StatusCode, Json<WebhookResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "rejected webhook body");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::error(rejection.body_text())),
            );
        }
    };

    match request {
        WebhookRequest::SessionRequest {
            session_id,
            user_id,
            websocket_url,
        } => {
            state.sessions.start(session_id, user_id, websocket_url).await;
        }
        WebhookRequest::StopRequest {
            session_id,
            user_id,
            reason,
        } => {
            let known = state.sessions.stop(&session_id).await;
            tracing::info!(
                %session_id,
                %user_id,
                reason = reason.as_deref().unwrap_or("unspecified"),
                known,
                "stop requested"
            );
        }
    }

    (StatusCode::OK, Json(WebhookResponse::success()))
}

/// Build webhook router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_request_shape() {
        let request: WebhookRequest = serde_json::from_str(
            r#"{"type":"session_request","sessionId":"s-1","userId":"u@example.com","augmentOSWebsocketUrl":"wss://host.example.com/tpa-ws","timestamp":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let WebhookRequest::SessionRequest {
            session_id,
            websocket_url,
            ..
        } = request
        else {
            panic!("expected session request");
        };
        assert_eq!(session_id, "s-1");
        assert_eq!(websocket_url, "wss://host.example.com/tpa-ws");
    }

    #[test]
    fn test_stop_request_without_reason() {
        let request: WebhookRequest =
            serde_json::from_str(r#"{"type":"stop_request","sessionId":"s-1"}"#).unwrap();

        assert!(matches!(
            request,
            WebhookRequest::StopRequest { reason: None, .. }
        ));
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_value(WebhookResponse::error("bad")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "bad");

        let json = serde_json::to_value(WebhookResponse::success()).unwrap();
        assert!(json.get("message").is_none());
    }
}
