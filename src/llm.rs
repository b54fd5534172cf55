//! Language model client (Gemini `generateContent`)
//!
//! The model is asked to answer with `{"Answer": "..."}`. Grounded
//! responses often arrive wrapped in a Markdown code fence, which is
//! stripped before parsing.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default Gemini API host
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Something that turns a prompt into a short answer
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate an answer for a single-turn prompt
    ///
    /// # Errors
    ///
    /// Returns `Error::Upstream` if the endpoint fails and `Error::Format`
    /// if the reply is not the expected JSON
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Gemini REST client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// HTTP client
    client: Client,
    /// API host, without trailing slash
    base_url: String,
    /// Model name (e.g. "gemini-2.0-flash")
    model: String,
    /// API key
    api_key: String,
}

impl GeminiClient {
    /// Create a new Gemini client against the public endpoint
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at another host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            tools: vec![Tool {
                google_search: serde_json::json!({}),
            }],
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending generateContent");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Upstream(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(provider_message(&body).unwrap_or_else(|| {
                format!("Gemini API error: {status}")
            })));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Format(format!("unreadable response: {}", e.without_url())))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| Error::Format("response has no candidate text".to_string()))?;

        parse_answer(&text)
    }
}

/// Extract the `Answer` field from model output
///
/// # Errors
///
/// Returns `Error::Format` if the text is not JSON or has no string
/// `Answer` field
pub fn parse_answer(text: &str) -> Result<String> {
    let json = strip_code_fence(text);

    let reply: AnswerReply = serde_json::from_str(json)
        .map_err(|e| Error::Format(format!("model reply is not an answer object: {e}")))?;

    Ok(reply.answer)
}

/// Remove a surrounding Markdown code fence, with or without a language tag
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        // language tag, e.g. ```json
        body = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|m| !m.is_empty())
}

/// Request body for `generateContent`
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct AnswerReply {
    #[serde(rename = "Answer")]
    answer: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
}
