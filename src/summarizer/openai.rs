//! Summarizer backed by an OpenAI-compatible chat completions endpoint

use crate::config::{RetryConfig, SummarizerConfig};
use crate::summarizer::{Summarizer, SummarizerError};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You summarize web pages. Rewrite the page content you are given \
as a concise, well-structured Markdown summary: a one-line title, a short overview paragraph \
and bullet points for the key facts. Use only information present in the content.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChoiceRaw>,
}

#[derive(Debug, Deserialize)]
struct ChoiceRaw {
    message: MessageRaw,
}

#[derive(Debug, Deserialize)]
struct MessageRaw {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl ErrorBody {
    fn is_quota(&self) -> bool {
        self.code.as_deref() == Some("insufficient_quota")
            || self.kind.as_deref() == Some("insufficient_quota")
    }
}

pub struct ChatSummarizer {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_input_chars: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl ChatSummarizer {
    pub fn new(
        config: &SummarizerConfig,
        retry: &RetryConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, SummarizerError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| SummarizerError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_input_chars: config.max_input_chars,
            max_retries: retry.max_retries,
            retry_delay: retry.retry_delay(),
        })
    }

    fn build_request<'a>(&'a self, text: &str, url_context: &str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Source: {}\n\n{}",
                        url_context,
                        truncate_chars(text, self.max_input_chars)
                    ),
                },
            ],
            temperature: 0.2,
        }
    }

    async fn request_once(&self, request: &ChatRequest<'_>) -> Result<String, SummarizerError> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Summarizer request failed");
                SummarizerError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .unwrap_or_default()
                .error;
            let message = if body.message.is_empty() {
                error_text
            } else {
                body.message.clone()
            };
            warn!(status = %status, error = %message, "Summarizer API error");

            return Err(if body.is_quota() {
                SummarizerError::Quota(message)
            } else if status == StatusCode::TOO_MANY_REQUESTS {
                SummarizerError::RateLimited(message)
            } else if status.is_server_error() {
                SummarizerError::Unavailable(message)
            } else {
                SummarizerError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| SummarizerError::InvalidResponse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SummarizerError::InvalidResponse("no choices returned".into()))?;

        validate_summary(&content)
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, text: &str, url_context: &str) -> Result<String, SummarizerError> {
        if text.trim().is_empty() {
            return Err(SummarizerError::EmptyInput);
        }

        let request = self.build_request(text, url_context);
        let start = std::time::Instant::now();
        let mut delay = self.retry_delay;
        let mut attempt = 0;

        loop {
            match self.request_once(&request).await {
                Ok(summary) => {
                    debug!(
                        model = %self.model,
                        url = %url_context,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Summarized page"
                    );
                    return Ok(summary);
                }
                Err(e @ (SummarizerError::RateLimited(_)
                | SummarizerError::Unavailable(_)
                | SummarizerError::Network(_)))
                    if attempt < self.max_retries =>
                {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        "Retrying summarizer after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Truncates to at most `max` characters without splitting a character
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Strips a surrounding code fence and rejects empty output
fn validate_summary(content: &str) -> Result<String, SummarizerError> {
    let mut summary = content.trim();

    if let Some(rest) = summary.strip_prefix("```") {
        // Drop the info string ("```markdown") along with the fence
        let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        summary = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }

    if summary.is_empty() {
        return Err(SummarizerError::InvalidResponse(
            "empty summary returned".into(),
        ));
    }

    Ok(summary.to_string())
}
