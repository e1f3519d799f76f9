//! Analysis oracle client
//!
//! Sends a document image to a multimodal model behind an OpenAI-compatible
//! chat-completions endpoint and returns the raw response text. Parsing the
//! text into a structured verdict is the job of [`crate::verdict`]; this
//! module only handles transport and the failure taxonomy.

pub mod prompt;

pub use prompt::{ANALYSIS_PROMPT, PROMPT_VERSION};

use crate::config::OracleConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Abstraction over the analysis model endpoint
#[async_trait]
pub trait AnalysisOracle: Send + Sync {
    /// Analyze a document image, returning the raw model output text
    async fn analyze(&self, mime_type: &str, bytes: &[u8]) -> Result<String>;
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint
pub struct HttpOracle {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "oracle.api_key is required".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.oracle_timeout())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, mime_type: &str, bytes: &[u8]) -> ChatRequest {
        let data_url = format!("data:{};base64,{}", mime_type, encode_base64(bytes));

        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl AnalysisOracle for HttpOracle {
    async fn analyze(&self, mime_type: &str, bytes: &[u8]) -> Result<String> {
        let request = self.build_request(mime_type, bytes);
        let start = Instant::now();
        metrics::counter!("veridoc_oracle_requests_total", "model" => self.model.clone())
            .increment(1);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let elapsed = start.elapsed();
        metrics::histogram!("veridoc_oracle_request_duration_seconds")
            .record(elapsed.as_secs_f64());

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            metrics::counter!("veridoc_oracle_errors_total", "kind" => "rate_limited")
                .increment(1);
            return Err(AppError::RateLimited);
        }
        if status == reqwest::StatusCode::PAYMENT_REQUIRED {
            metrics::counter!("veridoc_oracle_errors_total", "kind" => "quota_exhausted")
                .increment(1);
            return Err(AppError::QuotaExhausted);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Oracle request failed");
            metrics::counter!("veridoc_oracle_errors_total", "kind" => "upstream")
                .increment(1);
            return Err(AppError::OracleError {
                message: format!("Oracle returned {}: {}", status, truncate(&body, 200)),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = extract_content(parsed)?;

        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            response_len = text.len(),
            prompt_version = PROMPT_VERSION,
            "Oracle analysis complete"
        );

        Ok(text)
    }
}

/// Pull the assistant text out of a chat-completions response
fn extract_content(response: ChatResponse) -> Result<String> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if text.trim().is_empty() {
        metrics::counter!("veridoc_oracle_errors_total", "kind" => "empty").increment(1);
        return Err(AppError::EmptyAnalysis);
    }

    Ok(text)
}

/// Base64-encode in 3-byte-aligned chunks to bound peak allocation on
/// large documents
fn encode_base64(bytes: &[u8]) -> String {
    const CHUNK: usize = 32 * 1024 * 3;

    let mut out = String::with_capacity(bytes.len() / 3 * 4 + 4);
    for chunk in bytes.chunks(CHUNK) {
        BASE64.encode_string(chunk, &mut out);
    }
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Scripted oracle for tests. Returns queued responses in order.
#[derive(Default)]
pub struct ScriptedOracle {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(text: impl Into<String>) -> Self {
        let oracle = Self::default();
        oracle.push_ok(text);
        oracle
    }

    pub fn push_ok(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .expect("lock poisoned")
            .push_back(Ok(text.into()));
    }

    pub fn push_err(&self, err: AppError) {
        self.responses
            .lock()
            .expect("lock poisoned")
            .push_back(Err(err));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisOracle for ScriptedOracle {
    async fn analyze(&self, _mime_type: &str, _bytes: &[u8]) -> Result<String> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.responses
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(AppError::EmptyAnalysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_encode_matches_one_shot() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(encode_base64(&data), BASE64.encode(&data));
    }

    #[test]
    fn test_extract_content_empty_choices() {
        let response = ChatResponse { choices: vec![] };
        assert!(matches!(
            extract_content(response),
            Err(AppError::EmptyAnalysis)
        ));
    }

    #[test]
    fn test_extract_content_blank_text() {
        let response = ChatResponse {
            choices: vec![ChatChoice {
                message: ChatResponseMessage {
                    content: Some("   ".to_string()),
                },
            }],
        };
        assert!(matches!(
            extract_content(response),
            Err(AppError::EmptyAnalysis)
        ));
    }

    #[test]
    fn test_extract_content_ok() {
        let response = ChatResponse {
            choices: vec![ChatChoice {
                message: ChatResponseMessage {
                    content: Some("{\"overall_risk_score\": 10}".to_string()),
                },
            }],
        };
        assert_eq!(
            extract_content(response).unwrap(),
            "{\"overall_risk_score\": 10}"
        );
    }

    #[test]
    fn test_request_embeds_prompt_and_data_url() {
        let config = OracleConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let oracle = HttpOracle::new(&config).unwrap();
        let request = oracle.build_request("image/png", b"pixels");

        let json = serde_json::to_value(&request).unwrap();
        let content = &json["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert!(content[0]["text"]
            .as_str()
            .unwrap()
            .contains("document forensics analyst"));
        assert!(content[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_scripted_oracle_returns_in_order() {
        let oracle = ScriptedOracle::new();
        oracle.push_ok("first");
        oracle.push_err(AppError::RateLimited);

        assert_eq!(oracle.analyze("image/png", b"x").await.unwrap(), "first");
        assert!(matches!(
            oracle.analyze("image/png", b"x").await,
            Err(AppError::RateLimited)
        ));
        assert_eq!(oracle.call_count(), 2);
    }
}
