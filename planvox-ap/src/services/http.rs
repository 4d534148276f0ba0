//! HTTP adapters for the external services
//!
//! JSON-over-HTTP clients for the speech synthesis, plan generation, and
//! summary services. Quota exhaustion (HTTP 429) is mapped to
//! [`Error::RateLimited`] carrying the server-provided reset time so the
//! caller can surface it to the user.

use crate::error::{Error, Result};
use crate::services::{PlanGenerator, SpeechSynthesizer, Summarizer};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use planvox_common::config::Voice;
use planvox_common::document::{Document, SourceMaterial};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    /// Base64-encoded raw PCM16LE audio
    audio: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    source: &'a SourceMaterial,
    topic: &'a str,
    extra_topics: &'a [String],
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    title: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reset_at: Option<DateTime<Utc>>,
}

/// Speech synthesis over HTTP
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSynthesizer {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidText(
                "Cannot synthesize empty text".to_string(),
            ));
        }

        debug!("Synthesizing {} chars with voice {}", text.len(), voice);

        let response = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .json(&SynthesizeRequest {
                text,
                voice: voice.as_str(),
            })
            .send()
            .await?;

        let response = check_status(response, |msg| Error::Synthesis(msg)).await?;
        let body: SynthesizeResponse = response.json().await?;

        BASE64
            .decode(body.audio.trim())
            .map_err(|e| Error::Synthesis(format!("Invalid base64 audio in response: {}", e)))
    }
}

/// Plan generation over HTTP
pub struct HttpPlanGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlanGenerator {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PlanGenerator for HttpPlanGenerator {
    async fn generate(
        &self,
        source: &SourceMaterial,
        topic: &str,
        extra_topics: &[String],
    ) -> Result<Document> {
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&GenerateRequest {
                source,
                topic,
                extra_topics,
            })
            .send()
            .await?;

        let response = check_status(response, |msg| Error::Plan(msg)).await?;
        Ok(response.json().await?)
    }
}

/// Chapter summaries over HTTP
pub struct HttpSummarizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSummarizer {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, title: &str, content: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/summarize", self.base_url))
            .json(&SummarizeRequest { title, content })
            .send()
            .await?;

        let response = check_status(response, |msg| Error::Summary(msg)).await?;
        let body: SummarizeResponse = response.json().await?;
        Ok(body.summary)
    }
}

/// Map non-success statuses to service errors
///
/// 429 becomes `RateLimited` with the reset time from the JSON body or the
/// `Retry-After` header; anything else non-success uses the body's error
/// message when present.
async fn check_status(
    response: Response,
    make_error: impl FnOnce(String) -> Error,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body: ErrorBody = response.json().await.unwrap_or(ErrorBody {
        error: None,
        reset_at: None,
    });
    let message = body
        .error
        .unwrap_or_else(|| format!("Service returned {}", status));

    if status == StatusCode::TOO_MANY_REQUESTS {
        let reset_at = body
            .reset_at
            .or_else(|| retry_after.as_deref().and_then(reset_from_retry_after))
            .unwrap_or_else(Utc::now);
        return Err(Error::RateLimited { message, reset_at });
    }

    Err(make_error(message))
}

/// Interpret a Retry-After header value (delta seconds) as a reset time
fn reset_from_retry_after(value: &str) -> Option<DateTime<Utc>> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .map(|secs| Utc::now() + Duration::seconds(secs))
}
