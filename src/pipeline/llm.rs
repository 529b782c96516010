//! Summarization: one call to a text-generation endpoint per document.
//!
//! The wire format is the Ollama `/api/generate` shape:
//! `{"model", "prompt", "stream": false}` in, `{"response"}` out. Prompt
//! wording lives in [`crate::prompts`].
//!
//! No retries: a failed call surfaces once to the caller.

use crate::config::ServiceConfig;
use crate::error::DocsumError;
use crate::prompts::summary_prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Turn document text into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, DocsumError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// HTTP client for the generation endpoint.
#[derive(Debug, Clone)]
pub struct GenerateClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl GenerateClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, DocsumError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.generate_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| DocsumError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.generate_url.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Summarizer for GenerateClient {
    async fn summarize(&self, text: &str) -> Result<String, DocsumError> {
        if text.trim().is_empty() {
            warn!("Cannot summarize empty content");
            return Err(DocsumError::EmptyInput);
        }

        info!(
            "Sending {} chars to {} (model {})",
            text.len(),
            self.url,
            self.model
        );
        let start = Instant::now();

        let request = GenerateRequest {
            model: &self.model,
            prompt: summary_prompt(text),
            stream: false,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocsumError::GenerateUnreachable {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocsumError::GenerateStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| DocsumError::MalformedResponse {
                    detail: e.to_string(),
                })?;

        let summary = body.response.trim().to_string();
        if summary.is_empty() {
            return Err(DocsumError::EmptySummary);
        }

        debug!(
            "Summary of {} chars received in {:?}",
            summary.len(),
            start.elapsed()
        );
        Ok(summary)
    }
}
