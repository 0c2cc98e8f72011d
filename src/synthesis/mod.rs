
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::RecallError;
use crate::config::{GenerationConfig, OllamaConfig};

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Returned in place of an answer when the generative backend produced an
/// empty or safety-blocked response.
pub const EMPTY_RESPONSE_NOTICE: &str =
    "The model returned an empty response. This might be due to safety settings or the query itself.";

/// Produces a natural-language answer grounded in the supplied context.
///
/// Implementations return generated text on success; an empty or blocked
/// backend response maps to [`EMPTY_RESPONSE_NOTICE`] rather than a
/// fabricated answer. Backend call failures are surfaced as errors and
/// degraded by the caller, never silently dropped.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(&self, context: &str, question: &str) -> Result<String, RecallError>;
}

/// Build the grounding prompt. The model is constrained to the retrieved
/// context and instructed to say so when the answer is not contained in it.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Based *only* on the following context from my saved chat history, \
         please answer my question. Be concise and synthesize the information. \
         If the context doesn't contain the answer, say so.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

/// Generative backend over Ollama's non-streaming generate API.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    /// Returns `None` when no generation model is configured; searches then
    /// degrade to returning raw context.
    #[inline]
    pub fn from_config(
        ollama: &OllamaConfig,
        generation: &GenerationConfig,
    ) -> Result<Option<Self>> {
        let Some(model) = &generation.model else {
            return Ok(None);
        };

        let base_url = ollama
            .base_url()
            .context("Failed to build Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(generation.timeout_seconds)))
            .build()
            .into();

        Ok(Some(Self {
            base_url,
            model: model.clone(),
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }))
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generate URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generate request")?;

        let response_text = self
            .request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to call generation backend")?;

        let generate_response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generate response")?;

        Ok(generate_response.response)
    }

    fn request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Generation server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Generation transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => return Err(anyhow::anyhow!("Non-retryable error: {}", error)),
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        std::thread::sleep(Duration::from_millis(delay_ms));
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

#[async_trait]
impl AnswerSynthesizer for OllamaGenerator {
    /// Runs the blocking generation call on the tokio blocking pool. Any
    /// non-empty response is treated as a normal answer; partial blocking is
    /// not inferred.
    #[inline]
    async fn synthesize(&self, context: &str, question: &str) -> Result<String, RecallError> {
        let generator = self.clone();
        let prompt = build_prompt(context, question);

        let answer = tokio::task::spawn_blocking(move || generator.generate(&prompt))
            .await
            .map_err(|e| RecallError::Synthesis(format!("Generation task panicked: {e}")))?
            .map_err(|e| RecallError::Synthesis(format!("{e:#}")))?;

        if answer.trim().is_empty() {
            debug!("Generation backend returned an empty response");
            return Ok(EMPTY_RESPONSE_NOTICE.to_string());
        }

        Ok(answer)
    }
}
