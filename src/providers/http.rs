/*!
 * HTTP translation client.
 *
 * POSTs `{model, source_language, target_language, sentences, half_precision}`
 * to `{endpoint}/translate` and expects `{"translations": [...]}` back.
 */

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Translator;
use crate::app_config::{Precision, TranslationConfig};
use crate::errors::TranslationError;

/// Request body
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    model: &'a str,
    source_language: &'a str,
    target_language: &'a str,
    sentences: &'a [String],
    half_precision: bool,
}

/// Response body
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<String>,
}

/// Client for a translation model served over HTTP
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: Client,
    url: String,
    model: String,
    source_language: String,
    target_language: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HttpTranslator {
    pub fn new(
        config: &TranslationConfig,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Result<Self, TranslationError> {
        let base = url::Url::parse(&config.endpoint).map_err(|e| {
            TranslationError::RequestFailed(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        let url = format!("{}/translate", base.as_str().trim_end_matches('/'));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TranslationError::RequestFailed(format!("failed to build client: {}", e)))?;

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            max_retries: 2,
            backoff_base_ms: 500,
        })
    }

    /// Request URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send_once(
        &self,
        sentences: &[String],
        precision: Precision,
    ) -> Result<Vec<String>, TranslationError> {
        let request = TranslateRequest {
            model: &self.model,
            source_language: &self.source_language,
            target_language: &self.target_language,
            sentences,
            half_precision: precision == Precision::Half,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::RequestFailed(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let parsed: TranslateResponse = serde_json::from_str(&body).map_err(|e| {
            TranslationError::RequestFailed(format!("unexpected response body: {}", e))
        })?;

        if parsed.translations.len() != sentences.len() {
            return Err(TranslationError::LengthMismatch {
                expected: sentences.len(),
                actual: parsed.translations.len(),
            });
        }

        Ok(parsed.translations)
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        sentences: &[String],
        precision: Precision,
    ) -> Result<Vec<String>, TranslationError> {
        let mut attempt = 0;

        loop {
            match self.send_once(sentences, precision).await {
                Ok(translations) => return Ok(translations),
                // Only transport failures are retried; exhaustion needs a smaller load
                Err(TranslationError::RequestFailed(message)) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_base_ms * 2u64.pow(attempt - 1);
                    warn!(
                        "Translation request failed ({}), retry {}/{} in {}ms",
                        message, attempt, self.max_retries, delay
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => {
                    debug!("Translation request gave up after {} retries", attempt);
                    return Err(e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Map a non-success answer to a translation error
fn classify_failure(status: StatusCode, body: &str) -> TranslationError {
    let out_of_memory = body.to_lowercase().contains("out of memory");

    if status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::INSUFFICIENT_STORAGE
        || out_of_memory
    {
        TranslationError::ResourceExhausted(format!("HTTP {}: {}", status.as_u16(), truncate(body)))
    } else {
        TranslationError::RequestFailed(format!("HTTP {}: {}", status.as_u16(), truncate(body)))
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() > 200 {
        let head: String = body.chars().take(200).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}
