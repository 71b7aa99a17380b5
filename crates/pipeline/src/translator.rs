use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Translation failures. `Clone` so coalesced waiters can all observe the
/// same outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TranslateError {
    /// The service answered non-2xx with an `{ "error": ... }` body.
    #[error("translation rejected: {0}")]
    Service(String),
    /// Transport-level failure (connect, timeout, malformed body).
    #[error("translation request failed: {0}")]
    Transport(String),
}

/// The speech-to-speech translation collaborator.
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError>;
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translated_text: String,
    #[allow(dead_code)]
    source_lang: String,
    #[allow(dead_code)]
    target_lang: String,
    #[serde(default)]
    cached: bool,
    #[serde(default)]
    latency_ms: f64,
}

#[derive(Deserialize)]
struct TranslateErrorBody {
    error: String,
}

/// REST client for the translation service.
pub struct HttpTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTranslator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        let url = format!("{}/api/v1/translate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TranslateRequest {
                text,
                source_lang,
                target_lang,
            })
            .send()
            .await
            .map_err(|e| TranslateError::Transport(e.to_string()))?;

        if response.status().is_success() {
            let body: TranslateResponse = response
                .json()
                .await
                .map_err(|e| TranslateError::Transport(e.to_string()))?;
            debug!(
                source_lang,
                target_lang,
                cached = body.cached,
                latency_ms = body.latency_ms,
                "Translation completed"
            );
            Ok(body.translated_text)
        } else {
            let status = response.status();
            let message = match response.json::<TranslateErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("status {status}"),
            };
            Err(TranslateError::Service(message))
        }
    }
}
