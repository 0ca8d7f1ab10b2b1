use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::response::extract_text;
use super::types::{
    ApiError, Content, GenerateContentRequest, GenerateContentResponse, GenerateRequest,
    GenerationConfig,
};
use crate::config::{ApiKey, GeminiSettings};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const ERROR_SNIPPET_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("Gemini API rate limited (429): {0}")]
    RateLimited(String),

    #[error("Gemini API unavailable (503): {0}")]
    Unavailable(String),

    #[error("Gemini API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("model returned no text (possibly blocked by safety filters)")]
    EmptyResponse,

    #[error("invalid response body: {0}")]
    Decode(reqwest::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl GeminiError {
    /// 503 and 429 are worth retrying; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, GeminiError::RateLimited(_) | GeminiError::Unavailable(_))
    }
}

/// Abstraction over a text generation backend.
/// Implemented by `GeminiClient` for production; mock implementations used in tests.
#[allow(async_fn_in_trait)]
pub trait Generator {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, GeminiError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &self.api_key)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(http: Client, settings: &GeminiSettings) -> Self {
        Self {
            http,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey::new("test-key"),
            model: crate::config::DEFAULT_GEMINI_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn generate_content(
        &self,
        request: &GenerateRequest<'_>,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let body = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), request.content)],
            system_instruction: Some(Content::text(None, request.system_instruction)),
            generation_config: request
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GenerateContentResponse>(&text)
                .ok()
                .and_then(|body| body.error)
                .and_then(|err| err.message)
                .unwrap_or_else(|| format!("HTTP {status}: {}", snippet(&text)));
            let classified = classify_status(status.as_u16(), message);
            warn!(error = %classified, "Gemini API error");
            return Err(classified);
        }

        let body: GenerateContentResponse = response.json().await.map_err(GeminiError::Decode)?;
        debug!(model = %self.model, "gemini generation complete");

        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }
}

impl Generator for GeminiClient {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, GeminiError> {
        let response = self.generate_content(&request).await?;
        extract_text(&response).ok_or(GeminiError::EmptyResponse)
    }
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(ERROR_SNIPPET_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn classify_status(code: u16, message: String) -> GeminiError {
    match StatusCode::from_u16(code) {
        Ok(StatusCode::TOO_MANY_REQUESTS) => GeminiError::RateLimited(message),
        Ok(StatusCode::SERVICE_UNAVAILABLE) => GeminiError::Unavailable(message),
        _ => GeminiError::Api { code, message },
    }
}

fn classify_api_error(err: &ApiError) -> GeminiError {
    let message = err
        .message
        .clone()
        .or_else(|| err.status.clone())
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(code) => classify_status(code, message),
        None => GeminiError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}
