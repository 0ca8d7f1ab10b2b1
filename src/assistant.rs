use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::gemini::{GeminiClient, Generator};
use crate::outcome::{Outcome, PipelineError};
use crate::scholar::{ScholarSearch, SerperClient};
use crate::synthesis::Orchestrator;
use crate::translate::Translator;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for any single request; per-call timeouts are tighter.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Entry point for the translate and synthesize workflows.
///
/// Either client may be absent; the workflow that needs it then fails with
/// a configuration error before any network call is made.
///
/// Configuration via environment variables (see [`Config`]):
/// - `GEMINI_API_KEY` / `GOOGLE_API_KEY`: enables translation and synthesis
/// - `SERPER_API_KEY`: enables scholarly search for synthesis
pub struct Assistant<G = GeminiClient, S = SerperClient> {
    generator: Option<G>,
    search: Option<S>,
    language: String,
    max_retries: u32,
}

impl Assistant {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .build()?;
        let generator = config
            .gemini()
            .inspect_err(|e| warn!("Gemini client not available: {e}"))
            .ok()
            .map(|settings| GeminiClient::new(http.clone(), settings));
        let search = config
            .scholar()
            .inspect_err(|e| warn!("scholar search not available: {e}"))
            .ok()
            .map(|settings| SerperClient::new(http.clone(), settings));
        Ok(Self::new(
            generator,
            search,
            config.language.clone(),
            config.max_retries,
        ))
    }
}

impl<G: Generator, S: ScholarSearch> Assistant<G, S> {
    pub fn new(
        generator: Option<G>,
        search: Option<S>,
        language: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            generator,
            search,
            language: language.into(),
            max_retries: max_retries.max(1),
        }
    }

    /// Default target language for translations and answers.
    pub fn language(&self) -> &str {
        &self.language
    }

    fn generator(&self) -> Result<&G, ConfigError> {
        self.generator.as_ref().ok_or(ConfigError::GeminiKeyNotSet)
    }

    fn search(&self) -> Result<&S, ConfigError> {
        self.search.as_ref().ok_or(ConfigError::SerperKeyNotSet)
    }

    pub async fn translate_outcome(&self, text: &str, target_language: &str) -> Outcome {
        let generator = match self.generator() {
            Ok(g) => g,
            Err(e) => return PipelineError::from(e).into(),
        };

        info!(chars = text.chars().count(), target = target_language, "translate");

        Translator::new(generator, self.max_retries)
            .translate(text, target_language)
            .await
            .into()
    }

    /// Translates `text`, rendering any failure as readable text.
    pub async fn translate(&self, text: &str, target_language: &str) -> String {
        self.translate_outcome(text, target_language).await.to_string()
    }

    pub async fn synthesize_outcome(&self, query: &str) -> Outcome {
        let (generator, search) = match (self.generator(), self.search()) {
            (Ok(g), Ok(s)) => (g, s),
            (Err(e), _) | (_, Err(e)) => return PipelineError::from(e).into(),
        };

        let query = query.trim();
        if query.is_empty() {
            return PipelineError::EmptyQuery.into();
        }

        info!(query, "synthesize");

        Orchestrator::new(generator, search, &self.language, self.max_retries)
            .synthesize(query)
            .await
    }

    /// Answers `query` from scholarly sources, rendering any failure as readable text.
    pub async fn synthesize(&self, query: &str) -> String {
        self.synthesize_outcome(query).await.to_string()
    }
}
