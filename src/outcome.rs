use std::fmt;

use crate::config::ConfigError;
use crate::gemini::GeminiError;
use crate::markdown::sanitize_inline;
use crate::scholar::SearchError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Query must not be empty.")]
    EmptyQuery,

    #[error(
        "Translation failed at chunk {chunk}/{total}: the service is still overloaded after {attempts} attempts ({last}). Please retry later."
    )]
    TranslationExhausted {
        chunk: usize,
        total: usize,
        attempts: u32,
        last: GeminiError,
    },

    #[error("Translation failed at chunk {chunk}/{total}: {source}")]
    TranslationFailed {
        chunk: usize,
        total: usize,
        #[source]
        source: GeminiError,
    },

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error(
        "The language model is still overloaded after {attempts} attempts. Please retry in a few minutes."
    )]
    SynthesisExhausted { attempts: u32, last: GeminiError },

    #[error("Synthesis failed: {0}")]
    Synthesis(#[source] GeminiError),
}

/// Coarse failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Config,
    TransientExhausted,
    Fatal,
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Config(_) => FailureKind::Config,
            PipelineError::TranslationExhausted { .. } | PipelineError::SynthesisExhausted { .. } => {
                FailureKind::TransientExhausted
            }
            PipelineError::EmptyQuery
            | PipelineError::TranslationFailed { .. }
            | PipelineError::Search(_)
            | PipelineError::Synthesis(_) => FailureKind::Fatal,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Completed(String),
    /// The search succeeded but returned nothing; not a failure.
    NoResults { query: String },
    Failed(PipelineError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Result<String, PipelineError>> for Outcome {
    fn from(result: Result<String, PipelineError>) -> Self {
        match result {
            Ok(text) => Outcome::Completed(text),
            Err(e) => Outcome::Failed(e),
        }
    }
}

impl From<PipelineError> for Outcome {
    fn from(e: PipelineError) -> Self {
        Outcome::Failed(e)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed(text) => f.write_str(text),
            Outcome::NoResults { query } => write!(
                f,
                "No academic results found for query: **{}**.",
                sanitize_inline(query)
            ),
            Outcome::Failed(e) => write!(f, "{e}"),
        }
    }
}
