use std::collections::VecDeque;
use std::sync::Mutex;

use crate::gemini::{GeminiError, GenerateRequest, Generator};
use crate::scholar::{ScholarSearch, SearchError, SearchResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CapturedRequest {
    pub content: String,
    pub system_instruction: String,
    pub temperature: Option<f32>,
}

/// Pops scripted responses in order; once the script is empty, echoes the
/// content back wrapped as `T(...)`.
pub(crate) struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, GeminiError>>>,
    requests: Mutex<Vec<CapturedRequest>>,
}

impl MockGenerator {
    pub fn echo() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn scripted(responses: Vec<Result<String, GeminiError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Generator for MockGenerator {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, GeminiError> {
        self.requests.lock().unwrap().push(CapturedRequest {
            content: request.content.to_string(),
            system_instruction: request.system_instruction.to_string(),
            temperature: request.temperature,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("T({})", request.content)))
    }
}

pub(crate) fn unavailable() -> GeminiError {
    GeminiError::Unavailable("The model is overloaded.".into())
}

pub(crate) fn bad_request() -> GeminiError {
    GeminiError::Api {
        code: 400,
        message: "Invalid argument".into(),
    }
}

pub(crate) struct MockSearch {
    response: Mutex<Option<Result<Vec<SearchResult>, SearchError>>>,
    queries: Mutex<Vec<(String, u32)>>,
}

impl MockSearch {
    pub fn with_results(results: Vec<SearchResult>) -> Self {
        Self {
            response: Mutex::new(Some(Ok(results))),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: SearchError) -> Self {
        Self {
            response: Mutex::new(Some(Err(error))),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn captured_queries(&self) -> Vec<(String, u32)> {
        self.queries.lock().unwrap().clone()
    }
}

impl ScholarSearch for MockSearch {
    async fn search(
        &self,
        query: &str,
        num_results: u32,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), num_results));
        self.response
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub(crate) fn result(index: usize, title: &str, link: &str) -> SearchResult {
    SearchResult {
        index,
        title: title.to_string(),
        snippet: format!("Snippet about {title}"),
        link: link.to_string(),
    }
}
