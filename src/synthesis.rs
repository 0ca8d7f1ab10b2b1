//! Search-then-synthesize: scholarly search results become the grounding
//! context for a single cited answer from the generation backend.

use tracing::{debug, info};

use crate::gemini::{GeminiError, GenerateRequest, Generator};
use crate::markdown::escape_md_link;
use crate::outcome::{Outcome, PipelineError};
use crate::retry::{RetryError, RetryPolicy};
use crate::scholar::{ScholarSearch, SearchResult};

/// Number of scholarly results requested per query.
pub const NUM_RESULTS: u32 = 10;
/// Low temperature keeps the answer close to the snippets.
pub const TEMPERATURE: f32 = 0.1;

const SOURCES_HEADING: &str = "**Further reading:**";

fn system_instruction(language: &str) -> String {
    format!(
        "You are an expert research analyst. Synthesize the provided sources to answer the user's \
         question in detail and concisely, relying exclusively on the snippets you are given. \
         Write the answer in {language}. After answering you MUST provide the complete list of \
         the sources you cited, formatted as Markdown and referenced by their [[n]] numbers."
    )
}

/// Numbered reference block, one entry per result in index order.
pub fn build_context(results: &[SearchResult]) -> String {
    let mut context = String::new();
    for result in results {
        context.push_str(&format!(
            "[[{}]] Title: {}\nSnippet: {}\nLink: {}\n\n",
            result.index, result.title, result.snippet, result.link
        ));
    }
    context
}

fn user_prompt(query: &str, context: &str) -> String {
    format!(
        "Use the excerpts below to answer the question: '{query}'\n\n\
         --- SCHOLARLY SEARCH DATA ---\n\n{context}"
    )
}

/// Lists every retrieved result, cited or not, in index order.
/// Links are emitted as returned by the search provider.
pub fn format_sources(results: &[SearchResult]) -> String {
    let mut block = format!("\n\n{SOURCES_HEADING}\n");
    for result in results {
        block.push_str(&format!(
            "- [[{}]] [{}]({})\n",
            result.index,
            escape_md_link(&result.title),
            result.link
        ));
    }
    block
}

pub struct Orchestrator<'a, G, S> {
    generator: &'a G,
    search: &'a S,
    policy: RetryPolicy,
    language: &'a str,
    num_results: u32,
}

impl<'a, G: Generator, S: ScholarSearch> Orchestrator<'a, G, S> {
    pub fn new(generator: &'a G, search: &'a S, language: &'a str, max_attempts: u32) -> Self {
        Self {
            generator,
            search,
            policy: RetryPolicy::synthesis(max_attempts),
            language,
            num_results: NUM_RESULTS,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn synthesize(&self, query: &str) -> Outcome {
        let results = match self.search.search(query, self.num_results).await {
            Ok(results) => results,
            Err(e) => return PipelineError::from(e).into(),
        };

        if results.is_empty() {
            info!(query, "no scholarly results");
            return Outcome::NoResults {
                query: query.to_string(),
            };
        }

        let context = build_context(&results);
        let prompt = user_prompt(query, &context);
        let instruction = system_instruction(self.language);
        let request = GenerateRequest::new(&prompt, &instruction).with_temperature(TEMPERATURE);
        debug!(results = results.len(), context_chars = context.len(), "context built");

        let generator = self.generator;
        let answer = match self
            .policy
            .run(move || generator.generate(request), GeminiError::is_transient)
            .await
        {
            Ok(answer) => answer,
            Err(RetryError::Exhausted { attempts, last }) => {
                return PipelineError::SynthesisExhausted { attempts, last }.into();
            }
            Err(RetryError::Fatal(e)) => return PipelineError::Synthesis(e).into(),
        };

        info!(sources = results.len(), "synthesis complete");
        Outcome::Completed(answer + &format_sources(&results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;
    use crate::retry::Backoff;
    use crate::scholar::SearchError;
    use crate::testing::{MockGenerator, MockSearch, bad_request, result, unavailable};
    use std::time::Duration;

    fn three_results() -> Vec<SearchResult> {
        vec![
            result(1, "Quantum supremacy using a programmable superconducting processor", "https://nature.com/a"),
            result(2, "Quantum computing in the NISQ era", "https://quantum-journal.org/b"),
            result(3, "Polynomial-time algorithms for prime factorization", "https://arxiv.org/c"),
        ]
    }

    #[test]
    fn context_numbers_every_result() {
        let context = build_context(&three_results());
        assert!(context.starts_with("[[1]] Title: Quantum supremacy"));
        assert!(context.contains("[[2]] Title: Quantum computing in the NISQ era\nSnippet: "));
        assert!(context.contains("Link: https://arxiv.org/c\n\n"));
        let first = context.find("[[1]]").unwrap();
        let third = context.find("[[3]]").unwrap();
        assert!(first < third);
    }

    #[test]
    fn sources_escape_markdown_in_titles() {
        let block = format_sources(&[result(1, "Spin [1/2] systems (review)", "https://x.org")]);
        assert!(block.contains(r"- [[1]] [Spin \[1/2\] systems \(review\)](https://x.org)"));
    }

    #[test]
    fn sources_keep_links_with_parentheses_intact() {
        let link = "https://doi.org/10.1016/S0140-6736(20)30183-5";
        let block = format_sources(&[result(1, "Clinical features (Wuhan)", link)]);
        assert!(block.contains(&format!(r"[Clinical features \(Wuhan\)]({link})")), "got: {block}");
    }

    #[tokio::test]
    async fn quantum_computing_scenario() {
        let generator = MockGenerator::scripted(vec![Ok("Answer citing [[2]].".into())]);
        let search = MockSearch::with_results(three_results());

        let outcome = Orchestrator::new(&generator, &search, "Vietnamese", 3)
            .synthesize("quantum computing")
            .await;

        let text = match outcome {
            Outcome::Completed(text) => text,
            other => panic!("expected Completed, got: {other:?}"),
        };
        let expected = "Answer citing [[2]].\n\n**Further reading:**\n\
            - [[1]] [Quantum supremacy using a programmable superconducting processor](https://nature.com/a)\n\
            - [[2]] [Quantum computing in the NISQ era](https://quantum-journal.org/b)\n\
            - [[3]] [Polynomial-time algorithms for prime factorization](https://arxiv.org/c)\n";
        assert_eq!(text, expected);

        assert_eq!(search.captured_queries(), vec![("quantum computing".to_string(), 10)]);
        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].content.contains("'quantum computing'"));
        assert!(requests[0].content.contains("[[3]] Title: Polynomial-time"));
        assert!(requests[0].system_instruction.contains("Vietnamese"));
        assert_eq!(requests[0].temperature, Some(TEMPERATURE));
    }

    #[tokio::test]
    async fn source_list_ignores_what_the_model_cited() {
        let generator = MockGenerator::scripted(vec![Ok("No citations at all.".into())]);
        let search = MockSearch::with_results(three_results());

        let text = Orchestrator::new(&generator, &search, "English", 3)
            .synthesize("q")
            .await
            .to_string();

        let listed: Vec<_> = text
            .lines()
            .filter(|l| l.starts_with("- [["))
            .map(|l| &l[4..5])
            .collect();
        assert_eq!(listed, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn empty_search_returns_no_results_without_generation() {
        let generator = MockGenerator::echo();
        let search = MockSearch::with_results(Vec::new());

        let outcome = Orchestrator::new(&generator, &search, "Vietnamese", 3)
            .synthesize("obscure topic")
            .await;

        assert!(matches!(&outcome, Outcome::NoResults { query } if query == "obscure topic"));
        assert!(outcome.to_string().contains("**obscure topic**"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn search_failure_embeds_cause_and_skips_generation() {
        let generator = MockGenerator::echo();
        let search = MockSearch::failing(SearchError::Status {
            code: 401,
            body: "Unauthorized".into(),
        });

        let outcome = Orchestrator::new(&generator, &search, "Vietnamese", 3)
            .synthesize("q")
            .await;

        assert_eq!(outcome.error().map(PipelineError::kind), Some(FailureKind::Fatal));
        let text = outcome.to_string();
        assert!(text.starts_with("Search failed:"), "got: {text}");
        assert!(text.contains("401"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overloaded_generation_is_retried_then_succeeds() {
        let generator = MockGenerator::scripted(vec![
            Err(unavailable()),
            Err(unavailable()),
            Ok("Recovered.".into()),
        ]);
        let search = MockSearch::with_results(three_results());
        let start = tokio::time::Instant::now();

        let outcome = Orchestrator::new(&generator, &search, "Vietnamese", 3)
            .synthesize("q")
            .await;

        assert!(outcome.to_string().starts_with("Recovered.\n\n**Further reading:**"));
        assert_eq!(generator.calls(), 3);
        // 2s + 3s
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(search.captured_queries().len(), 1, "search is not retried");
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_overload_reports_exhaustion() {
        let generator = MockGenerator::scripted(vec![
            Err(unavailable()),
            Err(GeminiError::RateLimited("quota".into())),
            Err(unavailable()),
        ]);
        let search = MockSearch::with_results(three_results());

        let outcome = Orchestrator::new(&generator, &search, "Vietnamese", 3)
            .synthesize("q")
            .await;

        assert_eq!(
            outcome.error().map(PipelineError::kind),
            Some(FailureKind::TransientExhausted)
        );
        assert!(outcome.to_string().contains("still overloaded after 3 attempts"));
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_generation_error_propagates_immediately() {
        let generator = MockGenerator::scripted(vec![Err(bad_request())]);
        let search = MockSearch::with_results(three_results());
        let start = tokio::time::Instant::now();

        let outcome = Orchestrator::new(&generator, &search, "Vietnamese", 3)
            .synthesize("q")
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(PipelineError::Synthesis(GeminiError::Api { code: 400, .. }))
        ));
        assert!(outcome.to_string().contains("Invalid argument"));
        assert_eq!(generator.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn injected_policy_controls_attempts_and_waits() {
        let generator = MockGenerator::scripted(vec![
            Err(unavailable()),
            Err(unavailable()),
            Err(unavailable()),
        ]);
        let search = MockSearch::with_results(three_results());
        let policy = RetryPolicy::new(
            2,
            Backoff {
                base: 3,
                unit: Duration::from_secs(1),
                offset: Duration::from_secs(2),
            },
        );
        let start = tokio::time::Instant::now();

        let outcome = Orchestrator::new(&generator, &search, "Vietnamese", 5)
            .with_policy(policy)
            .synthesize("q")
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(PipelineError::SynthesisExhausted { attempts: 2, .. })
        ));
        assert_eq!(generator.calls(), 2);
        // single wait of 3^0 + 2 seconds
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}
