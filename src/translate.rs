use tracing::{debug, info};

use crate::gemini::{GeminiError, GenerateRequest, Generator};
use crate::outcome::PipelineError;
use crate::retry::{RetryError, RetryPolicy};

/// Maximum characters sent to the model per call.
pub const CHUNK_SIZE: usize = 7000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunk<'a> {
    pub position: usize,
    pub content: &'a str,
}

/// Hard cut every `size` characters, left to right, no overlap.
/// Cuts fall on `char` boundaries; sentence structure is ignored.
pub fn split_chunks(text: &str, size: usize) -> Vec<TextChunk<'_>> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    for (count, (byte, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            chunks.push(TextChunk {
                position: chunks.len(),
                content: &text[start..byte],
            });
            start = byte;
        }
    }
    if start < text.len() {
        chunks.push(TextChunk {
            position: chunks.len(),
            content: &text[start..],
        });
    }

    chunks
}

fn system_instruction(target_language: &str) -> String {
    format!(
        "You are a professional translator. Translate the following text into {target_language}. \
         Translate faithfully, preserve the original context and formatting (for example line breaks), \
         and reply with the translation only."
    )
}

pub struct Translator<'a, G> {
    generator: &'a G,
    policy: RetryPolicy,
    chunk_size: usize,
}

impl<'a, G: Generator> Translator<'a, G> {
    pub fn new(generator: &'a G, max_attempts: u32) -> Self {
        Self {
            generator,
            policy: RetryPolicy::translation(max_attempts),
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Translates chunk by chunk and joins the results with a single space.
    ///
    /// The first chunk that fails (fatally or after exhausting retries)
    /// aborts the whole translation.
    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, PipelineError> {
        let chunks = split_chunks(text, self.chunk_size);
        if chunks.is_empty() {
            return Ok(String::new());
        }

        let instruction = system_instruction(target_language);
        let total = chunks.len();
        let mut translated = Vec::with_capacity(total);
        let generator = self.generator;

        for chunk in &chunks {
            let number = chunk.position + 1;
            let request = GenerateRequest::new(chunk.content, &instruction);

            let text = self
                .policy
                .run(move || generator.generate(request), GeminiError::is_transient)
                .await
                .map_err(|e| match e {
                    RetryError::Exhausted { attempts, last } => PipelineError::TranslationExhausted {
                        chunk: number,
                        total,
                        attempts,
                        last,
                    },
                    RetryError::Fatal(source) => PipelineError::TranslationFailed {
                        chunk: number,
                        total,
                        source,
                    },
                })?;

            debug!(chunk = number, total, chars = chunk.content.chars().count(), "chunk translated");
            translated.push(text);
        }

        info!(
            chunks = total,
            target = target_language,
            max_attempts = self.policy.max_attempts(),
            "translation complete"
        );
        Ok(translated.join(" "))
    }
}
