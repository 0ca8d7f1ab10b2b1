//! Chunked LLM translation and scholarly search synthesis.
//!
//! Two workflows share one retrying generation client:
//! - [`Assistant::translate`] splits text into fixed-size chunks and
//!   translates them in order.
//! - [`Assistant::synthesize`] queries Serper Scholar and asks Gemini for a
//!   cited answer grounded in the returned snippets.

pub mod assistant;
pub mod config;
pub mod gemini;
mod markdown;
pub mod outcome;
pub mod retry;
pub mod scholar;
pub mod synthesis;
#[cfg(test)]
mod testing;
pub mod translate;

pub use assistant::Assistant;
pub use config::{Config, ConfigError};
pub use outcome::{FailureKind, Outcome, PipelineError};

pub const USER_AGENT: &str = concat!("scholarly/", env!("CARGO_PKG_VERSION"));
