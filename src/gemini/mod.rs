pub mod client;
mod response;
pub mod types;

pub use client::{GeminiClient, GeminiError, Generator};
pub use types::GenerateRequest;
