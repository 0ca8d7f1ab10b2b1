//! Academic search via the Serper Scholar API.

pub mod client;
pub mod types;

pub use client::{ScholarSearch, SearchError, SerperClient};
pub use types::SearchResult;
