use serde::{Deserialize, Serialize};

pub(crate) const UNTITLED: &str = "Untitled";
pub(crate) const NO_SNIPPET: &str = "No description available";
pub(crate) const NO_LINK: &str = "#";

#[derive(Debug, Serialize)]
pub struct ScholarRequest<'a> {
    pub q: &'a str,
    pub num: u32,
    pub gl: &'a str,
    pub hl: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ScholarResponse {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
pub struct OrganicResult {
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub link: Option<String>,
}

/// One normalized search hit. `index` is 1-based, in provider order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub index: usize,
    pub title: String,
    pub snippet: String,
    pub link: String,
}

/// Assigns 1-based indices in response order and fills missing fields.
pub fn normalize(organic: Vec<OrganicResult>) -> Vec<SearchResult> {
    organic
        .into_iter()
        .enumerate()
        .map(|(i, hit)| SearchResult {
            index: i + 1,
            title: non_empty(hit.title).unwrap_or_else(|| UNTITLED.to_string()),
            snippet: non_empty(hit.snippet).unwrap_or_else(|| NO_SNIPPET.to_string()),
            link: non_empty(hit.link).unwrap_or_else(|| NO_LINK.to_string()),
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
