use tracing::warn;

use super::types::GenerateContentResponse;

/// Concatenates the text parts of the first candidate.
///
/// Returns `None` when the model produced no text, which usually means the
/// answer was blocked by a safety filter.
pub fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.as_ref().and_then(|c| c.first());

    let text: String = candidate
        .and_then(|c| c.content.as_ref())
        .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate
            .and_then(|c| c.finish_reason.as_deref())
            .unwrap_or("none");
        warn!(finish_reason = reason, "Gemini returned empty answer");
        return None;
    }

    Some(text)
}
