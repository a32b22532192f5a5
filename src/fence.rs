//! Fenced JSON extraction
//!
//! Generation output wraps its payload in `<json>...</json>`, often with
//! prose or markdown around it.

pub const OPEN_FENCE: &str = "<json>";
pub const CLOSE_FENCE: &str = "</json>";

/// Return the trimmed text between the first opening fence and the first
/// closing fence after it, or an empty string when either is missing.
///
/// Backticks are stripped before searching. The result contains no fences,
/// so running it twice always yields an empty string.
pub fn extract_fenced_json(text: &str) -> String {
    let cleaned = text.replace('`', "");

    let Some(start) = cleaned.find(OPEN_FENCE) else {
        return String::new();
    };
    let body_start = start + OPEN_FENCE.len();

    let Some(len) = cleaned[body_start..].find(CLOSE_FENCE) else {
        return String::new();
    };

    cleaned[body_start..body_start + len].trim().to_string()
}
