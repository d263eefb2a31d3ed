//! Recovering a JSON object from chat-completion text.
//!
//! Models are told to answer with bare JSON but routinely wrap it in
//! markdown fences or add a sentence before or after. Extraction trims,
//! drops every fence marker, then keeps the span from the first `{` to the
//! last `}`.

use serde::de::DeserializeOwned;

/// Strip markdown fences and surrounding prose from `content`.
///
/// The returned string is not guaranteed to be valid JSON; it is the best
/// candidate for [`serde_json::from_str`].
pub fn extract_object(content: &str) -> String {
    let mut cleaned = strip_fences(content.trim());

    if let Some(start) = cleaned.find('{') {
        cleaned.drain(..start);
    }
    if let Some(end) = cleaned.rfind('}') {
        cleaned.truncate(end + 1);
    }

    cleaned.trim().to_string()
}

/// Extract and deserialize in one step.
pub fn parse_object<T: DeserializeOwned>(content: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(&extract_object(content))
}

/// Remove ```` ```json ```` (any case) and bare ```` ``` ```` markers.
fn strip_fences(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        if rest.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            rest = &rest[4..];
        }
    }
    out.push_str(rest);
    out
}
