//! Locating the JSON object in a model reply

use crate::error::{EnrichmentError, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```(?:json|JSON)?").ok()).as_ref()
}

/// Remove markdown code fences
pub fn strip_fences(text: &str) -> String {
    match fence_regex() {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.replace("```", "").trim().to_string(),
    }
}

/// Slice from the first `{` to the last `}` of the fence-stripped text
pub fn locate_json_object(text: &str) -> Option<String> {
    let stripped = strip_fences(text);
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end < start {
        return None;
    }
    Some(stripped[start..=end].to_string())
}

/// Extract and decode the JSON object embedded in a model reply
pub fn extract_json_object<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T> {
    if text.trim().is_empty() {
        return Err(EnrichmentError::EmptyResponse.into());
    }
    let json = locate_json_object(text).ok_or(EnrichmentError::NoJson)?;
    serde_json::from_str(&json).map_err(|e| EnrichmentError::InvalidJson(e.to_string()).into())
}
