//! Structured-output parsing boundary.
//!
//! The planner gives back untyped text. Even when instructed to return only
//! a JSON document, models wrap output in prose or markdown fences, so the
//! document is carved out of the text first and only then deserialized.
//! Every failure is a tagged error; nothing here assumes well-formedness.

use serde::de::DeserializeOwned;

use super::errors::PlannerError;

/// Extract a JSON object from text that may be wrapped in prose or
/// markdown code fences. Falls back to the full text when no braces are
/// found, letting serde produce the error.
pub fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end >= start {
                return &text[start..=end];
            }
        }
    }
    text
}

/// Parse the planner's text output into an expected shape.
///
/// The raw response travels with the error so callers can log what the
/// model actually said.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, PlannerError> {
    let json_str = extract_json(text);
    serde_json::from_str::<T>(json_str).map_err(|e| PlannerError::StructuredOutputError {
        raw_response: text.to_string(),
        reason: e.to_string(),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
