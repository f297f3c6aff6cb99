//! Layered JSON recovery for model output
//!
//! Local models frequently wrap JSON in prose or markdown fences, or emit
//! trailing commas. Recovery is an ordered chain of pure stages; the first
//! stage that yields a JSON object wins, and content is never invented when
//! all of them fail.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Bound on candidate spans tried by the field-anchored stage
const MAX_ANCHOR_ATTEMPTS: usize = 64;

/// Which stage produced the object (logged, and useful in tests)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStage {
    /// Whole response parsed as-is
    Direct,
    /// Extracted from a ```json fenced block
    Fenced,
    /// First-to-last brace region, trailing commas stripped
    BraceRegion,
    /// Narrower brace span located around the required field name
    FieldAnchored,
}

/// A recovered JSON object and the stage that produced it
#[derive(Debug, Clone)]
pub struct Recovered {
    pub value: Value,
    pub stage: RecoveryStage,
}

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("static regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("static regex"))
}

/// Remove trailing commas before closing brackets
fn strip_trailing_commas(s: &str) -> String {
    trailing_comma_re().replace_all(s, "${1}").into_owned()
}

fn parse_object(s: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(s.trim()) {
        Ok(v) if v.is_object() => Some(v),
        _ => None,
    }
}

/// Recover a JSON object from raw model output.
///
/// `required_field` names the key the plan shape hinges on ("meals" or
/// "sessions"); the last stage anchors its span search on it.
pub fn recover_json(raw: &str, required_field: &str) -> Result<Recovered> {
    // Stage 1: the whole response is already JSON
    if let Some(value) = parse_object(raw) {
        return Ok(Recovered {
            value,
            stage: RecoveryStage::Direct,
        });
    }

    // Stage 2: fenced markdown block
    if let Some(captures) = fenced_block_re().captures(raw) {
        if let Some(inner) = captures.get(1) {
            if let Some(value) = parse_object(&strip_trailing_commas(inner.as_str())) {
                debug!("Recovered plan JSON from fenced block");
                return Ok(Recovered {
                    value,
                    stage: RecoveryStage::Fenced,
                });
            }
        }
    }

    // Stage 3: everything between the first '{' and the last '}'
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            let region = &raw[start..=end];
            if let Some(value) = parse_object(&strip_trailing_commas(region)) {
                debug!("Recovered plan JSON from brace region");
                return Ok(Recovered {
                    value,
                    stage: RecoveryStage::BraceRegion,
                });
            }
        }
    }

    // Stage 4: try narrower brace spans that still contain the field, for when
    // stray braces in surrounding prose poison the widest region
    if let Some(recovered) = anchored_spans(raw, required_field) {
        debug!("Recovered plan JSON anchored on '{}'", required_field);
        return Ok(recovered);
    }

    Err(Error::Parse(format!(
        "Model response contained no recoverable JSON object with '{}'",
        required_field
    )))
}

/// Try `{...}` spans (later opens first, widest close first) that contain the
/// quoted field name, bounded to keep the scan cheap
fn anchored_spans(raw: &str, required_field: &str) -> Option<Recovered> {
    let needle = format!("\"{}\"", required_field);
    let opens: Vec<usize> = raw.match_indices('{').map(|(i, _)| i).collect();
    let closes: Vec<usize> = raw.match_indices('}').map(|(i, _)| i).collect();

    let mut attempts = 0usize;
    for &start in &opens {
        for &end in closes.iter().rev() {
            if end <= start {
                break;
            }
            attempts += 1;
            if attempts > MAX_ANCHOR_ATTEMPTS {
                return None;
            }

            let region = &raw[start..=end];
            if !region.contains(&needle) {
                continue;
            }
            if let Some(value) = parse_object(&strip_trailing_commas(region)) {
                return Some(Recovered {
                    value,
                    stage: RecoveryStage::FieldAnchored,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{"meals": [{"name": "breakfast", "items": []}]}"#;

    #[test]
    fn test_direct_parse() {
        let recovered = recover_json(CLEAN, "meals").unwrap();
        assert_eq!(recovered.stage, RecoveryStage::Direct);
        assert!(recovered.value["meals"].is_array());
    }

    #[test]
    fn test_fenced_block() {
        let raw = format!(
            "Here is your plan:\n```json\n{}\n```\nEnjoy your day!",
            CLEAN
        );
        let recovered = recover_json(&raw, "meals").unwrap();
        assert_eq!(recovered.stage, RecoveryStage::Fenced);
    }

    #[test]
    fn test_fence_without_language_tag() {
        let raw = format!("```\n{}\n```", CLEAN);
        let recovered = recover_json(&raw, "meals").unwrap();
        assert_eq!(recovered.stage, RecoveryStage::Fenced);
    }

    #[test]
    fn test_brace_region_with_trailing_commas() {
        let raw = r#"Sure! {"meals": [{"name": "lunch", "items": [],},],} Hope that helps."#;
        let recovered = recover_json(raw, "meals").unwrap();
        assert_eq!(recovered.stage, RecoveryStage::BraceRegion);
        assert_eq!(recovered.value["meals"][0]["name"], "lunch");
    }

    #[test]
    fn test_field_anchored_survives_stray_braces() {
        // The widest region is poisoned by an unbalanced brace in the prose
        let raw = r#"thinking { about it... final answer: {"sessions": [{"name": "walk"}]}"#;
        let recovered = recover_json(raw, "sessions").unwrap();
        assert_eq!(recovered.stage, RecoveryStage::FieldAnchored);
        assert_eq!(recovered.value["sessions"][0]["name"], "walk");
    }

    #[test]
    fn test_all_stages_fail() {
        let err = recover_json("I cannot produce a plan today.", "meals").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        let err = recover_json(r#""just a string""#, "meals").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_strip_trailing_commas() {
        assert_eq!(
            strip_trailing_commas(r#"{"a": [1, 2,],}"#),
            r#"{"a": [1, 2]}"#
        );
    }
}
