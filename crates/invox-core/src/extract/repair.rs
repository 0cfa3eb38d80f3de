//! Recovery of a structured record from malformed model replies.
//!
//! Replies arrive with commentary prepended, code fencing, auxiliary
//! nested objects, and trailing commas. Recovery scans for balanced
//! object spans with a string-literal-aware scanner, ranks candidates
//! longest-first, and accepts the first one that parses and carries an
//! anchor key. A naive single `{...}` match is not a substitute.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::error::ParseFailure;
use crate::models::record::InvoiceRecord;

lazy_static! {
    /// Code-fence markers, optionally with a json language tag.
    static ref FENCE: Regex = Regex::new(r"```(?:json|JSON)?").unwrap();

    /// Trailing comma immediately before a closing brace or bracket.
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

/// Top-level keys that distinguish the intended record from an incidental
/// nested object.
const ANCHOR_KEYS: [&str; 2] = ["invoice_number", "vendor"];

const EXCERPT_CHARS: usize = 200;

/// Recover the best candidate JSON object from a raw reply.
///
/// Idempotent on already-valid anchored JSON: the value comes back
/// exactly as parsed.
pub fn recover_value(raw: &str) -> Result<Value, ParseFailure> {
    if raw.trim().is_empty() {
        return Err(ParseFailure::Empty);
    }

    let stripped = FENCE.replace_all(raw, "");
    let stripped = stripped.trim();

    // Longest candidate first: the most complete object is most likely
    // the intended top-level record, not a nested sub-object.
    let mut candidates = balanced_objects(stripped);
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));

    for candidate in &candidates {
        if let Some(value) = parse_candidate(candidate) {
            if has_anchor_key(&value) {
                return Ok(value);
            }
        }
    }

    // Whole-text fallback: slice from the first '{' to the last '}'.
    if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) {
        if start < end {
            let slice = &stripped[start..=end];
            let fixed = TRAILING_COMMA.replace_all(slice, "$1");
            return match serde_json::from_str::<Value>(&fixed) {
                Ok(value) if has_anchor_key(&value) => Ok(value),
                Ok(_) => Err(ParseFailure::MissingAnchor {
                    excerpt: excerpt(stripped),
                }),
                Err(e) => Err(ParseFailure::Unparsable {
                    detail: e.to_string(),
                    excerpt: excerpt(stripped),
                }),
            };
        }
    }

    Err(ParseFailure::Unparsable {
        detail: "no object-like span found".to_string(),
        excerpt: excerpt(stripped),
    })
}

/// Recover a typed invoice record from a raw reply.
///
/// Unknown-shape input (a recovered object whose fields do not fit the
/// record schema) is rejected here rather than downstream.
pub fn repair(raw: &str) -> Result<InvoiceRecord, ParseFailure> {
    let value = recover_value(raw)?;
    serde_json::from_value(value).map_err(|e| ParseFailure::Shape(e.to_string()))
}

/// Every balanced top-level `{...}` span in the text.
///
/// Tracks string-literal state so braces inside strings do not count
/// toward nesting depth.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(span_start) = start.take() {
                            spans.push(&text[span_start..=idx]);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

fn parse_candidate(candidate: &str) -> Option<Value> {
    let fixed = TRAILING_COMMA.replace_all(candidate.trim(), "$1");
    serde_json::from_str(&fixed).ok()
}

fn has_anchor_key(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| ANCHOR_KEYS.iter().any(|key| map.contains_key(*key)))
}

fn excerpt(text: &str) -> String {
    let cut = crate::extract::prompt::truncate_chars(text, EXCERPT_CHARS);
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut.to_string()
    }
}
