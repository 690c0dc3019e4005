//! Line-level candidate filter (spec §4.2 step 3): list-marker stripping
//! plus a minimum-length threshold, ahead of the identity-bearing LLM
//! filter.

use regex::Regex;
use std::sync::OnceLock;

/// Candidate text shorter than this after marker removal is discarded
/// without spending an LLM call on it.
pub const MIN_CANDIDATE_LEN: usize = 8;

fn list_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"^\s*(?:[-*+•]|\d+[.)])\s+").expect("static regex"))
}

/// Strips a leading bullet/number marker and returns the remainder if it
/// clears [`MIN_CANDIDATE_LEN`], else `None`.
pub fn extract_candidate(line: &str) -> Option<String> {
    let marker = list_marker();
    let stripped = match marker.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    let trimmed = stripped.trim();
    if trimmed.chars().count() >= MIN_CANDIDATE_LEN {
        Some(trimmed.to_string())
    } else {
        None
    }
}
