//! Best-effort scrubbing of tool-output dumps leaked into model text.
//!
//! The system instruction already forbids echoing raw tool data; this only
//! catches what slips through.

use std::sync::LazyLock;

use regex_lite::Regex;

const LEAK_PATTERNS: [&str; 2] = [
    // ```tool_outputs ... ``` (or ```tool_output)
    r"(?s)```tool_outputs?.*?```",
    // Stringified dumps: tool_outputs\n' + ...}
    r"(?s)tool_outputs\n' \+.*?\}",
];

static LEAKS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| LEAK_PATTERNS.iter().filter_map(|p| Regex::new(p).ok()).collect());

/// Strip leaked tool-output blocks.
///
/// Text without a leak is returned unchanged; otherwise the remainder is trimmed.
pub fn sanitize(text: &str) -> String {
    let mut cleaned = text.to_string();
    let mut stripped = false;
    for re in LEAKS.iter() {
        if re.is_match(&cleaned) {
            cleaned = re.replace_all(&cleaned, "").into_owned();
            stripped = true;
        }
    }
    if stripped {
        cleaned.trim().to_string()
    } else {
        cleaned
    }
}
