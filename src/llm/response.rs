//! Shared "`N: text`" response parser used by batched translation (§4.2.2),
//! word-aligned redistribution (§4.2.3) and proofreading (§4.3). Grounded in
//! the teacher's bracket-based `parse_batch_response` in the original
//! `translate/gemini.rs`, generalized to the colon-delimited convention this
//! spec requires and made tolerant of blank lines and leading enumerators.

use regex::Regex;
use std::sync::OnceLock;

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*\[?(\d+)\]?\s*[:.\)]\s*(.+?)\s*$").unwrap())
}

/// Parse "N: text" lines (tolerating "[N]", "N.", "N)") into a dense
/// `1..=count` indexed vector. Slots with no matching line are `None` so
/// callers can distinguish "missing" from "returned empty".
pub fn parse_numbered_lines(text: &str, count: usize) -> Vec<Option<String>> {
    let mut results: Vec<Option<String>> = vec![None; count];
    for cap in line_pattern().captures_iter(text) {
        let Ok(idx) = cap[1].parse::<usize>() else {
            continue;
        };
        if idx >= 1 && idx <= count {
            results[idx - 1] = Some(cap[2].trim().to_string());
        }
    }
    results
}

/// Parse "N: text" lines without a fixed expected count, preserving
/// document order. Used by word-aligned redistribution, where `N` is a
/// source-word index rather than a batch position and the fragment count
/// isn't known ahead of parsing.
pub fn parse_indexed_pairs(text: &str) -> Vec<(usize, String)> {
    line_pattern()
        .captures_iter(text)
        .filter_map(|cap| {
            let idx = cap[1].parse::<usize>().ok()?;
            Some((idx, cap[2].trim().to_string()))
        })
        .collect()
}
