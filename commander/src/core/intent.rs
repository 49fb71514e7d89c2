//! Line-oriented parser for interpreter responses.
//!
//! The interpreter answers with three `KEY: value` lines (`TYPE`, `ITERATIONS`,
//! `QUERY`) in any order. Parsing never fails: whatever cannot be read keeps
//! its default.

use crate::core::types::{Intent, IntentKind};

/// Parse an interpreter response into an [`Intent`].
///
/// - blank lines are skipped
/// - lines without a `:` are skipped; only the first `:` separates key and value
/// - unknown keys are ignored
/// - a non-integer `ITERATIONS` falls back to `1`
/// - a missing or unrecognised `TYPE`, or a missing `QUERY`, stays `None`;
///   an empty `QUERY:` line reads as `Some("")`
pub fn parse_interpreter_response(response: &str) -> Intent {
    let mut intent = Intent::default();

    for line in response.trim().lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "TYPE" => intent.kind = IntentKind::from_token(value),
            "ITERATIONS" => intent.iterations = value.parse().unwrap_or(1),
            "QUERY" => intent.normalized_command = Some(value.to_string()),
            _ => {}
        }
    }

    intent
}
