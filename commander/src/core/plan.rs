//! Planner response parsing and validation.
//!
//! The planner answers with two labelled list literals:
//!
//! ```text
//! Sequence: ['set_automatic_framing_agent', 'set_automatic_framing_agent']
//! State: ['set automatic framing on', 'set automatic framing off']
//! ```
//!
//! Any deviation rejects the whole response; callers degrade a rejection to
//! [`Plan::empty`].

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::literal::{LiteralError, parse_string_list};
use crate::core::types::Plan;
use crate::registry::CapabilityRegistry;

pub const SEQUENCE_MARKER: &str = "Sequence:";
pub const STATE_MARKER: &str = "State:";

/// Why a planner response was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanRejection {
    #[error("response missing `Sequence:` or `State:`")]
    MissingMarkers,
    #[error("{section} section is not a list of strings: {source}")]
    NotAList {
        section: &'static str,
        #[source]
        source: LiteralError,
    },
    #[error("unknown handler(s): {}", .0.join(", "))]
    UnknownHandlers(Vec<String>),
    #[error("sequence has {sequence} step(s) but state has {instructions}")]
    LengthMismatch { sequence: usize, instructions: usize },
}

/// Split, parse and validate a planner response against `registry`.
///
/// Checks run in order: both markers present, both sections are lists of
/// strings, every sequence entry is a registered handler, and both lists have
/// the same length.
pub fn parse_plan_response(
    response: &str,
    registry: &CapabilityRegistry,
) -> Result<Plan, PlanRejection> {
    let (sequence_part, state_part) = split_sections(response).ok_or(PlanRejection::MissingMarkers)?;

    let sequence = parse_string_list(sequence_part).map_err(|source| PlanRejection::NotAList {
        section: "Sequence",
        source,
    })?;
    let instructions = parse_string_list(state_part).map_err(|source| PlanRejection::NotAList {
        section: "State",
        source,
    })?;

    let mut seen = BTreeSet::new();
    let unknown: Vec<String> = sequence
        .iter()
        .filter(|name| !registry.contains_handler(name))
        .filter(|name| seen.insert(*name))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(PlanRejection::UnknownHandlers(unknown));
    }

    if sequence.len() != instructions.len() {
        return Err(PlanRejection::LengthMismatch {
            sequence: sequence.len(),
            instructions: instructions.len(),
        });
    }

    Ok(Plan {
        sequence,
        instructions,
    })
}

/// Text between the first `Sequence:` and the following `State:`, and the
/// text after that `State:`.
fn split_sections(response: &str) -> Option<(&str, &str)> {
    let (_, after_sequence) = response.split_once(SEQUENCE_MARKER)?;
    let (sequence_part, state_part) = after_sequence.split_once(STATE_MARKER)?;
    Some((sequence_part.trim(), state_part.trim()))
}
