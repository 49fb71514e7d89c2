//! Value types passed down the interpretation pipeline.
//!
//! Every type here is produced once per input, never mutated afterwards, and
//! discarded when the message has been handled.

use serde::Serialize;

/// Classification of a raw user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    /// Actionable command: goes through planning and execution.
    Task,
    /// Small talk: answered by the conversation fallback.
    Conversation,
    /// Could not be classified: answered by the conversation fallback.
    Unclear,
}

impl IntentKind {
    /// Parse the wire token used by the interpreter (`TASK`, `CONVERSATION`, `UNCLEAR`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TASK" => Some(Self::Task),
            "CONVERSATION" => Some(Self::Conversation),
            "UNCLEAR" => Some(Self::Unclear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "TASK",
            Self::Conversation => "CONVERSATION",
            Self::Unclear => "UNCLEAR",
        }
    }
}

/// Structured interpretation of a raw message.
///
/// `iterations` is signed: the interpreter may answer `0` or a negative
/// number, which the workflow runner treats as "run zero times".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub kind: Option<IntentKind>,
    pub iterations: i64,
    pub normalized_command: Option<String>,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            kind: None,
            iterations: 1,
            normalized_command: None,
        }
    }
}

impl Intent {
    /// True when the message should bypass planning.
    ///
    /// Only an explicit `CONVERSATION` or `UNCLEAR` does; a missing or
    /// unrecognised kind is treated as a task.
    pub fn is_conversational(&self) -> bool {
        matches!(
            self.kind,
            Some(IntentKind::Conversation | IntentKind::Unclear)
        )
    }

    /// Command to plan from: the normalized command, or the raw text when
    /// the interpreter gave none or left it blank.
    pub fn planning_command<'a>(&'a self, raw_text: &'a str) -> &'a str {
        self.normalized_command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
            .unwrap_or_else(|| raw_text.trim())
    }
}

/// Ordered handler invocations with index-aligned instructions.
///
/// `instructions[i]` describes what `sequence[i]` must do. The empty plan is
/// a valid no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub sequence: Vec<String>,
    pub instructions: Vec<String>,
}

impl Plan {
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when every handler has exactly one instruction.
    pub fn is_aligned(&self) -> bool {
        self.sequence.len() == self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Iterate `(handler, instruction)` pairs in execution order.
    pub fn steps(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sequence
            .iter()
            .map(String::as_str)
            .zip(self.instructions.iter().map(String::as_str))
    }
}

/// A step that already ran, as seen by later steps.
///
/// Only the ordinal and the handler name are carried forward, never the
/// step's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorStep {
    /// 1-based step number.
    pub ordinal: usize,
    pub handler: String,
}

/// Framing for a single plan step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepContext {
    pub original_command: String,
    /// 0-based position in the plan.
    pub step_index: usize,
    pub total_steps: usize,
    pub handler: String,
    pub instruction: String,
    pub prior_steps: Vec<PriorStep>,
}

/// Reflective summary returned by one step's sub-conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    pub step_index: usize,
    pub handler: String,
    pub summary: String,
}

/// Speaker of one sub-conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The orchestrator speaking on the user's behalf.
    User,
    /// The capability handler.
    Handler,
    /// Result of a function call, reported back to the handler.
    Function,
}

/// One message in a step's sub-conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

impl TranscriptEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
