//! Prompt rendering for every collaborator call.
//!
//! Templates live in `io/prompts/` and are compiled into the binary.

use std::sync::LazyLock;

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::types::{StepContext, TranscriptEntry};
use crate::registry::{Capability, CapabilityRegistry};

const INTERPRETER_TEMPLATE: &str = include_str!("prompts/interpreter.md");
const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const STEP_TEMPLATE: &str = include_str!("prompts/step.md");
const CONVERSATION_TEMPLATE: &str = include_str!("prompts/conversation.md");
const HANDLER_TURN_TEMPLATE: &str = include_str!("prompts/handler_turn.md");
const SUMMARY_TEMPLATE: &str = include_str!("prompts/summary.md");

static ENGINE: LazyLock<PromptEngine> = LazyLock::new(PromptEngine::new);

/// Handler listing for the planner prompt.
#[derive(Debug, Serialize)]
struct HandlerListing {
    name: String,
    capabilities: Vec<String>,
}

/// Capability listing for a handler turn.
#[derive(Debug, Serialize)]
struct CapabilityListing {
    name: String,
    description: String,
    parameters: String,
}

impl CapabilityListing {
    fn from_capability(capability: &Capability) -> Self {
        Self {
            name: capability.name.clone(),
            description: capability.description.clone(),
            parameters: capability.parameters.to_string(),
        }
    }
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for (name, source) in [
            ("interpreter", INTERPRETER_TEMPLATE),
            ("planner", PLANNER_TEMPLATE),
            ("step", STEP_TEMPLATE),
            ("conversation", CONVERSATION_TEMPLATE),
            ("handler_turn", HANDLER_TURN_TEMPLATE),
            ("summary", SUMMARY_TEMPLATE),
        ] {
            env.add_template(name, source)
                .expect("embedded prompt template should be valid");
        }
        Self { env }
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        let rendered = self.env.get_template(name)?.render(ctx)?;
        Ok(rendered.trim().to_string())
    }
}

/// Prompt asking the interpreter for `TYPE` / `ITERATIONS` / `QUERY`.
pub fn interpreter_prompt(raw_text: &str) -> Result<String> {
    ENGINE.render("interpreter", context! { query => raw_text.trim() })
}

/// Prompt asking the planner for `Sequence:` / `State:` lists over every
/// registered handler.
pub fn planner_prompt(task: &str, registry: &CapabilityRegistry) -> Result<String> {
    let handlers: Vec<HandlerListing> = registry
        .handler_names()
        .map(|name| HandlerListing {
            name: name.to_string(),
            capabilities: registry
                .capabilities_of(name)
                .map(|capability| capability.description.clone())
                .collect(),
        })
        .collect();
    ENGINE.render("planner", context! { task => task.trim(), handlers => handlers })
}

/// Framing message sent to the handler of one plan step.
pub fn step_message(step: &StepContext) -> Result<String> {
    ENGINE.render(
        "step",
        context! {
            original_command => &step.original_command,
            step_number => step.step_index + 1,
            total_steps => step.total_steps,
            instruction => &step.instruction,
            prior_steps => &step.prior_steps,
        },
    )
}

pub fn conversation_prompt(message: &str) -> Result<String> {
    ENGINE.render("conversation", context! { message => message.trim() })
}

/// Prompt for one handler turn: owned functions plus the transcript so far.
pub fn handler_turn_prompt(
    capabilities: &[&Capability],
    transcript: &[TranscriptEntry],
) -> Result<String> {
    let capabilities: Vec<CapabilityListing> = capabilities
        .iter()
        .map(|capability| CapabilityListing::from_capability(capability))
        .collect();
    ENGINE.render(
        "handler_turn",
        context! { capabilities => capabilities, transcript => transcript },
    )
}

/// Reflection prompt that condenses a finished sub-conversation.
pub fn summary_prompt(transcript: &[TranscriptEntry], question: &str) -> Result<String> {
    ENGINE.render(
        "summary",
        context! { transcript => transcript, summary_prompt => question },
    )
}
