//! Step Executor: runs a plan as a chain of handler sub-conversations.
//!
//! The [`Dispatcher`] trait decouples plan execution from how a step reaches
//! its handler. [`HandlerDispatcher`](crate::agents::handler::HandlerDispatcher)
//! runs real conversations; tests use recording dispatchers.

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument};

use crate::core::step_context::build_step_contexts;
use crate::core::types::{Plan, StepSummary};
use crate::io::prompt::step_message;

/// Question used to condense each step's sub-conversation.
pub const SUMMARY_QUESTION: &str = "What specific action did you take in this step?";

/// One step, addressed to one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRequest {
    pub handler: String,
    /// Rendered Step Context.
    pub message: String,
    /// Upper bound on handler turns.
    pub max_turns: u32,
    pub summary_prompt: String,
}

/// Abstraction over step dispatch backends.
pub trait Dispatcher {
    /// Run one step and return its reflective summary.
    fn dispatch(&self, request: &StepRequest) -> Result<String>;
}

impl<D: Dispatcher + ?Sized> Dispatcher for &D {
    fn dispatch(&self, request: &StepRequest) -> Result<String> {
        (**self).dispatch(request)
    }
}

/// Execute `plan` once, step by step in plan order.
///
/// A plan whose handler and instruction lists differ in length is an error
/// and nothing is dispatched. All step messages are built before the first
/// dispatch. The first failing
/// step aborts the batch and its error is returned; isolation is the
/// workflow runner's job.
#[instrument(skip_all, fields(steps = plan.len()))]
pub fn execute_plan<D: Dispatcher>(
    dispatcher: &D,
    plan: &Plan,
    original_command: &str,
    max_turns: u32,
) -> Result<Vec<StepSummary>> {
    if !plan.is_aligned() {
        bail!(
            "plan has {} handler(s) but {} instruction(s)",
            plan.sequence.len(),
            plan.instructions.len()
        );
    }
    if plan.is_empty() {
        debug!("empty plan, nothing to execute");
        return Ok(Vec::new());
    }

    let batch = build_step_contexts(plan, original_command)
        .into_iter()
        .map(|ctx| -> Result<(usize, StepRequest)> {
            let message = step_message(&ctx)
                .with_context(|| format!("render step {}", ctx.step_index + 1))?;
            Ok((
                ctx.step_index,
                StepRequest {
                    handler: ctx.handler,
                    message,
                    max_turns,
                    summary_prompt: SUMMARY_QUESTION.to_string(),
                },
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut summaries = Vec::with_capacity(batch.len());
    for (step_index, request) in batch {
        info!(step = step_index + 1, total = plan.len(), handler = %request.handler, "dispatching step");
        let summary = dispatcher
            .dispatch(&request)
            .with_context(|| format!("step {} ({})", step_index + 1, request.handler))?;
        summaries.push(StepSummary {
            step_index,
            handler: request.handler,
            summary,
        });
    }
    Ok(summaries)
}
