//! Step Context construction for plan execution.

use crate::core::types::{Plan, PriorStep, StepContext};

/// Build the framing for every step of `plan`, in execution order.
///
/// Step `i` lists steps `0..i` by ordinal and handler name only; results of
/// earlier steps are not carried forward. Expects an aligned plan
/// ([`Plan::is_aligned`]).
pub fn build_step_contexts(plan: &Plan, original_command: &str) -> Vec<StepContext> {
    let total_steps = plan.len();
    plan.steps()
        .enumerate()
        .map(|(step_index, (handler, instruction))| StepContext {
            original_command: original_command.to_string(),
            step_index,
            total_steps,
            handler: handler.to_string(),
            instruction: instruction.to_string(),
            prior_steps: plan.sequence[..step_index]
                .iter()
                .enumerate()
                .map(|(idx, prior)| PriorStep {
                    ordinal: idx + 1,
                    handler: prior.clone(),
                })
                .collect(),
        })
        .collect()
}
