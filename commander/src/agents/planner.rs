//! Plan Builder agent (sequencer).

use tracing::{info, instrument, warn};

use crate::core::plan::{PlanRejection, parse_plan_response};
use crate::core::types::Plan;
use crate::io::completion::{Completer, CompletionRequest};
use crate::io::prompt::planner_prompt;
use crate::registry::CapabilityRegistry;

const SYSTEM_MESSAGE: &str = "You plan camera control operations. You pick handlers from the list \
     you are given and answer with the two labelled lists you are asked for.";

/// Turns a normalized command into a [`Plan`] with one completion call.
#[derive(Debug, Clone, Default)]
pub struct PlannerAgent;

impl PlannerAgent {
    pub fn new() -> Self {
        Self
    }

    /// Build a plan for `task`. Any failure degrades to [`Plan::empty`]; there
    /// are no retries.
    #[instrument(skip_all)]
    pub fn run<C: Completer>(&self, completer: &C, task: &str, registry: &CapabilityRegistry) -> Plan {
        let response = planner_prompt(task, registry).and_then(|prompt| {
            completer.complete(&CompletionRequest::new(prompt).with_system(SYSTEM_MESSAGE))
        });
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "planner call failed, using empty plan");
                return Plan::empty();
            }
        };

        match parse_plan_response(&response, registry) {
            Ok(plan) => {
                info!(sequence = ?plan.sequence, "built plan");
                plan
            }
            Err(PlanRejection::UnknownHandlers(names)) => {
                warn!(invalid = ?names, response = %response, "plan names unknown handlers, using empty plan");
                Plan::empty()
            }
            Err(rejection) => {
                warn!(reason = %rejection, response = %response, "plan rejected, using empty plan");
                Plan::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCompleter, sample_registry};

    #[test]
    fn builds_plan_from_reply() {
        let registry = sample_registry();
        let completer = ScriptedCompleter::new([
            "Sequence: ['set_automatic_framing_agent', 'set_automatic_framing_agent']\n\
             State: ['set automatic framing on', 'set automatic framing off']",
        ]);
        let plan = PlannerAgent::new().run(
            &completer,
            "set automatic framing to on then set automatic framing to off",
            &registry,
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.instructions[1], "set automatic framing off");
        assert!(completer.requests()[0].prompt.contains("set_blur_type_agent"));
    }

    #[test]
    fn malformed_reply_yields_empty_plan() {
        let registry = sample_registry();
        let completer = ScriptedCompleter::new(["['open_camera_agent']"]);
        let plan = PlannerAgent::new().run(&completer, "open the camera", &registry);
        assert_eq!(plan, Plan::empty());
    }

    #[test]
    fn unknown_handler_yields_empty_plan() {
        let registry = sample_registry();
        let completer =
            ScriptedCompleter::new(["Sequence: ['open_camera_agent', 'zoom_agent']\nState: ['open', 'zoom']"]);
        let plan = PlannerAgent::new().run(&completer, "open and zoom", &registry);
        assert_eq!(plan, Plan::empty());
    }

    #[test]
    fn failed_call_yields_empty_plan_after_single_attempt() {
        let registry = sample_registry();
        let completer = ScriptedCompleter::with_results([Err("timeout")]);
        let plan = PlannerAgent::new().run(&completer, "open the camera", &registry);
        assert!(plan.is_empty());
        assert_eq!(completer.calls(), 1);
    }
}
