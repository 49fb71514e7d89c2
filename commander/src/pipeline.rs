//! Message routing: interpret, then either answer conversationally or plan
//! and run the workflow.

use tracing::{info, instrument};

use crate::agents::conversation::ConversationAgent;
use crate::agents::interpreter::InterpreterAgent;
use crate::agents::planner::PlannerAgent;
use crate::core::types::{Intent, Plan};
use crate::execute::Dispatcher;
use crate::io::completion::Completer;
use crate::io::config::CommanderConfig;
use crate::registry::CapabilityRegistry;
use crate::workflow::{IterationOutcome, WorkflowOptions, WorkflowReport, run_workflow};

/// Outcome of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The message was not actionable and was answered directly.
    Conversation { intent: Intent, response: String },
    /// The message was planned; `report` is `None` when the plan was empty.
    Task {
        intent: Intent,
        command: String,
        plan: Plan,
        report: Option<WorkflowReport>,
    },
}

impl Reply {
    /// Chat-style lines describing the outcome, in display order.
    pub fn render(&self) -> Vec<String> {
        match self {
            Self::Conversation { response, .. } => vec![response.clone()],
            Self::Task {
                intent,
                command,
                plan,
                report,
            } => {
                let mut lines = vec![format!(
                    "Query Interpretation:\n  • Type: {}\n  • Iterations: {}\n  • Interpreted as: {}",
                    intent.kind.map_or("UNKNOWN", |kind| kind.as_str()),
                    intent.iterations,
                    command
                )];
                lines.push(if plan.is_empty() {
                    "Agent Sequence: No agents needed".to_string()
                } else {
                    format!("Agent Sequence: {}", plan.sequence.join(", "))
                });
                if let Some(report) = report {
                    lines.extend(render_report(report));
                }
                lines
            }
        }
    }
}

fn render_report(report: &WorkflowReport) -> Vec<String> {
    let mut lines = Vec::new();
    for outcome in &report.outcomes {
        match outcome {
            IterationOutcome::Completed { iteration, steps } => {
                for step in steps {
                    lines.push(format!(
                        "Iteration {iteration}, step {} ({}): {}",
                        step.step_index + 1,
                        step.handler,
                        step.summary
                    ));
                }
            }
            IterationOutcome::Failed { iteration, error } => {
                lines.push(format!("Error in iteration {iteration}: {error}"));
            }
        }
    }
    if report.failed() == 0 {
        lines.push("Task executed successfully!".to_string());
    } else {
        lines.push(format!(
            "Task finished with {} of {} iteration(s) failed.",
            report.failed(),
            report.outcomes.len()
        ));
    }
    lines
}

/// One orchestrator instance: a registry plus configuration.
///
/// Collaborators are borrowed per call, so the same pipeline can run against
/// real services or scripted ones.
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: CapabilityRegistry,
    config: CommanderConfig,
    interpreter: InterpreterAgent,
    planner: PlannerAgent,
    conversation: ConversationAgent,
}

impl Pipeline {
    pub fn new(registry: CapabilityRegistry, config: CommanderConfig) -> Self {
        Self {
            registry,
            config,
            interpreter: InterpreterAgent::new(),
            planner: PlannerAgent::new(),
            conversation: ConversationAgent::new(),
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CommanderConfig {
        &self.config
    }

    pub fn interpret<C: Completer>(&self, completer: &C, raw_text: &str) -> Intent {
        self.interpreter.run(completer, raw_text)
    }

    pub fn plan<C: Completer>(&self, completer: &C, command: &str) -> Plan {
        self.planner.run(completer, command, &self.registry)
    }

    pub fn respond<C: Completer>(&self, completer: &C, raw_text: &str) -> String {
        self.conversation.run(completer, raw_text)
    }

    /// Handle one raw message end to end.
    ///
    /// Only `CONVERSATION` and `UNCLEAR` go to the conversation fallback.
    /// Everything else, including an unclassified message, is planned once
    /// and the plan is run for the interpreted iteration count. A missing or
    /// blank `QUERY` is planned from the raw text.
    #[instrument(skip_all)]
    pub fn process_message<C: Completer, D: Dispatcher>(
        &self,
        completer: &C,
        dispatcher: &D,
        raw_text: &str,
    ) -> Reply {
        let intent = self.interpret(completer, raw_text);

        if intent.is_conversational() {
            info!(kind = intent.kind.map(|kind| kind.as_str()), "routing to conversation fallback");
            let response = self.respond(completer, raw_text);
            return Reply::Conversation { intent, response };
        }

        let command = intent.planning_command(raw_text).to_string();
        let plan = self.plan(completer, &command);

        let report = (!plan.is_empty()).then(|| {
            info!(iterations = intent.iterations, "running workflow");
            run_workflow(
                dispatcher,
                &command,
                intent.iterations,
                &plan,
                &WorkflowOptions::from(&self.config),
            )
        });

        Reply::Task {
            intent,
            command,
            plan,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IntentKind;
    use crate::test_support::{RecordingDispatcher, ScriptedCompleter, sample_registry};

    fn pipeline() -> Pipeline {
        Pipeline::new(sample_registry(), CommanderConfig::default())
    }

    #[test]
    fn conversation_skips_planning_and_execution() {
        let completer = ScriptedCompleter::new([
            "TYPE: CONVERSATION\nITERATIONS: 1\nQUERY: hello, how are you?",
            "Doing great, thanks for asking!",
        ]);
        let dispatcher = RecordingDispatcher::new();

        let reply = pipeline().process_message(&completer, &dispatcher, "hello, how are you?");

        match &reply {
            Reply::Conversation { intent, response } => {
                assert_eq!(intent.kind, Some(IntentKind::Conversation));
                assert_eq!(response, "Doing great, thanks for asking!");
            }
            other => panic!("expected conversation, got {other:?}"),
        }
        assert_eq!(completer.calls(), 2);
        assert_eq!(dispatcher.calls(), 0);
        assert_eq!(reply.render(), vec!["Doing great, thanks for asking!".to_string()]);
    }

    #[test]
    fn unclear_uses_fallback() {
        let completer = ScriptedCompleter::new(["TYPE: UNCLEAR\nQUERY: ?", "Could you rephrase?"]);
        let dispatcher = RecordingDispatcher::new();
        let reply = pipeline().process_message(&completer, &dispatcher, "blorp");
        assert!(matches!(reply, Reply::Conversation { .. }));
        assert_eq!(dispatcher.calls(), 0);
    }

    #[test]
    fn unclassified_message_is_planned() {
        for interpretation in ["ITERATIONS: 1\nQUERY: open the camera", "TYPE: Task\nQUERY: open the camera"] {
            let completer = ScriptedCompleter::new([
                interpretation,
                "Sequence: ['open_camera_agent']\nState: ['open the camera']",
            ]);
            let dispatcher = RecordingDispatcher::new();

            let reply = pipeline().process_message(&completer, &dispatcher, "open the camera");

            let Reply::Task { intent, command, .. } = &reply else {
                panic!("expected task reply for {interpretation:?}, got {reply:?}");
            };
            assert_eq!(intent.kind, None);
            assert_eq!(command, "open the camera");
            assert_eq!(dispatcher.calls(), 1);
            assert!(reply.render()[0].contains("Type: UNKNOWN"));
        }
    }

    #[test]
    fn failed_interpretation_still_plans_raw_text() {
        let completer = ScriptedCompleter::with_results([
            Err("interpreter offline"),
            Ok("Sequence: ['open_camera_agent']\nState: ['open the camera']"),
        ]);
        let dispatcher = RecordingDispatcher::new();

        let reply = pipeline().process_message(&completer, &dispatcher, " open the camera ");

        assert!(matches!(&reply, Reply::Task { report: Some(_), .. }));
        assert!(completer.requests()[1].prompt.contains("Task: 'open the camera'"));
        assert_eq!(dispatcher.calls(), 1);
    }

    #[test]
    fn blank_query_is_planned_from_raw_text() {
        let completer = ScriptedCompleter::new(["TYPE: TASK\nQUERY:", "Sequence: []\nState: []"]);
        let dispatcher = RecordingDispatcher::new();
        pipeline().process_message(&completer, &dispatcher, "close the camera");
        assert!(completer.requests()[1].prompt.contains("Task: 'close the camera'"));
    }

    #[test]
    fn task_runs_plan_for_each_iteration() {
        let completer = ScriptedCompleter::new([
            "TYPE: TASK\nITERATIONS: 3\nQUERY: open the camera then close the camera",
            "Sequence: ['open_camera_agent', 'close_camera_agent']\nState: ['open the camera', 'close the camera']",
        ]);
        let dispatcher = RecordingDispatcher::new();

        let reply = pipeline().process_message(&completer, &dispatcher, "open and close, 3 times");

        assert_eq!(dispatcher.calls(), 6);
        let Reply::Task { plan, report, command, .. } = &reply else {
            panic!("expected task reply");
        };
        assert_eq!(command, "open the camera then close the camera");
        assert_eq!(plan.len(), 2);
        assert_eq!(report.as_ref().expect("report").completed(), 3);

        let lines = reply.render();
        assert!(lines[0].contains("Type: TASK"));
        assert!(lines[0].contains("Iterations: 3"));
        assert_eq!(lines[1], "Agent Sequence: open_camera_agent, close_camera_agent");
        assert_eq!(lines.last().map(String::as_str), Some("Task executed successfully!"));
    }

    #[test]
    fn empty_plan_does_not_run_workflow() {
        let completer = ScriptedCompleter::new(["TYPE: TASK\nQUERY: launch a rocket", "Sequence: []\nState: []"]);
        let dispatcher = RecordingDispatcher::new();

        let reply = pipeline().process_message(&completer, &dispatcher, "launch a rocket");

        let Reply::Task { report, .. } = &reply else {
            panic!("expected task reply");
        };
        assert!(report.is_none());
        assert_eq!(dispatcher.calls(), 0);
        assert_eq!(reply.render()[1], "Agent Sequence: No agents needed");
    }

    #[test]
    fn task_without_query_is_planned_from_raw_text() {
        let completer = ScriptedCompleter::new(["TYPE: TASK", "Sequence: []\nState: []"]);
        let dispatcher = RecordingDispatcher::new();
        pipeline().process_message(&completer, &dispatcher, "  open the camera ");
        assert!(completer.requests()[1].prompt.contains("Task: 'open the camera'"));
    }

    #[test]
    fn failed_iterations_are_reported() {
        let completer = ScriptedCompleter::new([
            "TYPE: TASK\nITERATIONS: 2\nQUERY: open the camera",
            "Sequence: ['open_camera_agent']\nState: ['open the camera']",
        ]);
        let dispatcher = RecordingDispatcher::new().failing_on([1]);

        let reply = pipeline().process_message(&completer, &dispatcher, "open twice");

        let lines = reply.render();
        assert!(lines.iter().any(|l| l.starts_with("Error in iteration 1:")));
        assert!(lines.iter().any(|l| l.starts_with("Iteration 2, step 1 (open_camera_agent)")));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("Task finished with 1 of 2 iteration(s) failed.")
        );
    }
}
