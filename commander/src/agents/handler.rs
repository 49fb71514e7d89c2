//! Capability handler sub-conversations.
//!
//! A step is dispatched to its handler as a short conversation. Each handler
//! turn either calls one of the handler's functions (a JSON object
//! `{"call": ..., "args": {...}}`) or answers in plain text, which ends the
//! conversation. The number of handler turns is bounded, and the finished
//! transcript is condensed into a reflective summary by one more call.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{Role, TranscriptEntry};
use crate::execute::{Dispatcher, StepRequest};
use crate::io::completion::{Completer, CompletionRequest};
use crate::io::prompt::{handler_turn_prompt, summary_prompt};
use crate::registry::{ActionArgs, Capability, CapabilityRegistry, HandlerProfile};

/// A function call requested by a handler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    pub call: String,
    #[serde(default)]
    pub args: ActionArgs,
}

/// Read a function call out of a handler reply, if the reply is one.
///
/// The reply must be a single JSON object, optionally inside a fenced code
/// block.
pub fn parse_function_call(reply: &str) -> Option<FunctionCall> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("fence regex should be valid")
    });

    let trimmed = reply.trim();
    let body = FENCE_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str());
    if !body.starts_with('{') {
        return None;
    }
    serde_json::from_str(body).ok()
}

/// One handler bound to its registered capabilities.
pub struct HandlerAgent<'a> {
    profile: &'a HandlerProfile,
    capabilities: Vec<&'a Capability>,
}

impl<'a> HandlerAgent<'a> {
    pub fn new(registry: &'a CapabilityRegistry, profile: &'a HandlerProfile) -> Self {
        Self {
            profile,
            capabilities: registry.capabilities_of(&profile.name).collect(),
        }
    }

    /// Run the bounded conversation for `message` and return its transcript.
    ///
    /// Action failures propagate; an unknown function or invalid arguments
    /// are reported back to the handler instead.
    pub fn converse<C: Completer>(
        &self,
        completer: &C,
        message: &str,
        max_turns: u32,
    ) -> Result<Vec<TranscriptEntry>> {
        let mut transcript = vec![TranscriptEntry::new(Role::User, message)];

        for turn in 1..=max_turns {
            let prompt = handler_turn_prompt(&self.capabilities, &transcript)?;
            let reply = completer
                .complete(&CompletionRequest::new(prompt).with_system(&self.profile.system_message))
                .with_context(|| format!("turn {turn} of {}", self.profile.name))?;
            let call = parse_function_call(&reply);
            transcript.push(TranscriptEntry::new(Role::Handler, reply));

            let Some(call) = call else {
                debug!(turn, "handler answered, ending conversation");
                break;
            };
            let result = self.call_function(&call)?;
            transcript.push(TranscriptEntry::new(Role::Function, result));
        }

        Ok(transcript)
    }

    fn call_function(&self, call: &FunctionCall) -> Result<String> {
        let Some(capability) = self
            .capabilities
            .iter()
            .find(|capability| capability.name == call.call)
        else {
            warn!(function = %call.call, "handler called a function it does not own");
            return Ok(format!("error: `{}` is not one of your functions", call.call));
        };

        if let Err(errors) = capability.check_args(&call.args) {
            warn!(function = %call.call, ?errors, "handler passed invalid arguments");
            return Ok(format!(
                "error: invalid arguments for `{}`: {}",
                call.call,
                errors.join("; ")
            ));
        }

        info!(function = %call.call, args = %serde_json::Value::Object(call.args.clone()), "invoking action");
        capability
            .invoke(&call.args)
            .with_context(|| format!("action `{}` failed", call.call))
    }

    /// Condense a finished transcript with a reflection call.
    pub fn summarize<C: Completer>(
        &self,
        completer: &C,
        transcript: &[TranscriptEntry],
        question: &str,
    ) -> Result<String> {
        let prompt = summary_prompt(transcript, question)?;
        let summary = completer
            .complete(&CompletionRequest::new(prompt).with_system(&self.profile.system_message))
            .with_context(|| format!("summarize {}", self.profile.name))?;
        Ok(summary.trim().to_string())
    }
}

/// [`Dispatcher`] that runs each step as a conversation with the registered
/// handler.
pub struct HandlerDispatcher<'a, C> {
    registry: &'a CapabilityRegistry,
    completer: &'a C,
}

impl<'a, C: Completer> HandlerDispatcher<'a, C> {
    pub fn new(registry: &'a CapabilityRegistry, completer: &'a C) -> Self {
        Self {
            registry,
            completer,
        }
    }
}

impl<C: Completer> Dispatcher for HandlerDispatcher<'_, C> {
    #[instrument(skip_all, fields(handler = %request.handler, max_turns = request.max_turns))]
    fn dispatch(&self, request: &StepRequest) -> Result<String> {
        let profile = self
            .registry
            .handler(&request.handler)
            .ok_or_else(|| anyhow!("unknown handler `{}`", request.handler))?;
        let agent = HandlerAgent::new(self.registry, profile);

        let transcript = agent.converse(self.completer, &request.message, request.max_turns)?;
        agent.summarize(self.completer, &transcript, &request.summary_prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::SUMMARY_QUESTION;
    use crate::test_support::{ScriptedCompleter, counting_registry};
    use serde_json::json;

    fn request(handler: &str, max_turns: u32) -> StepRequest {
        StepRequest {
            handler: handler.to_string(),
            message: "Your specific task: set automatic framing on".to_string(),
            max_turns,
            summary_prompt: SUMMARY_QUESTION.to_string(),
        }
    }

    #[test]
    fn parses_plain_and_fenced_calls() {
        let call = parse_function_call(r#"{"call": "open_camera"}"#).expect("call");
        assert_eq!(call.call, "open_camera");
        assert!(call.args.is_empty());

        let call = parse_function_call(
            "```json\n{\"call\": \"set_automatic_framing\", \"args\": {\"desired_state\": true}}\n```",
        )
        .expect("call");
        assert_eq!(call.args.get("desired_state"), Some(&json!(true)));
    }

    #[test]
    fn plain_text_is_not_a_call() {
        assert!(parse_function_call("Automatic framing is now on.").is_none());
        assert!(parse_function_call("{not json").is_none());
        assert!(parse_function_call(r#"{"name": "open_camera"}"#).is_none());
    }

    #[test]
    fn call_then_answer_invokes_action_once() {
        let (registry, counter) = counting_registry();
        let completer = ScriptedCompleter::new([
            r#"{"call": "set_automatic_framing", "args": {"desired_state": true}}"#,
            "Automatic framing is on.",
            "I set automatic framing to on.",
        ]);
        let dispatcher = HandlerDispatcher::new(&registry, &completer);

        let summary = dispatcher
            .dispatch(&request("set_automatic_framing_agent", 2))
            .expect("dispatch");

        assert_eq!(summary, "I set automatic framing to on.");
        assert_eq!(counter.count("set_automatic_framing"), 1);
        let requests = completer.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].prompt.contains("[function] set_automatic_framing ok"));
        assert!(requests[2].prompt.contains(SUMMARY_QUESTION));
    }

    #[test]
    fn turns_are_bounded() {
        let (registry, counter) = counting_registry();
        let call = r#"{"call": "set_automatic_framing", "args": {"desired_state": false}}"#;
        let completer = ScriptedCompleter::new([call, call, "Turned it off twice."]);
        let dispatcher = HandlerDispatcher::new(&registry, &completer);

        dispatcher
            .dispatch(&request("set_automatic_framing_agent", 2))
            .expect("dispatch");

        assert_eq!(counter.count("set_automatic_framing"), 2);
        assert_eq!(completer.calls(), 3);
    }

    #[test]
    fn foreign_function_and_bad_args_are_reported_back() {
        let (registry, counter) = counting_registry();
        let completer = ScriptedCompleter::new([
            r#"{"call": "open_camera"}"#,
            r#"{"call": "set_automatic_framing", "args": {"desired_state": null}}"#,
            "summary",
        ]);
        let dispatcher = HandlerDispatcher::new(&registry, &completer);

        dispatcher
            .dispatch(&request("set_automatic_framing_agent", 2))
            .expect("dispatch");

        assert_eq!(counter.total(), 0);
        let summary_prompt = &completer.requests()[2].prompt;
        assert!(summary_prompt.contains("`open_camera` is not one of your functions"));
        assert!(summary_prompt.contains("invalid arguments for `set_automatic_framing`"));
    }

    #[test]
    fn unknown_handler_is_an_error() {
        let (registry, _) = counting_registry();
        let completer = ScriptedCompleter::new(Vec::<String>::new());
        let dispatcher = HandlerDispatcher::new(&registry, &completer);
        let err = dispatcher.dispatch(&request("zoom_agent", 2)).unwrap_err();
        assert!(err.to_string().contains("unknown handler `zoom_agent`"));
        assert_eq!(completer.calls(), 0);
    }

    #[test]
    fn completion_failure_propagates() {
        let (registry, _) = counting_registry();
        let completer = ScriptedCompleter::with_results([Err("rate limited")]);
        let dispatcher = HandlerDispatcher::new(&registry, &completer);
        let err = dispatcher
            .dispatch(&request("set_automatic_framing_agent", 2))
            .unwrap_err();
        assert!(format!("{err:#}").contains("rate limited"));
    }
}
