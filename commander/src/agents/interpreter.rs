//! Intent Interpreter agent.

use tracing::{info, instrument, warn};

use crate::core::intent::parse_interpreter_response;
use crate::core::types::Intent;
use crate::io::completion::{Completer, CompletionRequest};
use crate::io::prompt::interpreter_prompt;

const SYSTEM_MESSAGE: &str = "You classify requests for a camera assistant and rewrite actionable \
     ones as explicit commands. Always answer in the exact three-line format you are given.";

/// Turns raw user text into an [`Intent`] with one completion call.
#[derive(Debug, Clone, Default)]
pub struct InterpreterAgent;

impl InterpreterAgent {
    pub fn new() -> Self {
        Self
    }

    /// Interpret `raw_text`. Never fails: a failed call or an unreadable
    /// response yields the default intent (or whatever fields were read).
    #[instrument(skip_all)]
    pub fn run<C: Completer>(&self, completer: &C, raw_text: &str) -> Intent {
        let response = interpreter_prompt(raw_text).and_then(|prompt| {
            completer.complete(&CompletionRequest::new(prompt).with_system(SYSTEM_MESSAGE))
        });
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "interpreter call failed, using default intent");
                return Intent::default();
            }
        };

        let intent = parse_interpreter_response(&response);
        info!(
            kind = intent.kind.map(|kind| kind.as_str()),
            iterations = intent.iterations,
            query = intent.normalized_command.as_deref(),
            "interpreted message"
        );
        intent
    }
}
