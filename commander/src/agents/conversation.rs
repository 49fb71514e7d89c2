//! Conversation Fallback agent for messages that are not tasks.

use tracing::{instrument, warn};

use crate::io::completion::{Completer, CompletionRequest};
use crate::io::prompt::conversation_prompt;

const SYSTEM_MESSAGE: &str = "You are a friendly assistant for a camera control app. Answer \
     questions and small talk briefly. When a request is unclear, ask what the user wants the \
     camera to do.";

#[derive(Debug, Clone, Default)]
pub struct ConversationAgent;

impl ConversationAgent {
    pub fn new() -> Self {
        Self
    }

    /// Reply to `raw_text` with one completion call. Failures are returned as
    /// an error-describing reply instead of an error.
    #[instrument(skip_all)]
    pub fn run<C: Completer>(&self, completer: &C, raw_text: &str) -> String {
        let reply = conversation_prompt(raw_text).and_then(|prompt| {
            completer.complete(&CompletionRequest::new(prompt).with_system(SYSTEM_MESSAGE))
        });
        match reply {
            Ok(reply) => reply,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "conversation call failed");
                format!("Error in conversation: {err:#}")
            }
        }
    }
}
