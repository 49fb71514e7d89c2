//! Completion abstraction for the inference collaborators.
//!
//! The [`Completer`] trait decouples the pipeline from the text-completion
//! backend. [`CommandCompleter`] pipes the prompt into a configured command
//! (for example `llm -m gpt-4o-mini`); tests use scripted completers that
//! return predetermined replies.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::config::CompletionConfig;
use crate::io::process::run_command_with_timeout;

/// One text-in/text-out request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Role instructions for the model, if any.
    pub system: Option<String>,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Abstraction over text-completion backends.
pub trait Completer {
    /// Return the model's reply to `request`.
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

impl<C: Completer + ?Sized> Completer for &C {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        (**self).complete(request)
    }
}

/// Completer that spawns a command, writes the prompt to stdin and reads the
/// reply from stdout.
#[derive(Debug, Clone)]
pub struct CommandCompleter {
    config: CompletionConfig,
}

impl CommandCompleter {
    pub fn new(config: CompletionConfig) -> Self {
        Self { config }
    }

    fn build(&self, request: &CompletionRequest) -> Result<(Command, String)> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("completion command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);

        let mut stdin = String::new();
        match (&request.system, &self.config.system_flag) {
            (Some(system), Some(flag)) => {
                cmd.arg(flag).arg(system);
            }
            (Some(system), None) => {
                stdin.push_str(system.trim());
                stdin.push_str("\n\n");
            }
            (None, _) => {}
        }
        stdin.push_str(&request.prompt);
        Ok((cmd, stdin))
    }
}

impl Completer for CommandCompleter {
    #[instrument(skip_all, fields(command = %self.config.command.join(" "), prompt_bytes = request.prompt.len()))]
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let (cmd, stdin) = self.build(request)?;
        let timeout = Duration::from_secs(self.config.timeout_secs);
        debug!(prompt = %request.prompt, "sending completion request");

        let output = run_command_with_timeout(
            cmd,
            Some(stdin.as_bytes()),
            timeout,
            self.config.output_limit_bytes,
        )
        .context("run completion command")?;

        if output.timed_out {
            warn!(timeout_secs = timeout.as_secs(), "completion timed out");
            return Err(anyhow!("completion timed out after {:?}", timeout));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "completion command failed");
            return Err(anyhow!(
                "completion command failed with status {:?}: {}",
                output.status.code(),
                output.stderr_text()
            ));
        }

        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(reply = %reply, "received completion");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(command: &[&str], system_flag: Option<&str>) -> CompletionConfig {
        CompletionConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            system_flag: system_flag.map(str::to_string),
            timeout_secs: 5,
            output_limit_bytes: 10_000,
        }
    }

    #[test]
    fn system_message_goes_to_flag_when_configured() {
        let completer = CommandCompleter::new(config(&["llm", "-m", "model"], Some("-s")));
        let request = CompletionRequest::new("hi").with_system("be brief");
        let (cmd, stdin) = completer.build(&request).expect("build");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(args, vec!["-m", "model", "-s", "be brief"]);
        assert_eq!(stdin, "hi");
    }

    #[test]
    fn system_message_is_prepended_without_flag() {
        let completer = CommandCompleter::new(config(&["llm"], None));
        let request = CompletionRequest::new("hi").with_system("be brief");
        let (_, stdin) = completer.build(&request).expect("build");
        assert_eq!(stdin, "be brief\n\nhi");
    }

    #[cfg(unix)]
    #[test]
    fn returns_trimmed_stdout() {
        let completer = CommandCompleter::new(config(&["cat"], None));
        let reply = completer
            .complete(&CompletionRequest::new("  TYPE: TASK\n"))
            .expect("complete");
        assert_eq!(reply, "TYPE: TASK");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_an_error() {
        let completer = CommandCompleter::new(config(&["sh", "-c", "echo nope >&2; exit 3"], None));
        let err = completer
            .complete(&CompletionRequest::new("prompt"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Some(3)"), "{msg}");
        assert!(msg.contains("nope"), "{msg}");
    }
}
