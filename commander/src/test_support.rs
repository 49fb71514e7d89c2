//! Test-only collaborators and registries.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use crate::devices::camera_registry;
use crate::execute::{Dispatcher, StepRequest};
use crate::io::completion::{Completer, CompletionRequest};
use crate::registry::{ActionArgs, CapabilityRegistry};

/// The built-in camera registry.
pub fn sample_registry() -> CapabilityRegistry {
    camera_registry().expect("camera registry should build")
}

/// Counts action invocations by capability name.
#[derive(Debug, Clone, Default)]
pub struct ActionCounter {
    counts: Arc<Mutex<BTreeMap<String, usize>>>,
}

impl ActionCounter {
    fn record(&self, name: &str) {
        let mut counts = self.counts.lock().expect("counter lock");
        *counts.entry(name.to_string()).or_default() += 1;
    }

    pub fn count(&self, name: &str) -> usize {
        let counts = self.counts.lock().expect("counter lock");
        counts.get(name).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.counts.lock().expect("counter lock").values().sum()
    }
}

/// Same handlers and schemas as [`sample_registry`], with actions that only
/// count their invocations and reply `"<name> ok"`.
pub fn counting_registry() -> (CapabilityRegistry, ActionCounter) {
    let source = sample_registry();
    let counter = ActionCounter::default();
    let mut registry = CapabilityRegistry::new();

    for capability in source.capabilities() {
        let handler = source
            .handler(&capability.handler)
            .expect("capability handler should be registered");
        let action_counter = counter.clone();
        let name = capability.name.clone();
        registry
            .register_with_parameters(
                move |_: &ActionArgs| -> Result<String> {
                    action_counter.record(&name);
                    Ok(format!("{name} ok"))
                },
                handler,
                &capability.name,
                &capability.description,
                capability.parameters.clone(),
            )
            .expect("register counting capability");
    }

    (registry, counter)
}

/// Completer that replays queued replies in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedCompleter {
    replies: RefCell<VecDeque<Result<String, String>>>,
    requests: RefCell<Vec<CompletionRequest>>,
}

impl ScriptedCompleter {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Queue replies where `Err` entries fail the corresponding call.
    pub fn with_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<&'static str, &'static str>>,
    {
        Self {
            replies: RefCell::new(
                results
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Completer for ScriptedCompleter {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("scripted completer exhausted")),
        }
    }
}

/// Dispatcher that records requests and answers `"<handler> done"`.
///
/// Calls are numbered from 1 across the dispatcher's lifetime; chosen calls
/// can be made to fail or panic.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    requests: RefCell<Vec<StepRequest>>,
    fail_on: Vec<usize>,
    panic_on: Vec<usize>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.fail_on.extend(calls);
        self
    }

    pub fn panicking_on(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.panic_on.extend(calls);
        self
    }

    pub fn requests(&self) -> Vec<StepRequest> {
        self.requests.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, request: &StepRequest) -> Result<String> {
        let call = {
            let mut requests = self.requests.borrow_mut();
            requests.push(request.clone());
            requests.len()
        };
        if self.panic_on.contains(&call) {
            panic!("scripted panic on call {call}");
        }
        if self.fail_on.contains(&call) {
            return Err(anyhow!("scripted failure on call {call}"));
        }
        Ok(format!("{} done", request.handler))
    }
}
