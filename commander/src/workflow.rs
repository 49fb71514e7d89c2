//! Workflow Runner: repeats a plan with per-iteration failure isolation.
//!
//! Iterations run strictly one after another. A failing or panicking
//! iteration is logged and recorded, and the next iteration still runs. The
//! runner itself never returns an error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info, instrument, warn};

use crate::core::types::{Plan, StepSummary};
use crate::execute::{Dispatcher, execute_plan};
use crate::io::config::CommanderConfig;

/// Limits applied to a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOptions {
    pub max_turns: u32,
    pub max_iterations: Option<u32>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self::from(&CommanderConfig::default())
    }
}

impl From<&CommanderConfig> for WorkflowOptions {
    fn from(cfg: &CommanderConfig) -> Self {
        Self {
            max_turns: cfg.max_turns,
            max_iterations: cfg.max_iterations,
        }
    }
}

/// Result of one traversal of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    Completed {
        iteration: u64,
        steps: Vec<StepSummary>,
    },
    Failed {
        iteration: u64,
        error: String,
    },
}

impl IterationOutcome {
    pub fn iteration(&self) -> u64 {
        match self {
            Self::Completed { iteration, .. } | Self::Failed { iteration, .. } => *iteration,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Summary of a workflow run, in iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowReport {
    /// Iteration count as requested, before capping.
    pub requested: i64,
    pub outcomes: Vec<IterationOutcome>,
}

impl WorkflowReport {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

/// Run `plan` `iterations` times against `original_command`.
///
/// The plan is not rebuilt between iterations. `iterations <= 0` runs
/// nothing. Counts run in full unless `options.max_iterations` is set, in
/// which case larger counts are capped.
#[instrument(skip_all, fields(iterations = iterations, steps = plan.len()))]
pub fn run_workflow<D: Dispatcher>(
    dispatcher: &D,
    original_command: &str,
    iterations: i64,
    plan: &Plan,
    options: &WorkflowOptions,
) -> WorkflowReport {
    let mut report = WorkflowReport {
        requested: iterations,
        outcomes: Vec::new(),
    };

    let outer = panic::catch_unwind(AssertUnwindSafe(|| {
        let total = effective_iterations(iterations, options.max_iterations);
        for iteration in 1..=total {
            info!(iteration, total, "starting iteration");
            let outcome = run_iteration(dispatcher, original_command, plan, options, iteration, total);
            report.outcomes.push(outcome);
        }
    }));
    if let Err(payload) = outer {
        error!(panic = %panic_message(payload.as_ref()), "workflow aborted");
    }

    report
}

fn run_iteration<D: Dispatcher>(
    dispatcher: &D,
    original_command: &str,
    plan: &Plan,
    options: &WorkflowOptions,
    iteration: u64,
    total: u64,
) -> IterationOutcome {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        execute_plan(dispatcher, plan, original_command, options.max_turns)
    }));
    let error = match attempt {
        Ok(Ok(steps)) => return IterationOutcome::Completed { iteration, steps },
        Ok(Err(err)) => format!("{err:#}"),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };
    error!(iteration, total, err = %error, "iteration failed");
    IterationOutcome::Failed { iteration, error }
}

/// Number of iterations to run: `0` for non-positive requests, otherwise the
/// request, capped at `max` when one is set.
fn effective_iterations(requested: i64, max: Option<u32>) -> u64 {
    if requested <= 0 {
        return 0;
    }
    let requested = requested.unsigned_abs();
    match max.map(u64::from) {
        Some(max) if requested > max => {
            warn!(requested, max, "iteration count capped");
            max
        }
        _ => requested,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
