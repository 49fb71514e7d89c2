//! Natural-language command orchestrator for camera controls.
//!
//! A raw message is interpreted into an intent, planned into an ordered list
//! of capability handlers, and executed as a chain of bounded handler
//! conversations, repeated as many times as requested. The architecture
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (response parsing, plan
//!   validation, step framing). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (completion calls, child
//!   processes, configuration, prompt rendering).
//!
//! Orchestration modules ([`pipeline`], [`execute`], [`workflow`]) and the
//! [`agents`] coordinate core logic with I/O. The [`registry`] is built once
//! at startup and passed in explicitly.

pub mod agents;
pub mod core;
pub mod devices;
pub mod execute;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod registry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
