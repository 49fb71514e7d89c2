//! I/O helpers for the orchestrator.

pub mod completion;
pub mod config;
pub mod process;
pub mod prompt;
