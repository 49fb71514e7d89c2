//! Deterministic, pure logic shared by the pipeline stages.
//!
//! Core modules must be free of I/O side effects. They turn collaborator
//! responses into value types and back, and are tested in isolation.

pub mod intent;
pub mod literal;
pub mod plan;
pub mod step_context;
pub mod types;
