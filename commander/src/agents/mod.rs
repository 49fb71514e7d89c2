//! Agent wrappers, one per collaborator role.
//!
//! Each agent owns its prompt and response handling and borrows a
//! [`Completer`](crate::io::completion::Completer) per call.

pub mod conversation;
pub mod handler;
pub mod interpreter;
pub mod planner;
