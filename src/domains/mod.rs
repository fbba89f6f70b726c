//! Domain modules organized by bounded context.
//!
//! - **tools**: the tool registry and the registered tool catalog
//! - **todos**: the injected domain collaborator behind the todo tools

pub mod todos;
pub mod tools;
