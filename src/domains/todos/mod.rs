//! Todos domain module.
//!
//! The domain collaborator behind the tool catalog: a [`TodoProvider`]
//! exposing create/list/update/delete operations, plus the in-memory
//! [`TodoService`] used by the demo server.

mod error;
mod service;

pub use error::TodoError;
pub use service::{DeletedTodo, NewTodo, Todo, TodoPatch, TodoProvider, TodoService};
