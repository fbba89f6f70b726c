//! Todo-specific error types.

use thiserror::Error;

/// Errors raised by a todo provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// No todo exists with the given id.
    #[error("Todo not found: {0}")]
    NotFound(u64),
}
