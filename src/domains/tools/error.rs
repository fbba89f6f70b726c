//! Tool-specific error types.

use thiserror::Error;

/// Errors that can occur during tool registration and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A tool with the same name is already registered. Fatal at startup.
    #[error("Duplicate tool name: {0}")]
    Duplicate(String),

    /// The tool handler failed with a domain error.
    #[error("{0}")]
    Execution(String),

    /// An internal error occurred inside the tool.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "duplicate" error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate(name.into())
    }

    /// Create a new "execution" error.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
