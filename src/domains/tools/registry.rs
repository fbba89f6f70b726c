//! Tool Registry - central registration and lookup for all tools.
//!
//! The registry maps tool names to their definitions: metadata, declared
//! input/output schemas, and the handler closure. It is populated once at
//! startup, before any request is served, and shared immutably via `Arc`
//! afterwards, so dispatch-time reads need no locking.

use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use crate::core::schema::Schema;

use super::error::ToolError;

/// Handler closure invoked with schema-validated input.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// A registered tool: metadata, schemas, and handler. Immutable after
/// registration.
pub struct ToolDefinition {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: Schema,
    pub output_schema: Schema,
    /// Notification method enqueued on the calling session after a
    /// successful invocation, for tools that mutate shared state.
    pub change_event: Option<&'static str>,
    pub handler: ToolHandler,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Tool registry - manages all available tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    // Vec keeps registration order for discovery listings.
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), ToolError> {
        if self.tools.iter().any(|t| t.name == definition.name) {
            return Err(ToolError::duplicate(definition.name));
        }
        self.tools.push(definition);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// All registered tool names, in registration order.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    /// Tool descriptors for discovery requests, in registration order.
    pub fn list(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "title": t.title,
                    "description": t.description,
                    "inputSchema": t.input_schema.to_json_schema(),
                    "outputSchema": t.output_schema.to_json_schema(),
                })
            })
            .collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
