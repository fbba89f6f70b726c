//! List tool definition.

use futures::FutureExt;
use std::sync::Arc;
use tracing::debug;

use crate::core::schema::{FieldKind, Schema};
use crate::domains::todos::TodoProvider;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

use super::todo_record_schema;

/// List tool - returns the full todo collection.
pub struct TodoListTool;

impl TodoListTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "todo_list";

    /// Title shown in discovery listings.
    pub const TITLE: &'static str = "List Todos";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Return all todos in creation order.";

    /// No input parameters.
    pub fn input_schema() -> Schema {
        Schema::new()
    }

    /// The canonical list shape is `{todos: [...]}`, not a bare array.
    pub fn output_schema() -> Schema {
        Schema::new().required("todos", FieldKind::Array(todo_record_schema()))
    }

    /// Build the registrable definition around the injected provider.
    pub fn definition(provider: Arc<dyn TodoProvider>) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME,
            title: Self::TITLE,
            description: Self::DESCRIPTION,
            input_schema: Self::input_schema(),
            output_schema: Self::output_schema(),
            change_event: None,
            handler: Arc::new(move |_args| {
                let provider = provider.clone();
                async move {
                    let todos = provider.list().await;
                    debug!("Listing {} todos", todos.len());
                    serde_json::to_value(serde_json::json!({ "todos": todos }))
                        .map_err(|e| ToolError::internal(e.to_string()))
                }
                .boxed()
            }),
        }
    }
}
