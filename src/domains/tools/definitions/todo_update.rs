//! Update tool definition.

use futures::FutureExt;
use std::sync::Arc;
use tracing::info;

use crate::core::schema::{FieldKind, Schema};
use crate::domains::todos::{TodoPatch, TodoProvider};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

use super::{TODOS_CHANGED_METHOD, todo_record_schema};

/// Update tool - patches an existing todo item.
pub struct TodoUpdateTool;

impl TodoUpdateTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "todo_update";

    /// Title shown in discovery listings.
    pub const TITLE: &'static str = "Update Todo";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Update a todo's title, description, or completed status. Absent fields are unchanged.";

    pub fn input_schema() -> Schema {
        Schema::new()
            .required("id", FieldKind::Number)
            .optional("title", FieldKind::String)
            .optional("description", FieldKind::String)
            .optional("completed", FieldKind::Boolean)
    }

    pub fn output_schema() -> Schema {
        todo_record_schema()
    }

    /// Build the registrable definition around the injected provider.
    pub fn definition(provider: Arc<dyn TodoProvider>) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME,
            title: Self::TITLE,
            description: Self::DESCRIPTION,
            input_schema: Self::input_schema(),
            output_schema: Self::output_schema(),
            change_event: Some(TODOS_CHANGED_METHOD),
            handler: Arc::new(move |args| {
                let provider = provider.clone();
                async move {
                    let id = args
                        .get("id")
                        .and_then(|v| v.as_u64())
                        .ok_or_else(|| ToolError::execution("Missing or invalid id"))?;
                    let patch = TodoPatch {
                        title: args.get("title").and_then(|v| v.as_str()).map(str::to_string),
                        description: args
                            .get("description")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                        completed: args.get("completed").and_then(|v| v.as_bool()),
                    };

                    let todo = provider
                        .update(id, patch)
                        .await
                        .map_err(|e| ToolError::execution(e.to_string()))?;
                    info!("Updated todo {}", todo.id);

                    serde_json::to_value(&todo).map_err(|e| ToolError::internal(e.to_string()))
                }
                .boxed()
            }),
        }
    }
}
