//! Create tool definition.

use futures::FutureExt;
use std::sync::Arc;
use tracing::info;

use crate::core::schema::{FieldKind, Schema};
use crate::domains::todos::{NewTodo, TodoProvider};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

use super::{TODOS_CHANGED_METHOD, todo_record_schema};

/// Create tool - adds a new todo item.
pub struct TodoCreateTool;

impl TodoCreateTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "todo_create";

    /// Title shown in discovery listings.
    pub const TITLE: &'static str = "Create Todo";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Create a todo item. Title is required, description is optional.";

    pub fn input_schema() -> Schema {
        Schema::new()
            .required("title", FieldKind::String)
            .optional("description", FieldKind::String)
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
                    let title = args
                        .get("title")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| ToolError::execution("Missing title"))?
                        .to_string();
                    let description = args
                        .get("description")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);

                    let todo = provider.create(NewTodo { title, description }).await;
                    info!("Created todo {} ('{}')", todo.id, todo.title);

                    serde_json::to_value(&todo).map_err(|e| ToolError::internal(e.to_string()))
                }
                .boxed()
            }),
        }
    }
}
