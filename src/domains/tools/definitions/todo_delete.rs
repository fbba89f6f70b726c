//! Delete tool definition.

use futures::FutureExt;
use std::sync::Arc;
use tracing::info;

use crate::core::schema::{FieldKind, Schema};
use crate::domains::todos::TodoProvider;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::registry::ToolDefinition;

use super::TODOS_CHANGED_METHOD;

/// Delete tool - removes a todo by id.
pub struct TodoDeleteTool;

impl TodoDeleteTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "todo_delete";

    /// Title shown in discovery listings.
    pub const TITLE: &'static str = "Delete Todo";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Delete a todo by its id.";

    pub fn input_schema() -> Schema {
        Schema::new().required("id", FieldKind::Number)
    }

    pub fn output_schema() -> Schema {
        Schema::new()
            .required("success", FieldKind::Boolean)
            .required("id", FieldKind::Number)
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

                    let deleted = provider
                        .delete(id)
                        .await
                        .map_err(|e| ToolError::execution(e.to_string()))?;
                    info!("Deleted todo {}", deleted.id);

                    serde_json::to_value(&deleted).map_err(|e| ToolError::internal(e.to_string()))
                }
                .boxed()
            }),
        }
    }
}
