//! Tool definitions - one file per tool.
//!
//! Each tool declares its name, metadata, input/output schemas, and builds
//! a [`ToolDefinition`] whose handler closes over the injected
//! [`TodoProvider`].

mod todo_create;
mod todo_delete;
mod todo_list;
mod todo_update;

pub use todo_create::TodoCreateTool;
pub use todo_delete::TodoDeleteTool;
pub use todo_list::TodoListTool;
pub use todo_update::TodoUpdateTool;

use std::sync::Arc;

use crate::core::schema::{FieldKind, Schema};
use crate::domains::todos::TodoProvider;

use super::error::ToolError;
use super::registry::ToolRegistry;

/// Notification method enqueued after a successful mutating tool call.
pub const TODOS_CHANGED_METHOD: &str = "notifications/todos/changed";

/// Schema of a single todo record as returned by the tools.
pub(crate) fn todo_record_schema() -> Schema {
    Schema::new()
        .required("id", FieldKind::Number)
        .required("title", FieldKind::String)
        .required("description", FieldKind::String)
        .required("completed", FieldKind::Boolean)
        .required("createdAt", FieldKind::String)
}

/// Register the full todo tool catalog against one provider instance.
pub fn register_all(
    registry: &mut ToolRegistry,
    provider: Arc<dyn TodoProvider>,
) -> Result<(), ToolError> {
    registry.register(TodoListTool::definition(provider.clone()))?;
    registry.register(TodoCreateTool::definition(provider.clone()))?;
    registry.register(TodoUpdateTool::definition(provider.clone()))?;
    registry.register(TodoDeleteTool::definition(provider))?;
    Ok(())
}
