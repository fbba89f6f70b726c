//! Tools domain module.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `registry.rs` - Central tool registry: registration, lookup, discovery
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` (e.g., `my_tool.rs`)
//! 2. Declare name, schemas, and a `definition()` builder
//! 3. Export it in `definitions/mod.rs` and add it to `register_all`

pub mod definitions;
mod error;
mod registry;

pub use definitions::register_all;
pub use error::ToolError;
pub use registry::{ToolDefinition, ToolHandler, ToolRegistry};
