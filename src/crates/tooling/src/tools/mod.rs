//! The tool layer: a registry mapping a tool name to a schema + async
//! executor, emitting schemas in either the function-calling or MCP wire
//! dialect and returning every invocation as a tagged `ToolResult`.

mod filesystem;
mod registry;
mod result;
mod schema;

pub use filesystem::{FileReadTool, FileWriteTool, FsListTool, GrepTool};
pub use registry::{Tool, ToolRegistry};
pub use result::ToolResult;
pub use schema::{ParameterKind, ToolParameter, ToolSchema};
