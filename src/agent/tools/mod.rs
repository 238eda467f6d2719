pub mod base;
pub mod host;
pub mod mcp;
pub mod registry;

pub use base::{ExecutionContext, Tool, ToolResult};
pub use host::{HostedTool, ToolDescriptor, ToolHostConnector, ToolHostSession};
pub use mcp::McpToolHost;
pub use registry::ToolRegistry;
