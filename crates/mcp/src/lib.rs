//! MCP tool server: a registry of read-side tools over the two article
//! stores, exposed through a JSON-RPC 2.0 protocol on stdio or HTTP.

pub mod error;
pub mod http;
pub mod registry;
pub mod server;
pub mod tool;
pub mod tools;
pub mod transport;
pub mod types;

pub use error::McpError;
pub use registry::{RegistryError, ToolRegistry};
pub use server::McpServer;
pub use tool::{Tool, ToolDefinition, ToolError};
pub use transport::{ChannelTransport, McpTransport, StdioTransport};
