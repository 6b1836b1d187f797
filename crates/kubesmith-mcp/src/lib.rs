//! Kubesmith MCP adapter entrypoint.

mod error;
mod server;
mod tools;

pub use crate::error::{McpError, invalid_params, to_mcp_error};
pub use crate::server::{
    KubesmithMcpServer, run_stdio_server, run_stdio_server_with_root,
};
