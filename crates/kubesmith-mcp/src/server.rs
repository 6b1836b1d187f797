use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::{router::Router, tool::ToolRouter};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::service::ServerInitializeError;
use rmcp::{service::ServiceExt, transport};

use kubesmith::workspace::{FilesystemWorkspaceLocator, WorkspaceLocator, WorkspacePaths};
use kubesmith::{DefaultTemplateService, SmithError};

use crate::error::to_mcp_error;
use crate::tools::build_tool_router;

#[derive(Clone)]
pub struct KubesmithMcpServer {
    pub(crate) workspace: WorkspacePaths,
    pub(crate) service: Arc<DefaultTemplateService>,
    pub(crate) tool_router: ToolRouter<Self>,
}

impl KubesmithMcpServer {
    pub fn new() -> Result<Self, SmithError> {
        let cwd = std::env::current_dir()?;
        Self::new_with_root(cwd)
    }

    pub fn new_with_root(root: impl Into<PathBuf>) -> Result<Self, SmithError> {
        let locator = FilesystemWorkspaceLocator::new(root);
        let workspace = locator.workspace()?;
        let service = Arc::new(DefaultTemplateService::from_workspace(workspace.clone())?);

        Ok(Self {
            workspace,
            service,
            tool_router: build_tool_router(),
        })
    }

    pub fn workspace(&self) -> &WorkspacePaths {
        &self.workspace
    }

    /// Start a stdio-based MCP server and wait until the transport closes.
    pub async fn run_stdio(self) -> Result<(), ServerInitializeError> {
        tracing::info!(
            root = %self.workspace.root().display(),
            "kubesmith-mcp serving over stdio"
        );
        let tools = self.tool_router.clone();
        let router = Router::new(self).with_tools(tools);
        let service = router.serve(transport::io::stdio()).await?;

        // Hold the service open until the peer closes the transport.
        let _ = service.waiting().await;
        Ok(())
    }
}

impl ServerHandler for KubesmithMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..ServerInfo::default()
        }
    }
}

/// Convenience entry point that builds the server and runs it over stdio.
/// Accepts an optional workspace root; when `None`, the current working
/// directory is used.
pub async fn run_stdio_server_with_root(
    workspace_root: Option<PathBuf>,
) -> Result<(), ServerInitializeError> {
    let server = match workspace_root {
        Some(root) => KubesmithMcpServer::new_with_root(root),
        None => KubesmithMcpServer::new(),
    }
    .map_err(|err| ServerInitializeError::InitializeFailed(to_mcp_error(err)))?;
    server.run_stdio().await
}

/// Convenience entry point that defaults to the current working directory.
pub async fn run_stdio_server() -> Result<(), ServerInitializeError> {
    run_stdio_server_with_root(None).await
}
