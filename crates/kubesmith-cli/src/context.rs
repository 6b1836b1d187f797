use std::path::PathBuf;

use kubesmith::workspace::{FilesystemWorkspaceLocator, WorkspaceLocator, WorkspacePaths};
use kubesmith::{DefaultTemplateService, SmithError};

use crate::error::CliError;
use crate::util::Verbosity;

/// Workspace-bound state shared by every command invocation.
pub struct CliSession {
    pub workspace_paths: WorkspacePaths,
    pub service: DefaultTemplateService,
    pub verbosity: Verbosity,
}

impl CliSession {
    pub fn bootstrap(
        workspace_override: Option<String>,
        verbosity: Verbosity,
    ) -> Result<Self, CliError> {
        let locator = match workspace_override {
            Some(path) => {
                let locator = FilesystemWorkspaceLocator::new(PathBuf::from(path));
                locator.workspace()?;
                locator
            }
            None => FilesystemWorkspaceLocator::from_current_dir()?,
        };

        let workspace_paths = locator.workspace()?;
        let service = DefaultTemplateService::from_workspace(workspace_paths.clone())?;

        Ok(Self {
            workspace_paths,
            service,
            verbosity,
        })
    }

    /// Bootstrap variant for commands that must run before a workspace
    /// exists (`init`).
    pub fn start_dir(workspace_override: Option<String>) -> Result<PathBuf, SmithError> {
        match workspace_override {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(std::env::current_dir()?),
        }
    }
}
