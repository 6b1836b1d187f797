use clap::{ArgMatches, Command};

use crate::commands::CommandResult;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("init").about("Initialize a Kubesmith workspace in the current directory")
}

pub fn run(
    workspace_override: Option<String>,
    _matches: &ArgMatches,
) -> Result<CommandResult, CliError> {
    let root = CliSession::start_dir(workspace_override)?;
    let created = !root.join(".kubesmith").is_dir();
    let paths = kubesmith::initialize_workspace(&root)?;

    Ok(CommandResult::WorkspaceInitialized {
        root: paths.root().display().to_string(),
        dot_kubesmith: paths.dot_kubesmith().display().to_string(),
        created,
    })
}
