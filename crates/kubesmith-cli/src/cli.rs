use std::ffi::OsString;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::commands;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};
use crate::formatter::{OutputFormat, emit_result};
use crate::util::Verbosity;

const NAME: &str = "kubesmith";

pub fn run() -> ExitCode {
    init_tracing();
    match run_cli(std::env::args()) {
        Ok(code) => code,
        Err(err) => {
            err.print();
            err.exit_code()
        }
    }
}

/// Parses CLI arguments, resolves the workspace, and dispatches to the
/// appropriate command. Returns a POSIX `sysexits`-compatible `ExitCode` so
/// automation can react deterministically.
pub fn run_cli<I, S>(args: I) -> Result<ExitCode, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let command = build_cli();
    let matches = command.try_get_matches_from(args)?;

    let verbosity = Verbosity {
        json: matches.get_flag("json"),
        verbose: matches.get_flag("verbose"),
    };
    let output = if verbosity.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let workspace_override = matches.get_one::<String>("workspace").cloned();

    // `init` runs before a workspace exists, so it bypasses session
    // bootstrapping.
    if let Some(("init", sub)) = matches.subcommand() {
        let result = commands::init::run(workspace_override, sub)?;
        return emit_result(result, output);
    }

    let session = CliSession::bootstrap(workspace_override, verbosity)?;
    if session.verbosity.verbose {
        tracing::info!(
            workspace = %session.workspace_paths.root().display(),
            templates_dir = %session.workspace_paths.templates_dir().display(),
            "resolved workspace context"
        );
    }

    let result = dispatch(&session, &matches)?;
    emit_result(result, output)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Defines the root `clap::Command` tree, including global flags and the
/// `init`, `template`, `resource`, `generate`, `validate`, and `catalog`
/// subcommands.
fn build_cli() -> Command {
    Command::new(NAME)
        .about("Kubesmith CLI")
        .arg(
            Arg::new("workspace")
                .long("workspace")
                .value_name("PATH")
                .help("Specify the workspace root. Defaults to the nearest ancestor with a .kubesmith folder."),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit newline-delimited JSON instead of human-readable text."),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Emit additional logging about workspace paths and store operations."),
        )
        .subcommand_required(true)
        .subcommand(commands::init::command())
        .subcommand(commands::template::command())
        .subcommand(commands::resource::command())
        .subcommand(commands::generate::command())
        .subcommand(commands::validate::command())
        .subcommand(commands::catalog::command())
}

/// Delegates parsed subcommands to their respective modules. Unknown
/// subcommands map to `EX_USAGE` so callers receive actionable feedback.
fn dispatch(
    session: &CliSession,
    matches: &ArgMatches,
) -> Result<commands::CommandResult, CliError> {
    match matches.subcommand() {
        Some(("template", sub)) => commands::template::run(session, sub),
        Some(("resource", sub)) => commands::resource::run(session, sub),
        Some(("generate", sub)) => commands::generate::run(session, sub),
        Some(("validate", sub)) => commands::validate::run(session, sub),
        Some(("catalog", sub)) => commands::catalog::run(session, sub),
        _ => Err(CliError::new("missing command", ExitStatus::Usage)),
    }
}
