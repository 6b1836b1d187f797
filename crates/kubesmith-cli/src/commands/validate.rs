use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::commands::CommandResult;
use crate::commands::template::required_string;
use crate::context::CliSession;
use crate::error::CliError;

pub fn command() -> Command {
    Command::new("validate")
        .about("Dry-run a template against schema constraints")
        .arg(Arg::new("id").required(true).value_name("TEMPLATE_ID"))
        .arg(
            Arg::new("full")
                .long("full")
                .action(ArgAction::SetTrue)
                .help("Additionally smoke-run every configured output format through the generation engine."),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let id = required_string(matches, "id")?;
    let dry_run = !matches.get_flag("full");
    let report = session.service.validate(&id, dry_run)?;
    Ok(CommandResult::Validated {
        template_id: id,
        report,
    })
}
