use clap::{Arg, ArgMatches, Command};

use crate::commands::CommandResult;
use crate::commands::template::required_string;
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};

pub fn command() -> Command {
    Command::new("catalog")
        .about("Browse the schema catalog")
        .subcommand(Command::new("kinds").about("List every kind the catalog offers"))
        .subcommand(
            Command::new("search")
                .about("Fuzzy-search the catalog by kind and group")
                .arg(Arg::new("query").required(true).value_name("QUERY")),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    match matches.subcommand() {
        Some(("kinds", _)) => {
            let kinds = session.service.available_kinds()?;
            Ok(CommandResult::CatalogKinds { kinds })
        }
        Some(("search", sub)) => {
            let query = required_string(sub, "query")?;
            let kinds = session.service.search_resources(&query)?;
            Ok(CommandResult::CatalogSearch { query, kinds })
        }
        _ => Err(CliError::new(
            "unsupported catalog command",
            ExitStatus::Usage,
        )),
    }
}
