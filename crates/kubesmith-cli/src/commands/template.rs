use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use kubesmith::{PackageRequest, SemVer, Template, TemplateDraft};

use crate::commands::{CommandResult, TemplateSummary};
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};
use crate::util;

pub fn command() -> Command {
    Command::new("template")
        .about("Manage templates in the workspace")
        .subcommand(Command::new("ls").about("List templates in the workspace"))
        .subcommand(template_new_command())
        .subcommand(
            Command::new("show")
                .about("Print the full template document")
                .arg(Arg::new("id").required(true).value_name("ID")),
        )
        .subcommand(
            Command::new("search")
                .about("Fuzzy-search templates by name, description, and tags")
                .arg(Arg::new("query").required(true).value_name("QUERY")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a template from the workspace")
                .arg(Arg::new("id").required(true).value_name("ID")),
        )
        .subcommand(
            Command::new("export")
                .about("Write a template document to a file")
                .arg(Arg::new("id").required(true).value_name("ID"))
                .arg(Arg::new("path").required(true).value_name("PATH")),
        )
        .subcommand(
            Command::new("import")
                .about("Import a template document from a file path or HTTPS URL")
                .arg(Arg::new("locator").required(true).value_name("PATH_OR_URL")),
        )
        .subcommand(template_package_command())
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    match matches.subcommand() {
        Some(("ls", _)) => list_templates(session),
        Some(("new", sub)) => create_template(session, sub),
        Some(("show", sub)) => show_template(session, sub),
        Some(("search", sub)) => search_templates(session, sub),
        Some(("delete", sub)) => delete_template(session, sub),
        Some(("export", sub)) => export_template(session, sub),
        Some(("import", sub)) => import_template(session, sub),
        Some(("package", sub)) => package_template(session, sub),
        _ => Err(CliError::new(
            "unsupported template command",
            ExitStatus::Usage,
        )),
    }
}

fn list_templates(session: &CliSession) -> Result<CommandResult, CliError> {
    let templates = session
        .service
        .get_all()?
        .iter()
        .map(TemplateSummary::from_template)
        .collect();
    Ok(CommandResult::TemplateList { templates })
}

fn create_template(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let name = required_string(matches, "name")?;
    util::validate_template_name(&name)?;

    let mut draft = TemplateDraft::named(name);
    draft.description = matches.get_one::<String>("description").cloned();
    if let Some(raw) = matches.get_one::<String>("version") {
        let version = SemVer::parse(raw).map_err(|err| {
            CliError::new(
                format!("invalid template version '{raw}': {err}"),
                ExitStatus::Usage,
            )
        })?;
        draft.version = Some(version);
    }
    if let Some(tags) = matches.get_many::<String>("tag") {
        draft.tags = tags.cloned().collect();
    }

    let template = session.service.create(draft)?;
    let path = session
        .workspace_paths
        .templates_dir()
        .join(format!("{}.yaml", template.id));

    Ok(CommandResult::TemplateCreated {
        summary: TemplateSummary::from_template(&template),
        path: util::workspace_relative(session.workspace_paths.root(), &path),
    })
}

fn show_template(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let id = required_string(matches, "id")?;
    let template = load_template(session, &id)?;
    Ok(CommandResult::TemplateShown { template })
}

fn search_templates(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let query = required_string(matches, "query")?;
    let templates = session
        .service
        .search(&query)?
        .iter()
        .map(TemplateSummary::from_template)
        .collect();
    Ok(CommandResult::TemplateSearch { query, templates })
}

fn delete_template(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let id = required_string(matches, "id")?;
    let template = load_template(session, &id)?;
    session.service.delete(&id)?;
    Ok(CommandResult::TemplateDeleted {
        summary: TemplateSummary::from_template(&template),
    })
}

fn export_template(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let id = required_string(matches, "id")?;
    let path = PathBuf::from(required_string(matches, "path")?);
    session.service.export(&id, &path)?;
    Ok(CommandResult::TemplateExported {
        id,
        path: path.display().to_string(),
    })
}

fn import_template(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let locator = required_string(matches, "locator")?;
    let template = session.service.import(&locator)?;
    Ok(CommandResult::TemplateImported {
        summary: TemplateSummary::from_template(&template),
    })
}

fn package_template(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let id = required_string(matches, "id")?;
    let request = PackageRequest {
        registry: required_string(matches, "registry")?,
        repository: required_string(matches, "repository")?,
        tag: required_string(matches, "tag")?,
    };
    let reference = session.service.package(&id, &request)?;
    Ok(CommandResult::TemplatePackaged { id, reference })
}

fn template_new_command() -> Command {
    Command::new("new")
        .about("Create a new template")
        .arg(Arg::new("name").required(true).value_name("NAME"))
        .arg(
            Arg::new("description")
                .long("description")
                .value_name("TEXT")
                .help("Human-readable description stored with the template."),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .value_name("SEMVER")
                .help("Initial template version. Defaults to 0.1.0."),
        )
        .arg(
            Arg::new("tag")
                .long("tag")
                .value_name("TAG")
                .action(ArgAction::Append)
                .help("Tag to attach; may be repeated. Duplicates are dropped."),
        )
}

fn template_package_command() -> Command {
    Command::new("package")
        .about("Produce a content-addressed OCI reference for a template")
        .arg(Arg::new("id").required(true).value_name("ID"))
        .arg(
            Arg::new("registry")
                .long("registry")
                .required(true)
                .value_name("HOST"),
        )
        .arg(
            Arg::new("repository")
                .long("repository")
                .required(true)
                .value_name("PATH"),
        )
        .arg(Arg::new("tag").long("tag").required(true).value_name("TAG"))
}

pub(crate) fn load_template(session: &CliSession, id: &str) -> Result<Template, CliError> {
    session
        .service
        .get(id)?
        .ok_or_else(|| CliError::new(format!("template {id} does not exist"), ExitStatus::Data))
}

pub(crate) fn required_string(matches: &ArgMatches, name: &str) -> Result<String, CliError> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| CliError::new(format!("{name} is required"), ExitStatus::Usage))
}
