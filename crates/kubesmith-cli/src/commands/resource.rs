use std::fs;

use clap::{Arg, ArgMatches, Command};
use kubesmith::{ResourceOrigin, TemplateResource, resource_from_text, resource_to_text};

use crate::commands::template::{load_template, required_string};
use crate::commands::{CommandResult, TemplateSummary};
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};

pub fn command() -> Command {
    Command::new("resource")
        .about("Manage resources within a template")
        .subcommand(resource_add_command())
        .subcommand(
            Command::new("rm")
                .about("Remove a resource from a template")
                .arg(Arg::new("template-id").required(true).value_name("TEMPLATE_ID"))
                .arg(Arg::new("resource-id").required(true).value_name("RESOURCE_ID")),
        )
        .subcommand(
            Command::new("text")
                .about("Print a resource's editable YAML document")
                .arg(Arg::new("template-id").required(true).value_name("TEMPLATE_ID"))
                .arg(Arg::new("resource-id").required(true).value_name("RESOURCE_ID")),
        )
        .subcommand(
            Command::new("sync")
                .about("Fold an edited YAML document back into a resource's field list")
                .arg(Arg::new("template-id").required(true).value_name("TEMPLATE_ID"))
                .arg(Arg::new("resource-id").required(true).value_name("RESOURCE_ID"))
                .arg(
                    Arg::new("file")
                        .long("file")
                        .required(true)
                        .value_name("PATH")
                        .help("Path to the edited resource document."),
                ),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    match matches.subcommand() {
        Some(("add", sub)) => add_resource(session, sub),
        Some(("rm", sub)) => remove_resource(session, sub),
        Some(("text", sub)) => resource_text(session, sub),
        Some(("sync", sub)) => sync_resource(session, sub),
        _ => Err(CliError::new(
            "unsupported resource command",
            ExitStatus::Usage,
        )),
    }
}

fn add_resource(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let template_id = required_string(matches, "template-id")?;
    let kind = required_string(matches, "kind")?;
    let mut template = load_template(session, &template_id)?;

    let mut resource = match matches.get_one::<String>("api-version") {
        Some(api_version) => TemplateResource::new(kind.clone(), api_version.clone()),
        None => {
            // Resolve the apiVersion through the catalog when not given.
            let descriptor = session
                .service
                .available_kinds()?
                .into_iter()
                .find(|k| k.kind.eq_ignore_ascii_case(&kind))
                .ok_or_else(|| {
                    CliError::new(
                        format!("kind '{kind}' is not in the catalog; pass --api-version"),
                        ExitStatus::Data,
                    )
                })?;
            let mut resource = TemplateResource::new(descriptor.kind, descriptor.api_version);
            resource.template_type = descriptor.template_type;
            resource.source = ResourceOrigin::Catalog;
            resource
        }
    };
    if let Some(name) = matches.get_one::<String>("name") {
        resource.name = name.clone();
    }

    let resource_id = resource.id.clone();
    let resource_kind = resource.kind.clone();
    let api_version = resource.api_version.clone();
    if !template.add_resource(resource) {
        return Err(CliError::new(
            format!(
                "template {} already contains {} ({})",
                template_id, resource_kind, api_version
            ),
            ExitStatus::Data,
        ));
    }
    session.service.save(&template)?;

    Ok(CommandResult::ResourceAdded {
        template: TemplateSummary::from_template(&template),
        resource_id,
        kind: resource_kind,
        api_version,
    })
}

fn remove_resource(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let template_id = required_string(matches, "template-id")?;
    let resource_id = required_string(matches, "resource-id")?;
    let mut template = load_template(session, &template_id)?;

    if template.remove_resource(&resource_id).is_none() {
        return Err(CliError::new(
            format!("template {template_id} has no resource {resource_id}"),
            ExitStatus::Data,
        ));
    }
    session.service.save(&template)?;

    Ok(CommandResult::ResourceRemoved {
        template: TemplateSummary::from_template(&template),
        resource_id,
    })
}

fn resource_text(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let template_id = required_string(matches, "template-id")?;
    let resource_id = required_string(matches, "resource-id")?;
    let template = load_template(session, &template_id)?;
    let resource = template.resource(&resource_id).ok_or_else(|| {
        CliError::new(
            format!("template {template_id} has no resource {resource_id}"),
            ExitStatus::Data,
        )
    })?;

    Ok(CommandResult::ResourceText {
        resource_id,
        text: resource_to_text(resource)?,
    })
}

fn sync_resource(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let template_id = required_string(matches, "template-id")?;
    let resource_id = required_string(matches, "resource-id")?;
    let file = required_string(matches, "file")?;
    let mut template = load_template(session, &template_id)?;

    let text = fs::read_to_string(&file)?;
    // Parse failures surface here; the stored template stays untouched.
    let patch = resource_from_text(&text)
        .map_err(|err| CliError::new(err.to_string(), ExitStatus::Data))?;

    let resource = template.resource_mut(&resource_id).ok_or_else(|| {
        CliError::new(
            format!("template {template_id} has no resource {resource_id}"),
            ExitStatus::Data,
        )
    })?;
    patch.apply_to(resource);
    let fields = resource.selected_fields.len();
    session.service.save(&template)?;

    Ok(CommandResult::ResourceSynced {
        template: TemplateSummary::from_template(&template),
        resource_id,
        fields,
    })
}

fn resource_add_command() -> Command {
    Command::new("add")
        .about("Add a resource to a template")
        .arg(Arg::new("template-id").required(true).value_name("TEMPLATE_ID"))
        .arg(Arg::new("kind").required(true).value_name("KIND"))
        .arg(
            Arg::new("api-version")
                .long("api-version")
                .value_name("GROUP/VERSION")
                .help("Explicit apiVersion. Defaults to the catalog entry for the kind."),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .value_name("NAME")
                .help("metadata.name for the resource. Defaults to the lowercased kind."),
        )
}
