use std::process::ExitCode;

use serde_json::json;

use crate::commands::CommandResult;
use crate::error::CliError;

pub enum OutputFormat {
    Text,
    Json,
}

/// Renders a `CommandResult` as either human-readable text or
/// newline-delimited JSON, converting outcomes into deterministic exit
/// codes.
pub fn emit_result(result: CommandResult, format: OutputFormat) -> Result<ExitCode, CliError> {
    match format {
        OutputFormat::Text => print_text(&result),
        OutputFormat::Json => print_json(&result)?,
    };
    Ok(ExitCode::from(result.exit_status().code()))
}

fn print_text(result: &CommandResult) {
    match result {
        CommandResult::WorkspaceInitialized {
            root,
            dot_kubesmith,
            created,
        } => {
            if *created {
                println!("Initialized workspace at {root} (.kubesmith: {dot_kubesmith})");
            } else {
                println!("Workspace already initialized at {root} (.kubesmith: {dot_kubesmith})");
            }
        }
        CommandResult::TemplateList { templates } => {
            println!("Templates ({}):", templates.len());
            for template in templates {
                print_template_row(template);
            }
        }
        CommandResult::TemplateCreated { summary, path } => {
            println!("Created template '{}' at {}", summary.name, path);
            println!("  Id: {}", summary.id);
        }
        CommandResult::TemplateShown { template } => match serde_yaml::to_string(template) {
            Ok(doc) => print!("{doc}"),
            Err(err) => println!("failed to render template document: {err}"),
        },
        CommandResult::TemplateSearch { query, templates } => {
            println!("Templates matching '{}' ({}):", query, templates.len());
            for template in templates {
                print_template_row(template);
            }
        }
        CommandResult::TemplateDeleted { summary } => {
            println!("Deleted template '{}' ({})", summary.name, summary.id);
        }
        CommandResult::TemplateExported { id, path } => {
            println!("Exported template {id} to {path}");
        }
        CommandResult::TemplateImported { summary } => {
            println!(
                "Imported template '{}' ({} resource(s), id: {})",
                summary.name, summary.resources, summary.id
            );
        }
        CommandResult::TemplatePackaged { id, reference } => {
            println!("Packaged template {id}");
            println!("  Reference: {}", reference.reference);
            println!("  Digest: sha256:{}", reference.digest);
        }
        CommandResult::ResourceAdded {
            template,
            resource_id,
            kind,
            api_version,
        } => {
            println!(
                "Added {} ({}) to template '{}'",
                kind, api_version, template.name
            );
            println!("  Resource id: {resource_id}");
        }
        CommandResult::ResourceRemoved {
            template,
            resource_id,
        } => {
            println!(
                "Removed resource {} from template '{}'",
                resource_id, template.name
            );
        }
        CommandResult::ResourceText { text, .. } => {
            print!("{text}");
        }
        CommandResult::ResourceSynced {
            template,
            resource_id,
            fields,
        } => {
            println!(
                "Synced resource {} in template '{}' ({} field(s))",
                resource_id, template.name, fields
            );
        }
        CommandResult::Generated {
            template_id,
            outcomes,
        } => {
            println!("Generation results for template {template_id}:");
            for outcome in outcomes {
                match &outcome.error {
                    // Operation failures are framed per format so they are
                    // never mistaken for validation findings.
                    Some(error) => {
                        println!("  [FAIL] {}: generation failed: {}", outcome.format, error)
                    }
                    None => {
                        println!("  [OK] {} ({} file(s))", outcome.format, outcome.files.len());
                        for file in &outcome.files {
                            println!("    - {file}");
                        }
                    }
                }
            }
        }
        CommandResult::Validated {
            template_id,
            report,
        } => {
            if report.valid {
                println!("Template {template_id} is valid");
            } else {
                println!(
                    "Template {} is invalid ({} error(s)):",
                    template_id,
                    report.errors.len()
                );
                for error in &report.errors {
                    println!("  - {error}");
                }
            }
        }
        CommandResult::CatalogKinds { kinds } => {
            println!("Available kinds ({}):", kinds.len());
            for kind in kinds {
                println!(
                    "  - {} ({}, group: {}, type: {})",
                    kind.kind, kind.api_version, kind.group, kind.template_type
                );
            }
        }
        CommandResult::CatalogSearch { query, kinds } => {
            println!("Kinds matching '{}' ({}):", query, kinds.len());
            for kind in kinds {
                println!("  - {} ({})", kind.kind, kind.api_version);
            }
        }
    }
}

fn print_template_row(summary: &crate::commands::TemplateSummary) {
    let tags = if summary.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", summary.tags.join(", "))
    };
    println!(
        "  - {} (version: {}, resources: {}, id: {}){}",
        summary.name, summary.version, summary.resources, summary.id, tags
    );
}

fn print_json(result: &CommandResult) -> Result<(), CliError> {
    let payload = json!(result);
    println!("{payload}");
    Ok(())
}
