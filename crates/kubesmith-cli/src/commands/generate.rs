use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use kubesmith::OutputFormat;

use crate::commands::template::{load_template, required_string};
use crate::commands::{CommandResult, GenerationOutcome};
use crate::context::CliSession;
use crate::error::{CliError, ExitStatus};
use crate::util;

pub fn command() -> Command {
    Command::new("generate")
        .about("Generate output artifacts from a template")
        .arg(Arg::new("id").required(true).value_name("TEMPLATE_ID"))
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .action(ArgAction::Append)
                .help("Output format (manifest, chart, overlay); may be repeated. Defaults to the template's configured formats."),
        )
        .arg(
            Arg::new("context")
                .long("context")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Context parameter substituted into the output; may be repeated."),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("DIR")
                .help("Output directory. Defaults to generated/<template-name> under the workspace root."),
        )
}

pub fn run(session: &CliSession, matches: &ArgMatches) -> Result<CommandResult, CliError> {
    let id = required_string(matches, "id")?;
    let template = load_template(session, &id)?;

    let context_pairs: Vec<String> = matches
        .get_many::<String>("context")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let context = util::parse_context_pairs(&context_pairs)?;

    let formats = match matches.get_many::<String>("format") {
        Some(raw) => {
            let mut formats = Vec::new();
            for value in raw {
                let format = OutputFormat::parse(value).ok_or_else(|| {
                    CliError::new(
                        format!("unknown format '{value}' (expected manifest, chart, or overlay)"),
                        ExitStatus::Usage,
                    )
                })?;
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
            formats
        }
        None => template.generation.output_formats.iter().copied().collect(),
    };

    let output = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| session.workspace_paths.output_dir().join(&template.name));

    let outcomes = if let [format] = formats[..] {
        // A single requested format lands directly in the output directory.
        match session.service.generate(&id, &context, &output, format) {
            Ok(artifact) => vec![GenerationOutcome {
                format: format.as_str().to_string(),
                files: artifact.generated_files,
                error: None,
            }],
            Err(err) => vec![GenerationOutcome {
                format: format.as_str().to_string(),
                files: Vec::new(),
                error: Some(err.to_string()),
            }],
        }
    } else {
        // Several formats fan out concurrently, one subdirectory each; a
        // failing format never blocks the rest.
        let results = session
            .service
            .generate_all(&id, &context, &output, &formats)?;
        results
            .into_iter()
            .map(|(format, result)| match result {
                Ok(artifact) => GenerationOutcome {
                    format: format.as_str().to_string(),
                    files: artifact.generated_files,
                    error: None,
                },
                Err(err) => GenerationOutcome {
                    format: format.as_str().to_string(),
                    files: Vec::new(),
                    error: Some(err.to_string()),
                },
            })
            .collect()
    };

    Ok(CommandResult::Generated {
        template_id: id,
        outcomes,
    })
}
