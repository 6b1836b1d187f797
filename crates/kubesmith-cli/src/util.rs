use std::path::Path;

use kubesmith::workspace_relative_path;
use serde_json::Value;

use crate::error::{CliError, ExitStatus};

#[derive(Clone, Copy, Debug, Default)]
pub struct Verbosity {
    pub json: bool,
    pub verbose: bool,
}

/// Parses repeated `key=value` context flags. Values are read as YAML
/// scalars so `replicas=5` arrives as a number and `paused=true` as a bool.
pub fn parse_context_pairs(raw: &[String]) -> Result<kubesmith::GenerationContext, CliError> {
    let mut context = kubesmith::GenerationContext::new();
    for pair in raw {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            CliError::new(
                format!("context entry '{pair}' must use key=value form"),
                ExitStatus::Usage,
            )
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::new(
                format!("context entry '{pair}' has an empty key"),
                ExitStatus::Usage,
            ));
        }
        let parsed: Value = serde_yaml::from_str(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        context.insert(key.to_string(), parsed);
    }
    Ok(context)
}

pub fn validate_template_name(name: &str) -> Result<(), CliError> {
    if name.trim().is_empty() {
        return Err(CliError::new(
            "template name must not be empty",
            ExitStatus::Usage,
        ));
    }
    Ok(())
}

pub fn workspace_relative(root: &Path, path: &Path) -> String {
    workspace_relative_path(root, path).unwrap_or_else(|| path.to_string_lossy().into_owned())
}
