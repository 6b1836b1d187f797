use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::SchemaCatalog;
use crate::error::SmithError;
use crate::model::{Template, TemplateResource};
use crate::schema::PropertyType;

/// Outcome of a dry-run validation pass: a flat list of human-readable
/// messages, never an error for a structurally well-formed template.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks a template against schema constraints without mutating it. Only a
/// failing catalog lookup (a remote-call failure, not a template defect)
/// surfaces as `Err`.
pub fn validate_template(
    template: &Template,
    catalog: &dyn SchemaCatalog,
) -> Result<ValidationReport, SmithError> {
    let known = catalog.available_kinds()?;
    let mut errors = Vec::new();

    if template.name.trim().is_empty() {
        errors.push("template name must not be empty".to_string());
    }

    for resource in &template.resources {
        check_resource(resource, &known, &mut errors);
    }

    Ok(ValidationReport::from_errors(errors))
}

/// Validates a single resource projected as a singleton template.
pub fn validate_resource(
    resource: &TemplateResource,
    catalog: &dyn SchemaCatalog,
) -> Result<ValidationReport, SmithError> {
    let mut template = Template::new("dry-run");
    template.add_resource(resource.clone());
    validate_template(&template, catalog)
}

fn check_resource(
    resource: &TemplateResource,
    known: &[crate::catalog::KindDescriptor],
    errors: &mut Vec<String>,
) {
    let label = format!("{}/{}", resource.kind, resource.name);

    if resource.kind.trim().is_empty() {
        errors.push(format!("resource {label}: kind must not be empty"));
    }
    if resource.api_version.trim().is_empty() {
        errors.push(format!("resource {label}: apiVersion must not be empty"));
    } else if !resource.kind.trim().is_empty()
        && !known
            .iter()
            .any(|k| k.kind == resource.kind && k.api_version == resource.api_version)
    {
        errors.push(format!(
            "resource {label}: unknown kind {} ({})",
            resource.kind, resource.api_version
        ));
    }

    if !is_dns_label(&resource.name) {
        errors.push(format!(
            "resource {label}: name '{}' is not a valid DNS-1123 label",
            resource.name
        ));
    }

    let mut seen = std::collections::BTreeSet::new();
    for field in &resource.selected_fields {
        if field.name.trim().is_empty() {
            errors.push(format!("resource {label}: field with empty name"));
            continue;
        }
        if !seen.insert(field.name.as_str()) {
            errors.push(format!(
                "resource {label}: duplicate field '{}'",
                field.name
            ));
        }
        if field.field_type == PropertyType::String && !field.allowed.is_empty() {
            if let Some(Value::String(default)) = &field.default {
                if !field.allowed.iter().any(|v| v == default) {
                    errors.push(format!(
                        "resource {label}: field '{}' default '{}' is not one of its allowed values",
                        field.name, default
                    ));
                }
            }
        }
    }
}

/// DNS-1123 label: lowercase alphanumerics and '-', starting and ending
/// alphanumeric, at most 63 characters.
fn is_dns_label(raw: &str) -> bool {
    static LABEL_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = LABEL_REGEX
        .get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("Invalid regex"));
    raw.len() <= 63 && re.is_match(raw)
}
