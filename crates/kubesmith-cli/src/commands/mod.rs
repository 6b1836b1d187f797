use serde::Serialize;

use kubesmith::{KindDescriptor, PackageReference, Template, ValidationReport};

use crate::error::ExitStatus;

pub mod catalog;
pub mod generate;
pub mod init;
pub mod resource;
pub mod template;
pub mod validate;

/// Compact listing row for a template.
#[derive(Clone, Debug, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub resources: usize,
    pub tags: Vec<String>,
}

impl TemplateSummary {
    pub fn from_template(template: &Template) -> Self {
        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            version: template.version.to_string(),
            resources: template.resources.len(),
            tags: template.tags.clone(),
        }
    }
}

/// Per-format outcome of a generation run; `error` is set when that format
/// failed while the others proceeded.
#[derive(Clone, Debug, Serialize)]
pub struct GenerationOutcome {
    pub format: String,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandResult {
    WorkspaceInitialized {
        root: String,
        dot_kubesmith: String,
        created: bool,
    },
    TemplateList {
        templates: Vec<TemplateSummary>,
    },
    TemplateCreated {
        summary: TemplateSummary,
        path: String,
    },
    TemplateShown {
        template: Template,
    },
    TemplateSearch {
        query: String,
        templates: Vec<TemplateSummary>,
    },
    TemplateDeleted {
        summary: TemplateSummary,
    },
    TemplateExported {
        id: String,
        path: String,
    },
    TemplateImported {
        summary: TemplateSummary,
    },
    TemplatePackaged {
        id: String,
        reference: PackageReference,
    },
    ResourceAdded {
        template: TemplateSummary,
        resource_id: String,
        kind: String,
        api_version: String,
    },
    ResourceRemoved {
        template: TemplateSummary,
        resource_id: String,
    },
    ResourceText {
        resource_id: String,
        text: String,
    },
    ResourceSynced {
        template: TemplateSummary,
        resource_id: String,
        fields: usize,
    },
    Generated {
        template_id: String,
        outcomes: Vec<GenerationOutcome>,
    },
    Validated {
        template_id: String,
        report: ValidationReport,
    },
    CatalogKinds {
        kinds: Vec<KindDescriptor>,
    },
    CatalogSearch {
        query: String,
        kinds: Vec<KindDescriptor>,
    },
}

impl CommandResult {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            CommandResult::Validated { report, .. } => {
                if report.valid {
                    ExitStatus::Ok
                } else {
                    ExitStatus::Data
                }
            }
            CommandResult::Generated { outcomes, .. } => {
                if outcomes.iter().any(|outcome| outcome.error.is_some()) {
                    ExitStatus::Software
                } else {
                    ExitStatus::Ok
                }
            }
            _ => ExitStatus::Ok,
        }
    }
}
