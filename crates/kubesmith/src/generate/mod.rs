mod chart;
mod flat;
mod overlay;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use handlebars::Handlebars;
use serde_json::{Map, Value};

use crate::error::SmithError;
use crate::model::{OutputFormat, Template, TemplateResource};
use crate::sync::resource_document;

/// Named key/value parameters substituted into generated output. Keys are
/// opaque strings; a key equal to a selected field name overrides that
/// field's value (how the override is expressed is format-specific).
pub type GenerationContext = BTreeMap<String, Value>;

/// One file of a generated artifact, path relative to the artifact root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub contents: String,
}

/// A format projection of one template snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Artifact {
    pub format: OutputFormat,
    /// `Kind/name` identity of every resource represented, in template
    /// order. All formats generated from the same snapshot must agree on
    /// this list.
    pub resources: Vec<String>,
    pub files: Vec<GeneratedFile>,
}

/// Trait seam for hosts that swap or wrap the generation pipeline.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        template: &Template,
        context: &GenerationContext,
        format: OutputFormat,
    ) -> Result<Artifact, SmithError>;
}

impl<T> Generator for Arc<T>
where
    T: Generator + ?Sized,
{
    fn generate(
        &self,
        template: &Template,
        context: &GenerationContext,
        format: OutputFormat,
    ) -> Result<Artifact, SmithError> {
        (**self).generate(template, context, format)
    }
}

/// Projects template snapshots into the three output formats.
#[derive(Default)]
pub struct GenerationEngine {
    registry: Handlebars<'static>,
}

impl GenerationEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    /// Generates every requested format from one snapshot of the template,
    /// fanning out one scoped thread per format. A failure in one format
    /// never aborts the others; each entry carries its own result.
    pub fn generate_all(
        &self,
        template: &Template,
        context: &GenerationContext,
        formats: &[OutputFormat],
    ) -> BTreeMap<OutputFormat, Result<Artifact, SmithError>> {
        // Snapshot once so edits racing the call cannot alter in-flight
        // inputs.
        let snapshot = template.clone();
        let mut results = BTreeMap::new();
        thread::scope(|scope| {
            let mut handles = Vec::new();
            for &format in formats {
                let snapshot = &snapshot;
                handles.push((
                    format,
                    scope.spawn(move || self.generate(snapshot, context, format)),
                ));
            }
            for (format, handle) in handles {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(SmithError::Render(format!(
                        "generation worker for {} format panicked",
                        format.as_str()
                    )))
                });
                results.insert(format, result);
            }
        });
        results
    }
}

impl Generator for GenerationEngine {
    fn generate(
        &self,
        template: &Template,
        context: &GenerationContext,
        format: OutputFormat,
    ) -> Result<Artifact, SmithError> {
        match format {
            OutputFormat::Manifest => flat::generate(template, context),
            OutputFormat::Chart => chart::generate(&self.registry, template, context),
            OutputFormat::Overlay => overlay::generate(template, context),
        }
    }
}

/// `Kind/name` identity used for the cross-format consistency invariant.
pub(crate) fn resource_identity(resource: &TemplateResource) -> String {
    format!("{}/{}", resource.kind, resource.name)
}

pub(crate) fn resource_identities(template: &Template) -> Vec<String> {
    template.resources.iter().map(resource_identity).collect()
}

/// File-name stem shared by every format so the same resource lands in
/// predictably named files across projections.
pub(crate) fn resource_file_stem(resource: &TemplateResource) -> String {
    sanitize_key(&format!(
        "{}-{}",
        resource.kind.to_ascii_lowercase(),
        resource.name
    ))
}

/// Key for a resource's entry in the chart values document.
pub(crate) fn values_key(resource: &TemplateResource) -> String {
    resource_file_stem(resource).replace('-', "_")
}

fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect()
}

/// The field values a resource contributes, with context overrides applied.
pub(crate) fn resolved_spec(
    resource: &TemplateResource,
    context: &GenerationContext,
) -> Map<String, Value> {
    let mut spec = Map::new();
    for field in &resource.selected_fields {
        let value = context
            .get(&field.name)
            .cloned()
            .unwrap_or_else(|| field.effective_default());
        spec.insert(field.name.clone(), value);
    }
    spec
}

/// The same default-populated document the text-sync projection builds,
/// merged with context substitution.
pub(crate) fn resolved_document(
    resource: &TemplateResource,
    context: &GenerationContext,
) -> Value {
    let mut document = resource_document(resource);
    if let Value::Object(map) = &mut document {
        map.insert("spec".into(), Value::Object(resolved_spec(resource, context)));
    }
    document
}
