use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{PropertyType, SchemaProperty};

pub use semver::Version as SemVer;

/// Generation targets a template can be projected into.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Flat manifest text, documents joined with `---`.
    #[default]
    Manifest,
    /// Parameterized chart layout: values file plus templated bodies.
    Chart,
    /// Base manifest set plus a patch/overlay descriptor.
    Overlay,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Manifest => "manifest",
            OutputFormat::Chart => "chart",
            OutputFormat::Overlay => "overlay",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "manifest" => Some(OutputFormat::Manifest),
            "chart" => Some(OutputFormat::Chart),
            "overlay" => Some(OutputFormat::Overlay),
            _ => None,
        }
    }

    pub fn all() -> [OutputFormat; 3] {
        [
            OutputFormat::Manifest,
            OutputFormat::Chart,
            OutputFormat::Overlay,
        ]
    }
}

/// Where a resource definition came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceOrigin {
    /// Picked from the schema catalog.
    Catalog,
    /// Authored by hand in the editor.
    #[default]
    Manual,
    /// Brought in through template import.
    Imported,
}

/// Per-template generation preferences.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GenerationSettings {
    pub output_formats: BTreeSet<OutputFormat>,
    pub default_format: OutputFormat,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            output_formats: BTreeSet::from(OutputFormat::all()),
            default_format: OutputFormat::Manifest,
        }
    }
}

/// A flattened field attached to a resource: the denormalized, non-recursive
/// view of a committed [`SchemaProperty`]. The key-value/structured object
/// distinction does not survive this projection.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TemplateField {
    pub name: String,
    pub field_type: PropertyType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

impl TemplateField {
    /// Flattens a committed property into the resource-level field shape.
    pub fn from_property(name: impl Into<String>, required: bool, property: &SchemaProperty) -> Self {
        let allowed = match property {
            SchemaProperty::String { allowed, .. } => allowed.clone(),
            _ => Vec::new(),
        };
        Self {
            name: name.into(),
            field_type: property.property_type(),
            required,
            description: property.meta().description.clone(),
            default: property.default_value(),
            allowed,
        }
    }

    /// The value this field contributes to a generated document: its
    /// default override, or the type's zero value.
    pub fn effective_default(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| crate::schema::default_for(self.field_type))
    }
}

/// One Kubernetes-style object definition within a template.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TemplateResource {
    pub id: String,
    pub kind: String,
    pub api_version: String,
    /// Backing value for `metadata.name` in the textual projection.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Opaque catalog label (e.g. "workload", "config"); the core never
    /// interprets it.
    #[serde(default)]
    pub template_type: String,
    #[serde(default)]
    pub source: ResourceOrigin,
    #[serde(default)]
    pub selected_fields: Vec<TemplateField>,
}

impl TemplateResource {
    pub fn new(kind: impl Into<String>, api_version: impl Into<String>) -> Self {
        let kind = kind.into();
        let name = kind.to_ascii_lowercase();
        Self {
            id: new_id(),
            kind,
            api_version: api_version.into(),
            name,
            namespace: None,
            template_type: String::new(),
            source: ResourceOrigin::default(),
            selected_fields: Vec::new(),
        }
    }

    /// The identity used for uniqueness within a template.
    pub fn key(&self) -> (&str, &str) {
        (&self.kind, &self.api_version)
    }

    pub fn field(&self, name: &str) -> Option<&TemplateField> {
        self.selected_fields.iter().find(|f| f.name == name)
    }

    /// Folds a committed property into the field list, overwriting any field
    /// with the same name. Committed snapshots are the sole source of truth;
    /// previous copies are replaced, not merged.
    pub fn apply_property(&mut self, name: &str, required: bool, property: &SchemaProperty) {
        let field = TemplateField::from_property(name, required, property);
        match self.selected_fields.iter_mut().find(|f| f.name == name) {
            Some(slot) => *slot = field,
            None => self.selected_fields.push(field),
        }
    }

    pub fn remove_field(&mut self, name: &str) -> bool {
        let before = self.selected_fields.len();
        self.selected_fields.retain(|f| f.name != name);
        self.selected_fields.len() != before
    }
}

/// A named collection of resources plus generation settings.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: SemVer,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub resources: Vec<TemplateResource>,
    #[serde(default)]
    pub generation: GenerationSettings,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            version: SemVer::new(0, 1, 0),
            tags: Vec::new(),
            resources: Vec::new(),
            generation: GenerationSettings::default(),
        }
    }

    /// Adds a tag, deduplicated on insert. Empty trimmed input and
    /// duplicates are dropped silently.
    pub fn add_tag(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() || self.tags.iter().any(|t| t == trimmed) {
            return false;
        }
        self.tags.push(trimmed.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Adds a resource. A `(kind, apiVersion)` pair already present in the
    /// template is rejected silently with no state change.
    pub fn add_resource(&mut self, resource: TemplateResource) -> bool {
        if self
            .resources
            .iter()
            .any(|existing| existing.key() == resource.key())
        {
            return false;
        }
        self.resources.push(resource);
        true
    }

    pub fn remove_resource(&mut self, id: &str) -> Option<TemplateResource> {
        let index = self.resources.iter().position(|r| r.id == id)?;
        Some(self.resources.remove(index))
    }

    pub fn resource(&self, id: &str) -> Option<&TemplateResource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn resource_mut(&mut self, id: &str) -> Option<&mut TemplateResource> {
        self.resources.iter_mut().find(|r| r.id == id)
    }
}

/// Generates a random 16-byte hex identifier for templates and resources.
pub fn new_id() -> String {
    let mut bytes = [0u8; 16];
    if getrandom::getrandom(&mut bytes).is_err() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        for (idx, b) in bytes.iter_mut().enumerate() {
            *b = ((now >> (idx * 8)) & 0xFF) as u8;
        }
    }
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyMeta;
    use serde_json::json;

    fn replicas_field() -> TemplateField {
        TemplateField {
            name: "replicas".into(),
            field_type: PropertyType::Number,
            required: true,
            description: None,
            default: Some(json!(3)),
            allowed: Vec::new(),
        }
    }

    #[test]
    fn duplicate_resource_key_is_rejected_without_state_change() {
        let mut template = Template::new("edge-stack");
        assert!(template.add_resource(TemplateResource::new("Service", "v1")));

        let mut duplicate = TemplateResource::new("Service", "v1");
        duplicate.selected_fields.push(replicas_field());
        assert!(!template.add_resource(duplicate));

        assert_eq!(template.resources.len(), 1);
        assert!(template.resources[0].selected_fields.is_empty());
    }

    #[test]
    fn same_kind_different_api_version_is_allowed() {
        let mut template = Template::new("mixed");
        assert!(template.add_resource(TemplateResource::new("Deployment", "apps/v1")));
        assert!(template.add_resource(TemplateResource::new("Deployment", "apps/v1beta1")));
        assert_eq!(template.resources.len(), 2);
    }

    #[test]
    fn tags_deduplicate_on_insert() {
        let mut template = Template::new("tagged");
        assert!(template.add_tag(" web "));
        assert!(!template.add_tag("web"));
        assert!(!template.add_tag("  "));
        assert_eq!(template.tags, ["web"]);
    }

    #[test]
    fn apply_property_overwrites_existing_field() {
        let mut resource = TemplateResource::new("Deployment", "apps/v1");
        resource.selected_fields.push(replicas_field());

        let committed = SchemaProperty::Integer {
            meta: PropertyMeta {
                title: None,
                description: Some("Desired pod count".into()),
            },
            default: Some(5),
        };
        resource.apply_property("replicas", false, &committed);

        assert_eq!(resource.selected_fields.len(), 1);
        let field = resource.field("replicas").unwrap();
        assert_eq!(field.field_type, PropertyType::Integer);
        assert_eq!(field.default, Some(json!(5)));
        assert!(!field.required);
        assert_eq!(field.description.as_deref(), Some("Desired pod count"));
    }

    #[test]
    fn effective_default_falls_back_to_zero_value() {
        let mut field = replicas_field();
        assert_eq!(field.effective_default(), json!(3));
        field.default = None;
        assert_eq!(field.effective_default(), json!(0));
    }

    #[test]
    fn generated_ids_are_unique_hex() {
        let a = new_id();
        let b = new_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
