use serde_json::{Map, Value};

use crate::error::{ResourceParseError, SmithError};
use crate::model::{TemplateField, TemplateResource};
use crate::schema::infer_type;

/// Projects a resource into its editable YAML document, pre-filled with each
/// selected field's effective default.
///
/// This is a lossy projection: `required`, `description`, and enum
/// constraints are not represented in the text form.
pub fn resource_to_text(resource: &TemplateResource) -> Result<String, SmithError> {
    let document = resource_document(resource);
    Ok(serde_yaml::to_string(&document)?)
}

/// The intermediate object behind [`resource_to_text`], shared with the
/// generation engine so the two can never drift apart.
pub(crate) fn resource_document(resource: &TemplateResource) -> Value {
    let mut metadata = Map::new();
    metadata.insert("name".into(), Value::String(resource.name.clone()));
    if let Some(namespace) = &resource.namespace {
        metadata.insert("namespace".into(), Value::String(namespace.clone()));
    }

    let mut spec = Map::new();
    for field in &resource.selected_fields {
        spec.insert(field.name.clone(), field.effective_default());
    }

    let mut document = Map::new();
    document.insert(
        "apiVersion".into(),
        Value::String(resource.api_version.clone()),
    );
    document.insert("kind".into(), Value::String(resource.kind.clone()));
    document.insert("metadata".into(), Value::Object(metadata));
    document.insert("spec".into(), Value::Object(spec));
    Value::Object(document)
}

/// The changes parsed out of an edited resource document.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ResourcePatch {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub fields: Vec<TemplateField>,
}

impl ResourcePatch {
    /// Applies the patch: scalars overwrite when present, and the field list
    /// replaces `selected_fields` wholesale. Metadata that the text form
    /// cannot carry (`required` flags, enum constraints) does not survive;
    /// this destructive replacement is the documented contract.
    pub fn apply_to(&self, resource: &mut TemplateResource) {
        if let Some(api_version) = &self.api_version {
            resource.api_version = api_version.clone();
        }
        if let Some(kind) = &self.kind {
            resource.kind = kind.clone();
        }
        if let Some(name) = &self.name {
            resource.name = name.clone();
        }
        if let Some(namespace) = &self.namespace {
            resource.namespace = Some(namespace.clone());
        }
        resource.selected_fields = self.fields.clone();
    }
}

/// Parses an edited document back into a [`ResourcePatch`]. Field types are
/// inferred from the parsed runtime values.
///
/// Parse failures are returned to the caller rather than swallowed; the
/// previous in-memory resource stays untouched until a patch is applied.
pub fn resource_from_text(text: &str) -> Result<ResourcePatch, ResourceParseError> {
    let value: Value = serde_yaml::from_str(text).map_err(|err| {
        tracing::debug!(error = %err, "resource document rejected");
        ResourceParseError::Syntax(err.to_string())
    })?;

    let root = match value {
        Value::Object(map) => map,
        _ => return Err(ResourceParseError::NotAMapping),
    };

    let api_version = scalar_string(&root, "apiVersion")?;
    let kind = scalar_string(&root, "kind")?;

    let (name, namespace) = match root.get("metadata") {
        Some(Value::Object(metadata)) => (
            scalar_string(metadata, "name")?,
            scalar_string(metadata, "namespace")?,
        ),
        _ => (None, None),
    };

    let mut fields = Vec::new();
    if let Some(Value::Object(spec)) = root.get("spec") {
        for (field_name, field_value) in spec {
            fields.push(TemplateField {
                name: field_name.clone(),
                field_type: infer_type(field_value),
                required: false,
                description: None,
                default: Some(field_value.clone()),
                allowed: Vec::new(),
            });
        }
    }

    Ok(ResourcePatch {
        api_version,
        kind,
        name,
        namespace,
        fields,
    })
}

fn scalar_string(
    map: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, ResourceParseError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ResourceParseError::ScalarExpected(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyType;
    use serde_json::json;

    fn deployment() -> TemplateResource {
        let mut resource = TemplateResource::new("Deployment", "apps/v1");
        resource.name = "web".into();
        resource.selected_fields.push(TemplateField {
            name: "replicas".into(),
            field_type: PropertyType::Number,
            required: true,
            description: Some("Desired pod count".into()),
            default: Some(json!(3)),
            allowed: Vec::new(),
        });
        resource
    }

    #[test]
    fn text_projection_prefills_effective_defaults() {
        let text = resource_to_text(&deployment()).unwrap();
        assert!(text.contains("apiVersion: apps/v1"));
        assert!(text.contains("kind: Deployment"));
        assert!(text.contains("name: web"));
        assert!(text.contains("replicas: 3"));
        // Field metadata is not represented in the text form.
        assert!(!text.contains("required"));
        assert!(!text.contains("Desired pod count"));
    }

    #[test]
    fn untouched_round_trip_resets_required_flag() {
        // The destructive-sync contract: values survive the round trip, the
        // required flag is reset to false. Debatable, but documented.
        let mut resource = deployment();
        let text = resource_to_text(&resource).unwrap();
        let patch = resource_from_text(&text).unwrap();
        patch.apply_to(&mut resource);

        assert_eq!(
            resource.selected_fields,
            vec![TemplateField {
                name: "replicas".into(),
                field_type: PropertyType::Number,
                required: false,
                description: None,
                default: Some(json!(3)),
                allowed: Vec::new(),
            }]
        );
    }

    #[test]
    fn field_types_are_inferred_from_parsed_values() {
        let patch = resource_from_text(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: svc\nspec:\n  port: 8080\n  headless: true\n  selectors:\n    app: web\n  args:\n    - serve\n  protocol: TCP\n",
        )
        .unwrap();

        let types: Vec<(String, PropertyType)> = patch
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.field_type))
            .collect();
        assert!(types.contains(&("port".into(), PropertyType::Number)));
        assert!(types.contains(&("headless".into(), PropertyType::Boolean)));
        assert!(types.contains(&("selectors".into(), PropertyType::Object)));
        assert!(types.contains(&("args".into(), PropertyType::Array)));
        assert!(types.contains(&("protocol".into(), PropertyType::String)));
    }

    #[test]
    fn scalar_edits_overwrite_resource_identity() {
        let mut resource = deployment();
        let patch = resource_from_text(
            "apiVersion: apps/v1\nkind: StatefulSet\nmetadata:\n  name: db\n  namespace: storage\nspec: {}\n",
        )
        .unwrap();
        patch.apply_to(&mut resource);

        assert_eq!(resource.kind, "StatefulSet");
        assert_eq!(resource.name, "db");
        assert_eq!(resource.namespace.as_deref(), Some("storage"));
        assert!(resource.selected_fields.is_empty());
    }

    #[test]
    fn parse_failure_is_an_explicit_error() {
        let err = resource_from_text("kind: [unclosed").unwrap_err();
        assert!(matches!(err, ResourceParseError::Syntax(_)));

        let err = resource_from_text("- not\n- a\n- mapping\n").unwrap_err();
        assert!(matches!(err, ResourceParseError::NotAMapping));
    }

    #[test]
    fn previous_state_is_kept_until_a_patch_applies() {
        let resource = deployment();
        let result = resource_from_text("kind: [unclosed");
        assert!(result.is_err());
        // Caller keeps the untouched resource; nothing was partially applied.
        assert_eq!(resource.selected_fields.len(), 1);
        assert!(resource.selected_fields[0].required);
    }
}
