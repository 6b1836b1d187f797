use serde_json::{Map, Value, json};

use crate::error::SmithError;
use crate::model::{OutputFormat, Template, TemplateResource};
use crate::sync::resource_document;

use super::{
    Artifact, GeneratedFile, GenerationContext, resource_file_stem, resource_identities,
};

/// Overlay projection: a `base/` manifest set carrying pure defaults plus an
/// `overlays/default/` patch descriptor.
///
/// Substitution policy: context overrides never touch the base documents;
/// each resource with at least one overridden field gets a strategic-merge
/// patch in the overlay layer. An empty context produces an empty patch
/// list.
pub(crate) fn generate(
    template: &Template,
    context: &GenerationContext,
) -> Result<Artifact, SmithError> {
    let mut files = Vec::new();
    let mut base_entries = Vec::new();
    let mut patch_entries = Vec::new();

    for resource in &template.resources {
        let stem = resource_file_stem(resource);
        let file_name = format!("{stem}.yaml");
        files.push(GeneratedFile {
            path: format!("base/{file_name}"),
            contents: serde_yaml::to_string(&resource_document(resource))?,
        });
        base_entries.push(Value::String(file_name));

        if let Some(patch) = patch_document(resource, context) {
            let patch_name = format!("{stem}-patch.yaml");
            files.push(GeneratedFile {
                path: format!("overlays/default/{patch_name}"),
                contents: serde_yaml::to_string(&patch)?,
            });
            patch_entries.push(json!({ "path": patch_name }));
        }
    }

    let base_kustomization = json!({
        "apiVersion": "kustomize.config.k8s.io/v1beta1",
        "kind": "Kustomization",
        "resources": base_entries,
    });
    files.insert(
        0,
        GeneratedFile {
            path: "base/kustomization.yaml".into(),
            contents: serde_yaml::to_string(&base_kustomization)?,
        },
    );

    let overlay_kustomization = json!({
        "apiVersion": "kustomize.config.k8s.io/v1beta1",
        "kind": "Kustomization",
        "resources": ["../../base"],
        "patches": patch_entries,
    });
    files.push(GeneratedFile {
        path: "overlays/default/kustomization.yaml".into(),
        contents: serde_yaml::to_string(&overlay_kustomization)?,
    });

    Ok(Artifact {
        format: OutputFormat::Overlay,
        resources: resource_identities(template),
        files,
    })
}

/// A strategic-merge patch carrying only the context-overridden fields, or
/// `None` when the context touches none of the resource's fields.
fn patch_document(resource: &TemplateResource, context: &GenerationContext) -> Option<Value> {
    let mut overridden = Map::new();
    for field in &resource.selected_fields {
        if let Some(value) = context.get(&field.name) {
            overridden.insert(field.name.clone(), value.clone());
        }
    }
    if overridden.is_empty() {
        return None;
    }

    Some(json!({
        "apiVersion": resource.api_version,
        "kind": resource.kind,
        "metadata": { "name": resource.name },
        "spec": overridden,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::tests::fixture_template;
    use super::*;
    use serde_json::json;

    #[test]
    fn base_layer_lists_every_resource() {
        let artifact = generate(&fixture_template(), &GenerationContext::new()).unwrap();
        let base = artifact
            .files
            .iter()
            .find(|f| f.path == "base/kustomization.yaml")
            .unwrap();
        assert!(base.contents.contains("deployment-web.yaml"));
        assert!(base.contents.contains("service-web-svc.yaml"));
    }

    #[test]
    fn empty_context_produces_no_patches() {
        let artifact = generate(&fixture_template(), &GenerationContext::new()).unwrap();
        assert!(
            artifact
                .files
                .iter()
                .all(|f| !f.path.ends_with("-patch.yaml"))
        );
        let overlay = artifact
            .files
            .iter()
            .find(|f| f.path == "overlays/default/kustomization.yaml")
            .unwrap();
        assert!(overlay.contents.contains("patches: []"));
    }

    #[test]
    fn overridden_fields_patch_in_the_overlay_layer_only() {
        let mut context = GenerationContext::new();
        context.insert("replicas".into(), json!(9));
        let artifact = generate(&fixture_template(), &context).unwrap();

        let base = artifact
            .files
            .iter()
            .find(|f| f.path == "base/deployment-web.yaml")
            .unwrap();
        assert!(base.contents.contains("replicas: 3"));

        let patch = artifact
            .files
            .iter()
            .find(|f| f.path == "overlays/default/deployment-web-patch.yaml")
            .unwrap();
        assert!(patch.contents.contains("replicas: 9"));
        // Untouched fields stay out of the patch.
        assert!(!patch.contents.contains("image"));

        // The service has no overridden field, so no patch is emitted for it.
        assert!(
            !artifact
                .files
                .iter()
                .any(|f| f.path == "overlays/default/service-web-svc-patch.yaml")
        );
    }
}
