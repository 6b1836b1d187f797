use handlebars::Handlebars;
use serde_json::{Map, Value, json};

use crate::error::SmithError;
use crate::model::{OutputFormat, Template};

use super::{
    Artifact, GeneratedFile, GenerationContext, resolved_spec, resource_file_stem,
    resource_identities, values_key,
};

/// Chart projection: a chart descriptor, a values file carrying the resolved
/// field values, and one templated manifest body per resource.
///
/// Substitution policy: parameterization. Context overrides land in
/// `values.yaml`; manifest bodies reference values through
/// `{{values.<resource-key>.[<field>]}}` placeholders. Each body is rendered
/// once against the values document as a validation step before the artifact
/// is returned.
pub(crate) fn generate(
    registry: &Handlebars<'static>,
    template: &Template,
    context: &GenerationContext,
) -> Result<Artifact, SmithError> {
    let mut files = Vec::new();

    let chart_descriptor = json!({
        "apiVersion": "v2",
        "name": template.name,
        "description": template.description.clone().unwrap_or_default(),
        "version": template.version.to_string(),
    });
    files.push(GeneratedFile {
        path: "Chart.yaml".into(),
        contents: serde_yaml::to_string(&chart_descriptor)?,
    });

    let mut values = Map::new();
    for resource in &template.resources {
        values.insert(
            values_key(resource),
            Value::Object(resolved_spec(resource, context)),
        );
    }
    files.push(GeneratedFile {
        path: "values.yaml".into(),
        contents: serde_yaml::to_string(&Value::Object(values.clone()))?,
    });

    let render_data = json!({ "values": values });
    for resource in &template.resources {
        let key = values_key(resource);
        let mut spec = Map::new();
        for field in &resource.selected_fields {
            spec.insert(
                field.name.clone(),
                Value::String(format!("{{{{values.{key}.[{}]}}}}", field.name)),
            );
        }

        let mut metadata = Map::new();
        metadata.insert("name".into(), Value::String(resource.name.clone()));
        if let Some(namespace) = &resource.namespace {
            metadata.insert("namespace".into(), Value::String(namespace.clone()));
        }

        let mut body = Map::new();
        body.insert(
            "apiVersion".into(),
            Value::String(resource.api_version.clone()),
        );
        body.insert("kind".into(), Value::String(resource.kind.clone()));
        body.insert("metadata".into(), Value::Object(metadata));
        body.insert("spec".into(), Value::Object(spec));
        let templated = serde_yaml::to_string(&Value::Object(body))?;

        // Render once against the values document so a body that cannot
        // resolve surfaces here instead of at the consumer.
        registry
            .render_template(&templated, &render_data)
            .map_err(|err| SmithError::Render(err.to_string()))?;

        files.push(GeneratedFile {
            path: format!("templates/{}.yaml", resource_file_stem(resource)),
            contents: templated,
        });
    }

    Ok(Artifact {
        format: OutputFormat::Chart,
        resources: resource_identities(template),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::fixture_template;
    use super::*;
    use serde_json::json;

    fn registry() -> Handlebars<'static> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
    }

    #[test]
    fn chart_layout_carries_descriptor_values_and_bodies() {
        let artifact =
            generate(&registry(), &fixture_template(), &GenerationContext::new()).unwrap();
        let paths: Vec<&str> = artifact.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "Chart.yaml",
                "values.yaml",
                "templates/deployment-web.yaml",
                "templates/service-web-svc.yaml",
            ]
        );
    }

    #[test]
    fn context_overrides_land_in_values_not_bodies() {
        let mut context = GenerationContext::new();
        context.insert("replicas".into(), json!(9));
        let artifact = generate(&registry(), &fixture_template(), &context).unwrap();

        let values = artifact
            .files
            .iter()
            .find(|f| f.path == "values.yaml")
            .unwrap();
        assert!(values.contents.contains("replicas: 9"));

        let body = artifact
            .files
            .iter()
            .find(|f| f.path == "templates/deployment-web.yaml")
            .unwrap();
        assert!(
            body.contents
                .contains("{{values.deployment_web.[replicas]}}")
        );
        assert!(!body.contents.contains("replicas: 9"));
    }

    #[test]
    fn templated_bodies_render_against_the_values_document() {
        let template = fixture_template();
        let artifact = generate(&registry(), &template, &GenerationContext::new()).unwrap();
        let body = artifact
            .files
            .iter()
            .find(|f| f.path == "templates/deployment-web.yaml")
            .unwrap();

        let values: Value =
            serde_yaml::from_str(&artifact.files[1].contents).expect("values parse");
        let rendered = registry()
            .render_template(&body.contents, &json!({ "values": values }))
            .expect("placeholders resolve");
        // Placeholder strings are quoted in the YAML body, so rendered
        // values keep the quotes.
        assert!(rendered.contains("replicas: '3'"));
        assert!(rendered.contains("image: 'nginx:1.27'"));
    }
}
