use crate::error::SmithError;
use crate::model::{OutputFormat, Template};

use super::{Artifact, GeneratedFile, GenerationContext, resolved_document, resource_identities};

/// Flat manifest projection: every resource's resolved document joined with
/// `---` separators into a single file.
///
/// Substitution policy: direct value injection. A context key equal to a
/// selected field name replaces that field's value in the `spec` mapping.
pub(crate) fn generate(
    template: &Template,
    context: &GenerationContext,
) -> Result<Artifact, SmithError> {
    let mut documents = Vec::with_capacity(template.resources.len());
    for resource in &template.resources {
        let document = resolved_document(resource, context);
        documents.push(serde_yaml::to_string(&document)?);
    }

    Ok(Artifact {
        format: OutputFormat::Manifest,
        resources: resource_identities(template),
        files: vec![GeneratedFile {
            path: "manifests.yaml".into(),
            contents: documents.join("---\n"),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::fixture_template;
    use super::*;
    use serde_json::json;

    #[test]
    fn manifests_concatenate_with_document_separators() {
        let artifact = generate(&fixture_template(), &GenerationContext::new()).unwrap();
        assert_eq!(artifact.files.len(), 1);
        let body = &artifact.files[0].contents;
        assert_eq!(body.matches("---\n").count(), 1);
        assert!(body.contains("kind: Deployment"));
        assert!(body.contains("kind: Service"));
        assert!(body.contains("replicas: 3"));
    }

    #[test]
    fn context_values_are_injected_directly() {
        let mut context = GenerationContext::new();
        context.insert("replicas".into(), json!(7));
        let artifact = generate(&fixture_template(), &context).unwrap();
        let body = &artifact.files[0].contents;
        assert!(body.contains("replicas: 7"));
        assert!(!body.contains("replicas: 3"));
    }

    #[test]
    fn empty_template_yields_empty_manifest_body() {
        let template = crate::model::Template::new("empty");
        let artifact = generate(&template, &GenerationContext::new()).unwrap();
        assert!(artifact.resources.is_empty());
        assert_eq!(artifact.files[0].contents, "");
    }
}
