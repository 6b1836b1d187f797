use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SmithError;
use crate::model::Template;

/// Destination coordinates for packaging a template as an OCI artifact.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct PackageRequest {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

/// A content-addressed package reference. Pushing the artifact is an
/// external collaborator's job; the core stops at the reference.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PackageReference {
    pub reference: String,
    pub digest: String,
}

/// Boundary trait so hosts can swap in a real registry client.
pub trait TemplatePackager: Send + Sync {
    fn package(
        &self,
        template: &Template,
        request: &PackageRequest,
    ) -> Result<PackageReference, SmithError>;
}

impl<T> TemplatePackager for Arc<T>
where
    T: TemplatePackager + ?Sized,
{
    fn package(
        &self,
        template: &Template,
        request: &PackageRequest,
    ) -> Result<PackageReference, SmithError> {
        (**self).package(template, request)
    }
}

/// Packager that derives the reference from a sha256 digest of the template
/// document. Identical templates always produce identical digests.
#[derive(Default)]
pub struct DigestPackager;

impl DigestPackager {
    pub fn new() -> Self {
        Self
    }
}

impl TemplatePackager for DigestPackager {
    fn package(
        &self,
        template: &Template,
        request: &PackageRequest,
    ) -> Result<PackageReference, SmithError> {
        for (label, value) in [
            ("registry", &request.registry),
            ("repository", &request.repository),
            ("tag", &request.tag),
        ] {
            if value.trim().is_empty() {
                return Err(SmithError::Package(format!("{label} must not be empty")));
            }
        }

        let document = serde_yaml::to_string(template)?;
        let mut hasher = Sha256::new();
        hasher.update(document.as_bytes());
        let digest = hex::encode(hasher.finalize());

        Ok(PackageReference {
            reference: format!(
                "{}/{}:{}@sha256:{}",
                request.registry.trim(),
                request.repository.trim(),
                request.tag.trim(),
                digest
            ),
            digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PackageRequest {
        PackageRequest {
            registry: "registry.example.com".into(),
            repository: "platform/edge-stack".into(),
            tag: "1.0.0".into(),
        }
    }

    #[test]
    fn reference_is_content_addressed_and_stable() {
        let template = Template::new("edge-stack");
        let packager = DigestPackager::new();

        let first = packager.package(&template, &request()).unwrap();
        let second = packager.package(&template, &request()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.digest.len(), 64);
        assert!(
            first
                .reference
                .starts_with("registry.example.com/platform/edge-stack:1.0.0@sha256:")
        );
    }

    #[test]
    fn different_templates_produce_different_digests() {
        let packager = DigestPackager::new();
        let a = packager.package(&Template::new("a"), &request()).unwrap();
        let b = packager.package(&Template::new("b"), &request()).unwrap();
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn blank_coordinates_are_rejected() {
        let packager = DigestPackager::new();
        let mut bad = request();
        bad.tag = "  ".into();
        let err = packager.package(&Template::new("x"), &bad).unwrap_err();
        assert!(matches!(err, SmithError::Package(_)));
    }
}
