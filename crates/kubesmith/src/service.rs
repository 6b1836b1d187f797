use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::adapter::{TemplateDraft, TemplateStore};
use crate::catalog::{KindDescriptor, SchemaCatalog, StaticCatalog};
use crate::error::SmithError;
use crate::generate::{GenerationContext, GenerationEngine, Generator};
use crate::model::{OutputFormat, Template};
use crate::package::{DigestPackager, PackageReference, PackageRequest, TemplatePackager};
use crate::persistence::{WorkspaceStore, export_template, import_template, write_artifact};
use crate::validation::{ValidationReport, validate_template};
use crate::workspace::{FilesystemWorkspaceLocator, WorkspaceLocator, WorkspacePaths};

/// Files produced for one format of one generation call.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedArtifact {
    pub format: OutputFormat,
    pub generated_files: Vec<String>,
}

/// High-level façade bundling the template store, schema catalog,
/// generation engine, validator, and packager into one ergonomic entry
/// point. Every collaborator is constructor-injected; there are no module
/// globals.
pub struct TemplateService<S, C, P>
where
    S: TemplateStore,
    C: SchemaCatalog,
    P: TemplatePackager,
{
    store: S,
    catalog: C,
    engine: GenerationEngine,
    packager: P,
}

impl<S, C, P> TemplateService<S, C, P>
where
    S: TemplateStore,
    C: SchemaCatalog,
    P: TemplatePackager,
{
    pub fn new(store: S, catalog: C, packager: P) -> Self {
        Self {
            store,
            catalog,
            engine: GenerationEngine::new(),
            packager,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn engine(&self) -> &GenerationEngine {
        &self.engine
    }

    // ---- store boundary ----------------------------------------------------

    pub fn create(&self, draft: TemplateDraft) -> Result<Template, SmithError> {
        self.store.create(draft)
    }

    pub fn save(&self, template: &Template) -> Result<(), SmithError> {
        self.store.save(template)
    }

    pub fn get(&self, id: &str) -> Result<Option<Template>, SmithError> {
        self.store.get(id)
    }

    pub fn get_all(&self) -> Result<Vec<Template>, SmithError> {
        self.store.get_all()
    }

    pub fn search(&self, query: &str) -> Result<Vec<Template>, SmithError> {
        self.store.search(query)
    }

    pub fn delete(&self, id: &str) -> Result<(), SmithError> {
        self.store.delete(id)
    }

    pub fn export(&self, id: &str, export_path: &Path) -> Result<(), SmithError> {
        export_template(&self.store, id, export_path)
    }

    pub fn import(&self, locator: &str) -> Result<Template, SmithError> {
        import_template(&self.store, locator)
    }

    // ---- catalog boundary --------------------------------------------------

    pub fn available_kinds(&self) -> Result<Vec<KindDescriptor>, SmithError> {
        self.catalog.available_kinds()
    }

    pub fn search_resources(&self, query: &str) -> Result<Vec<KindDescriptor>, SmithError> {
        self.catalog.search_resources(query)
    }

    // ---- packaging ---------------------------------------------------------

    pub fn package(
        &self,
        id: &str,
        request: &PackageRequest,
    ) -> Result<PackageReference, SmithError> {
        let template = self.load(id)?;
        self.packager.package(&template, request)
    }

    // ---- validation --------------------------------------------------------

    /// Validates a stored template. With `dry_run` the pass stops at schema
    /// constraints; without it, every configured format is additionally run
    /// through the generation engine (output discarded) and render failures
    /// are folded into the report as `generation check` messages.
    pub fn validate(&self, id: &str, dry_run: bool) -> Result<ValidationReport, SmithError> {
        let template = self.load(id)?;
        self.validate_snapshot(&template, dry_run)
    }

    /// Validates an unsaved template snapshot.
    pub fn validate_snapshot(
        &self,
        template: &Template,
        dry_run: bool,
    ) -> Result<ValidationReport, SmithError> {
        let mut report = validate_template(template, &self.catalog)?;
        if dry_run {
            return Ok(report);
        }

        let formats: Vec<OutputFormat> =
            template.generation.output_formats.iter().copied().collect();
        let results = self
            .engine
            .generate_all(template, &GenerationContext::new(), &formats);
        for (format, result) in results {
            if let Err(err) = result {
                report.valid = false;
                report
                    .errors
                    .push(format!("generation check ({}): {}", format.as_str(), err));
            }
        }
        Ok(report)
    }

    // ---- generation --------------------------------------------------------

    /// Generates one format of a stored template into `output_path`.
    pub fn generate(
        &self,
        id: &str,
        context: &GenerationContext,
        output_path: &Path,
        format: OutputFormat,
    ) -> Result<GeneratedArtifact, SmithError> {
        let template = self.load(id)?;
        let artifact = self.engine.generate(&template, context, format)?;
        let generated_files = write_artifact(&artifact, output_path)?;
        Ok(GeneratedArtifact {
            format,
            generated_files,
        })
    }

    /// Generates every requested format into `<output_path>/<format>/`. The
    /// formats fan out concurrently over one template snapshot; each entry
    /// carries its own result so a failing format never blocks the rest.
    pub fn generate_all(
        &self,
        id: &str,
        context: &GenerationContext,
        output_path: &Path,
        formats: &[OutputFormat],
    ) -> Result<BTreeMap<OutputFormat, Result<GeneratedArtifact, SmithError>>, SmithError> {
        let template = self.load(id)?;
        let artifacts = self.engine.generate_all(&template, context, formats);

        let mut results = BTreeMap::new();
        for (format, result) in artifacts {
            let entry = result.and_then(|artifact| {
                let target = output_path.join(format.as_str());
                let generated_files = write_artifact(&artifact, &target)?;
                Ok(GeneratedArtifact {
                    format,
                    generated_files,
                })
            });
            results.insert(format, entry);
        }
        Ok(results)
    }

    fn load(&self, id: &str) -> Result<Template, SmithError> {
        self.store
            .get(id)?
            .ok_or_else(|| SmithError::Store(format!("template {id} does not exist")))
    }
}

pub type DefaultTemplateService = TemplateService<WorkspaceStore, StaticCatalog, DigestPackager>;

impl DefaultTemplateService {
    /// Wires the default stack against a discovered workspace.
    pub fn from_workspace(workspace: WorkspacePaths) -> Result<Self, SmithError> {
        Ok(Self::new(
            WorkspaceStore::new(workspace),
            StaticCatalog::builtin()?,
            DigestPackager::new(),
        ))
    }

    pub fn from_current_dir() -> Result<Self, SmithError> {
        let locator = FilesystemWorkspaceLocator::from_current_dir()?;
        Self::from_workspace(locator.workspace()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::InMemoryStore;
    use crate::model::{TemplateField, TemplateResource};
    use crate::schema::PropertyType;
    use serde_json::json;
    use tempfile::tempdir;

    fn service() -> TemplateService<InMemoryStore, StaticCatalog, DigestPackager> {
        TemplateService::new(
            InMemoryStore::new(),
            StaticCatalog::builtin().unwrap(),
            DigestPackager::new(),
        )
    }

    fn seeded(service: &TemplateService<InMemoryStore, StaticCatalog, DigestPackager>) -> Template {
        let mut draft = TemplateDraft::named("edge-stack");
        let mut deployment = TemplateResource::new("Deployment", "apps/v1");
        deployment.name = "web".into();
        deployment.selected_fields.push(TemplateField {
            name: "replicas".into(),
            field_type: PropertyType::Number,
            required: false,
            description: None,
            default: Some(json!(3)),
            allowed: Vec::new(),
        });
        draft.resources = vec![deployment];
        service.create(draft).unwrap()
    }

    #[test]
    fn generate_writes_files_and_reports_paths() {
        let service = service();
        let template = seeded(&service);
        let out = tempdir().unwrap();

        let artifact = service
            .generate(
                &template.id,
                &GenerationContext::new(),
                out.path(),
                OutputFormat::Manifest,
            )
            .unwrap();
        assert_eq!(artifact.generated_files.len(), 1);
        assert!(out.path().join("manifests.yaml").is_file());
    }

    #[test]
    fn generate_all_writes_one_directory_per_format() {
        let service = service();
        let template = seeded(&service);
        let out = tempdir().unwrap();

        let results = service
            .generate_all(
                &template.id,
                &GenerationContext::new(),
                out.path(),
                &OutputFormat::all(),
            )
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.values().all(|r| r.is_ok()));
        assert!(out.path().join("manifest/manifests.yaml").is_file());
        assert!(out.path().join("chart/Chart.yaml").is_file());
        assert!(out.path().join("overlay/base/kustomization.yaml").is_file());
    }

    #[test]
    fn validate_distinguishes_missing_template_from_invalid_template() {
        let service = service();
        let err = service.validate("missing", true).unwrap_err();
        assert!(matches!(err, SmithError::Store(_)));

        let mut draft = TemplateDraft::named("exotic");
        draft.resources = vec![TemplateResource::new("FluxCapacitor", "future/v1")];
        let template = service.create(draft).unwrap();
        let report = service.validate(&template.id, true).unwrap();
        assert!(!report.valid);
    }

    #[test]
    fn full_validation_runs_the_generation_smoke_check() {
        let service = service();
        let template = seeded(&service);
        let report = service.validate(&template.id, false).unwrap();
        assert!(report.valid, "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn package_produces_a_reference_for_stored_templates() {
        let service = service();
        let template = seeded(&service);
        let reference = service
            .package(
                &template.id,
                &PackageRequest {
                    registry: "registry.example.com".into(),
                    repository: "platform/edge".into(),
                    tag: "0.1.0".into(),
                },
            )
            .unwrap();
        assert!(reference.reference.contains("@sha256:"));
    }
}
