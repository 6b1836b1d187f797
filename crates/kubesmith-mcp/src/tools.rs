use std::collections::BTreeMap;
use std::path::PathBuf;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::schemars::JsonSchema;
use rmcp::{tool, tool_router};
use serde::{Deserialize, Serialize};

use kubesmith::{
    OutputFormat, PackageRequest, ResourceOrigin, SemVer, Template, TemplateDraft,
    TemplateResource,
};

use crate::error::{McpError, invalid_params, to_mcp_error};
use crate::server::KubesmithMcpServer;

pub(crate) fn build_tool_router() -> ToolRouter<KubesmithMcpServer> {
    KubesmithMcpServer::tool_router()
}

/// Compact template row returned by listing tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    #[schemars(description = "Stable template identifier.")]
    pub id: String,
    #[schemars(description = "Template name.")]
    pub name: String,
    #[schemars(description = "Template version (semver).")]
    pub version: String,
    #[schemars(description = "Number of resources in the template.")]
    pub resources: usize,
    #[schemars(description = "Deduplicated template tags.")]
    pub tags: Vec<String>,
}

impl TemplateSummary {
    fn from_template(template: &Template) -> Self {
        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            version: template.version.to_string(),
            resources: template.resources.len(),
            tags: template.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TemplateListResult {
    pub templates: Vec<TemplateSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchTemplatesArgs {
    #[schemars(description = "Fuzzy query matched against name, description, and tags.")]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateArgs {
    #[schemars(description = "Template name. Must not be empty.")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional human-readable description.")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Optional initial version (semver). Defaults to 0.1.0.")]
    pub version: Option<String>,
    #[serde(default)]
    #[schemars(description = "Tags to attach; duplicates are dropped.")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateIdArgs {
    #[schemars(description = "Template identifier.")]
    pub template_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocumentResult {
    pub id: String,
    #[schemars(description = "Full template document serialized as YAML.")]
    pub document: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTemplateResult {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddResourceArgs {
    pub template_id: String,
    #[schemars(description = "Resource kind, e.g. 'Deployment'.")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(
        description = "Explicit apiVersion. When omitted, the kind is resolved through the schema catalog."
    )]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "metadata.name for the resource. Defaults to the lowercased kind.")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddResourceResult {
    pub template_id: String,
    pub resource_id: String,
    pub kind: String,
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTemplateArgs {
    pub template_id: String,
    #[serde(default)]
    #[schemars(
        description = "Named context parameters; a key equal to a selected field name overrides that field's value."
    )]
    pub context: BTreeMap<String, serde_json::Value>,
    #[schemars(description = "Directory the generated files are written under.")]
    pub output_path: String,
    #[serde(default)]
    #[schemars(
        description = "Formats to generate ('manifest', 'chart', 'overlay'). Defaults to the template's configured formats."
    )]
    pub formats: Vec<String>,
}

/// Per-format outcome; failures are isolated so one format's error never
/// blocks the others.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormatOutcome {
    pub format: String,
    pub generated_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTemplateResult {
    pub template_id: String,
    pub results: Vec<FormatOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTemplateArgs {
    pub template_id: String,
    #[serde(default = "default_true")]
    #[schemars(
        description = "When true (default), stop at schema constraints; when false, additionally smoke-run every configured format through the generation engine."
    )]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTemplateResult {
    pub valid: bool,
    #[schemars(description = "Itemized validation findings; empty when valid.")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportTemplateArgs {
    pub template_id: String,
    #[schemars(description = "File path the template document is written to.")]
    pub export_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportTemplateResult {
    pub template_id: String,
    pub export_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportTemplateArgs {
    #[schemars(description = "File path or HTTPS URL of a template document.")]
    pub locator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageTemplateArgs {
    pub template_id: String,
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageTemplateResult {
    #[schemars(description = "Content-addressed OCI reference.")]
    pub reference: String,
    #[schemars(description = "sha256 digest of the template document.")]
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KindDescriptorPayload {
    pub kind: String,
    pub api_version: String,
    pub group: String,
    pub template_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KindListResult {
    pub kinds: Vec<KindDescriptorPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResourcesArgs {
    #[schemars(description = "Fuzzy query matched against kind and API group.")]
    pub query: String,
}

#[tool_router]
impl KubesmithMcpServer {
    #[tool(
        name = "list_templates",
        description = "List every template stored in the workspace."
    )]
    pub(crate) async fn list_templates(&self) -> Result<Json<TemplateListResult>, McpError> {
        let service = self.service.clone();
        let templates = run_blocking(move || service.get_all()).await?;
        Ok(Json(TemplateListResult {
            templates: templates.iter().map(TemplateSummary::from_template).collect(),
        }))
    }

    #[tool(
        name = "search_templates",
        description = "Fuzzy-search workspace templates by name, description, and tags."
    )]
    pub(crate) async fn search_templates(
        &self,
        Parameters(args): Parameters<SearchTemplatesArgs>,
    ) -> Result<Json<TemplateListResult>, McpError> {
        let service = self.service.clone();
        let templates = run_blocking(move || service.search(&args.query)).await?;
        Ok(Json(TemplateListResult {
            templates: templates.iter().map(TemplateSummary::from_template).collect(),
        }))
    }

    #[tool(
        name = "create_template",
        description = "Create a new template in the workspace."
    )]
    pub(crate) async fn create_template(
        &self,
        Parameters(args): Parameters<CreateTemplateArgs>,
    ) -> Result<Json<TemplateSummary>, McpError> {
        if args.name.trim().is_empty() {
            return Err(invalid_params("template name must not be empty"));
        }
        let mut draft = TemplateDraft::named(args.name.trim());
        draft.description = args.description;
        draft.tags = args.tags;
        if let Some(raw) = args.version {
            let version = SemVer::parse(&raw)
                .map_err(|err| invalid_params(format!("invalid version '{raw}': {err}")))?;
            draft.version = Some(version);
        }

        let service = self.service.clone();
        let template = run_blocking(move || service.create(draft)).await?;
        Ok(Json(TemplateSummary::from_template(&template)))
    }

    #[tool(
        name = "get_template",
        description = "Fetch a template's full document as YAML."
    )]
    pub(crate) async fn get_template(
        &self,
        Parameters(args): Parameters<TemplateIdArgs>,
    ) -> Result<Json<TemplateDocumentResult>, McpError> {
        let service = self.service.clone();
        let id = args.template_id.clone();
        let template = run_blocking(move || service.get(&id))
            .await?
            .ok_or_else(|| invalid_params(format!("template {} does not exist", args.template_id)))?;
        let document = serde_yaml::to_string(&template)
            .map_err(|err| to_mcp_error(kubesmith::SmithError::Serialization(err.to_string())))?;
        Ok(Json(TemplateDocumentResult {
            id: template.id,
            document,
        }))
    }

    #[tool(
        name = "delete_template",
        description = "Delete a template from the workspace."
    )]
    pub(crate) async fn delete_template(
        &self,
        Parameters(args): Parameters<TemplateIdArgs>,
    ) -> Result<Json<DeleteTemplateResult>, McpError> {
        let service = self.service.clone();
        let id = args.template_id.clone();
        run_blocking(move || service.delete(&id)).await?;
        Ok(Json(DeleteTemplateResult {
            id: args.template_id,
            deleted: true,
        }))
    }

    #[tool(
        name = "add_resource",
        description = "Add a resource to a template, resolving the apiVersion through the schema catalog when not given. Duplicate (kind, apiVersion) pairs are rejected."
    )]
    pub(crate) async fn add_resource(
        &self,
        Parameters(args): Parameters<AddResourceArgs>,
    ) -> Result<Json<AddResourceResult>, McpError> {
        let service = self.service.clone();
        run_blocking(move || {
            let mut template = service
                .get(&args.template_id)?
                .ok_or_else(|| kubesmith::SmithError::Store(format!(
                    "template {} does not exist",
                    args.template_id
                )))?;

            let mut resource = match &args.api_version {
                Some(api_version) => TemplateResource::new(args.kind.clone(), api_version.clone()),
                None => {
                    let descriptor = service
                        .available_kinds()?
                        .into_iter()
                        .find(|k| k.kind.eq_ignore_ascii_case(&args.kind))
                        .ok_or_else(|| {
                            kubesmith::SmithError::Catalog(format!(
                                "kind '{}' is not in the catalog; pass apiVersion",
                                args.kind
                            ))
                        })?;
                    let mut resource =
                        TemplateResource::new(descriptor.kind, descriptor.api_version);
                    resource.template_type = descriptor.template_type;
                    resource.source = ResourceOrigin::Catalog;
                    resource
                }
            };
            if let Some(name) = &args.name {
                resource.name = name.clone();
            }

            let result = AddResourceResult {
                template_id: template.id.clone(),
                resource_id: resource.id.clone(),
                kind: resource.kind.clone(),
                api_version: resource.api_version.clone(),
            };
            if !template.add_resource(resource) {
                return Err(kubesmith::SmithError::Template(format!(
                    "template {} already contains {} ({})",
                    result.template_id, result.kind, result.api_version
                )));
            }
            service.save(&template)?;
            Ok(result)
        })
        .await
        .map(Json)
    }

    #[tool(
        name = "generate_template",
        description = "Generate output artifacts for a template. Formats fan out concurrently over one snapshot; each format reports its own result."
    )]
    pub(crate) async fn generate_template(
        &self,
        Parameters(args): Parameters<GenerateTemplateArgs>,
    ) -> Result<Json<GenerateTemplateResult>, McpError> {
        let mut formats = Vec::new();
        for raw in &args.formats {
            let format = OutputFormat::parse(raw).ok_or_else(|| {
                invalid_params(format!(
                    "unknown format '{raw}' (expected manifest, chart, or overlay)"
                ))
            })?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }

        let service = self.service.clone();
        let template_id = args.template_id.clone();
        let results = run_blocking(move || {
            let template = service.get(&args.template_id)?.ok_or_else(|| {
                kubesmith::SmithError::Store(format!(
                    "template {} does not exist",
                    args.template_id
                ))
            })?;
            let formats = if formats.is_empty() {
                template.generation.output_formats.iter().copied().collect()
            } else {
                formats
            };
            let output = PathBuf::from(&args.output_path);
            let results =
                service.generate_all(&args.template_id, &args.context, &output, &formats)?;
            Ok(results
                .into_iter()
                .map(|(format, result)| match result {
                    Ok(artifact) => FormatOutcome {
                        format: format.as_str().to_string(),
                        generated_files: artifact.generated_files,
                        error: None,
                    },
                    Err(err) => FormatOutcome {
                        format: format.as_str().to_string(),
                        generated_files: Vec::new(),
                        error: Some(err.to_string()),
                    },
                })
                .collect())
        })
        .await?;

        Ok(Json(GenerateTemplateResult {
            template_id,
            results,
        }))
    }

    #[tool(
        name = "validate_template",
        description = "Dry-run a template against schema constraints, returning an itemized error list instead of failing."
    )]
    pub(crate) async fn validate_template(
        &self,
        Parameters(args): Parameters<ValidateTemplateArgs>,
    ) -> Result<Json<ValidateTemplateResult>, McpError> {
        let service = self.service.clone();
        let report =
            run_blocking(move || service.validate(&args.template_id, args.dry_run)).await?;
        Ok(Json(ValidateTemplateResult {
            valid: report.valid,
            errors: report.errors,
        }))
    }

    #[tool(
        name = "export_template",
        description = "Write a template document to a file path."
    )]
    pub(crate) async fn export_template(
        &self,
        Parameters(args): Parameters<ExportTemplateArgs>,
    ) -> Result<Json<ExportTemplateResult>, McpError> {
        let service = self.service.clone();
        let template_id = args.template_id.clone();
        let export_path = args.export_path.clone();
        run_blocking(move || {
            service.export(&args.template_id, &PathBuf::from(&args.export_path))
        })
        .await?;
        Ok(Json(ExportTemplateResult {
            template_id,
            export_path,
        }))
    }

    #[tool(
        name = "import_template",
        description = "Import a template document from a file path or HTTPS URL."
    )]
    pub(crate) async fn import_template(
        &self,
        Parameters(args): Parameters<ImportTemplateArgs>,
    ) -> Result<Json<TemplateSummary>, McpError> {
        let service = self.service.clone();
        let template = run_blocking(move || service.import(&args.locator)).await?;
        Ok(Json(TemplateSummary::from_template(&template)))
    }

    #[tool(
        name = "package_template",
        description = "Produce a content-addressed OCI package reference for a template. Pushing the artifact is the caller's job."
    )]
    pub(crate) async fn package_template(
        &self,
        Parameters(args): Parameters<PackageTemplateArgs>,
    ) -> Result<Json<PackageTemplateResult>, McpError> {
        let service = self.service.clone();
        let reference = run_blocking(move || {
            service.package(
                &args.template_id,
                &PackageRequest {
                    registry: args.registry,
                    repository: args.repository,
                    tag: args.tag,
                },
            )
        })
        .await?;
        Ok(Json(PackageTemplateResult {
            reference: reference.reference,
            digest: reference.digest,
        }))
    }

    #[tool(
        name = "list_kinds",
        description = "List every resource kind the schema catalog offers."
    )]
    pub(crate) async fn list_kinds(&self) -> Result<Json<KindListResult>, McpError> {
        let service = self.service.clone();
        let kinds = run_blocking(move || service.available_kinds()).await?;
        Ok(Json(KindListResult {
            kinds: kinds.into_iter().map(kind_payload).collect(),
        }))
    }

    #[tool(
        name = "search_resources",
        description = "Fuzzy-search the schema catalog by kind and API group, best matches first."
    )]
    pub(crate) async fn search_resources(
        &self,
        Parameters(args): Parameters<SearchResourcesArgs>,
    ) -> Result<Json<KindListResult>, McpError> {
        let service = self.service.clone();
        let kinds = run_blocking(move || service.search_resources(&args.query)).await?;
        Ok(Json(KindListResult {
            kinds: kinds.into_iter().map(kind_payload).collect(),
        }))
    }
}

fn kind_payload(descriptor: kubesmith::KindDescriptor) -> KindDescriptorPayload {
    KindDescriptorPayload {
        kind: descriptor.kind,
        api_version: descriptor.api_version,
        group: descriptor.group,
        template_type: descriptor.template_type,
    }
}

/// Runs a synchronous core call off the async executor, mapping both the
/// join failure and the core error onto MCP error data.
async fn run_blocking<T, F>(task: F) -> Result<T, McpError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, kubesmith::SmithError> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| McpError::internal_error(format!("worker task failed: {err}"), None))?;
    outcome.map_err(to_mcp_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubesmith::initialize_workspace;
    use rmcp::handler::server::wrapper::Parameters;

    fn server_fixture() -> (tempfile::TempDir, KubesmithMcpServer) {
        let temp = tempfile::tempdir().unwrap();
        initialize_workspace(temp.path()).unwrap();
        let server = KubesmithMcpServer::new_with_root(temp.path()).unwrap();
        (temp, server)
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let (_temp, server) = server_fixture();
        let created = server
            .create_template(Parameters(CreateTemplateArgs {
                name: "edge-stack".into(),
                description: Some("Edge tier".into()),
                version: None,
                tags: vec!["web".into(), "web".into()],
            }))
            .await
            .unwrap();
        assert_eq!(created.0.name, "edge-stack");
        assert_eq!(created.0.tags, ["web"]);

        let listed = server.list_templates().await.unwrap();
        assert_eq!(listed.0.templates.len(), 1);
    }

    #[tokio::test]
    async fn add_resource_resolves_api_version_from_catalog() {
        let (_temp, server) = server_fixture();
        let created = server
            .create_template(Parameters(CreateTemplateArgs {
                name: "web".into(),
                description: None,
                version: None,
                tags: Vec::new(),
            }))
            .await
            .unwrap();

        let added = server
            .add_resource(Parameters(AddResourceArgs {
                template_id: created.0.id.clone(),
                kind: "deployment".into(),
                api_version: None,
                name: None,
            }))
            .await
            .unwrap();
        assert_eq!(added.0.kind, "Deployment");
        assert_eq!(added.0.api_version, "apps/v1");

        // A second insert of the same key is rejected.
        let duplicate = server
            .add_resource(Parameters(AddResourceArgs {
                template_id: created.0.id.clone(),
                kind: "Deployment".into(),
                api_version: None,
                name: None,
            }))
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn generate_writes_requested_formats() {
        let (temp, server) = server_fixture();
        let created = server
            .create_template(Parameters(CreateTemplateArgs {
                name: "web".into(),
                description: None,
                version: None,
                tags: Vec::new(),
            }))
            .await
            .unwrap();
        server
            .add_resource(Parameters(AddResourceArgs {
                template_id: created.0.id.clone(),
                kind: "Service".into(),
                api_version: None,
                name: None,
            }))
            .await
            .unwrap();

        let output = temp.path().join("out");
        let result = server
            .generate_template(Parameters(GenerateTemplateArgs {
                template_id: created.0.id.clone(),
                context: BTreeMap::new(),
                output_path: output.display().to_string(),
                formats: vec!["manifest".into(), "chart".into()],
            }))
            .await
            .unwrap();

        assert_eq!(result.0.results.len(), 2);
        assert!(result.0.results.iter().all(|r| r.error.is_none()));
        assert!(output.join("manifest/manifests.yaml").is_file());
        assert!(output.join("chart/Chart.yaml").is_file());
    }

    #[tokio::test]
    async fn validate_returns_itemized_errors() {
        let (_temp, server) = server_fixture();
        let created = server
            .create_template(Parameters(CreateTemplateArgs {
                name: "exotic".into(),
                description: None,
                version: None,
                tags: Vec::new(),
            }))
            .await
            .unwrap();
        server
            .add_resource(Parameters(AddResourceArgs {
                template_id: created.0.id.clone(),
                kind: "FluxCapacitor".into(),
                api_version: Some("future/v1".into()),
                name: None,
            }))
            .await
            .unwrap();

        let report = server
            .validate_template(Parameters(ValidateTemplateArgs {
                template_id: created.0.id.clone(),
                dry_run: true,
            }))
            .await
            .unwrap();
        assert!(!report.0.valid);
        assert!(report.0.errors[0].contains("unknown kind"));
    }
}
