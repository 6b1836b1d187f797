pub mod adapter;
pub mod catalog;
pub mod editor;
pub mod error;
pub mod generate;
pub mod model;
pub mod package;
pub mod persistence;
pub mod schema;
pub mod service;
pub mod sync;
pub mod validation;
pub mod workspace;

pub use adapter::{InMemoryStore, TemplateDraft, TemplateStore};
pub use catalog::{KindDescriptor, SchemaCatalog, StaticCatalog};
pub use editor::{KeyValueEntry, PropertyEditor};
pub use error::{ResourceParseError, SmithError};
pub use generate::{
    Artifact, GeneratedFile, GenerationContext, GenerationEngine, Generator,
};
pub use model::{
    GenerationSettings, OutputFormat, ResourceOrigin, SemVer, Template, TemplateField,
    TemplateResource, new_id,
};
pub use package::{DigestPackager, PackageReference, PackageRequest, TemplatePackager};
pub use persistence::{WorkspaceStore, export_template, import_template, write_artifact};
pub use schema::{
    ObjectMode, PropertyMeta, PropertyType, SchemaProperty, StringFormat, coerce, default_for,
    infer_type,
};
pub use service::{DefaultTemplateService, GeneratedArtifact, TemplateService};
pub use sync::{ResourcePatch, resource_from_text, resource_to_text};
pub use validation::{ValidationReport, validate_resource, validate_template};
pub use workspace::{
    FilesystemWorkspaceLocator, WorkspaceLocator, WorkspacePaths, discover as discover_workspace,
    initialize as initialize_workspace, workspace_relative_path,
};
