use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::adapter::{TemplateDraft, TemplateStore, search_templates};
use crate::error::SmithError;
use crate::generate::Artifact;
use crate::model::{Template, new_id};
use crate::workspace::WorkspacePaths;

/// Filesystem-backed template store: one YAML document per template under
/// `.kubesmith/templates/<id>.yaml`.
pub struct WorkspaceStore {
    workspace: WorkspacePaths,
}

impl WorkspaceStore {
    pub fn new(workspace: WorkspacePaths) -> Self {
        Self { workspace }
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.workspace.templates_dir().join(format!("{id}.yaml"))
    }

    /// Publishes a template document via a temp file + rename so readers
    /// never observe a partial write.
    fn write_document(&self, template: &Template) -> Result<(), SmithError> {
        let dir = self.workspace.templates_dir();
        fs::create_dir_all(&dir).map_err(|err| {
            SmithError::Store(format!(
                "failed to ensure template directory {}: {}",
                dir.display(),
                err
            ))
        })?;

        let path = self.document_path(&template.id);
        let tmp_path = path.with_extension("tmp");
        let body = serde_yaml::to_string(template)?;
        fs::write(&tmp_path, body).map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            SmithError::Store(format!(
                "failed to write temporary document {}: {}",
                tmp_path.display(),
                err
            ))
        })?;
        fs::rename(&tmp_path, &path).map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            SmithError::Store(format!(
                "failed to publish template document {}: {}",
                path.display(),
                err
            ))
        })
    }

    fn read_document(&self, path: &Path) -> Result<Template, SmithError> {
        let body = fs::read_to_string(path)?;
        serde_yaml::from_str(&body).map_err(|err| {
            SmithError::Store(format!(
                "invalid template document {}: {}",
                path.display(),
                err
            ))
        })
    }
}

impl TemplateStore for WorkspaceStore {
    fn create(&self, draft: TemplateDraft) -> Result<Template, SmithError> {
        let template = draft.into_template();
        self.write_document(&template)?;
        Ok(template)
    }

    fn save(&self, template: &Template) -> Result<(), SmithError> {
        self.write_document(template)
    }

    fn get(&self, id: &str) -> Result<Option<Template>, SmithError> {
        let path = self.document_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        self.read_document(&path).map(Some)
    }

    fn get_all(&self) -> Result<Vec<Template>, SmithError> {
        let dir = self.workspace.templates_dir();
        let mut templates = Vec::new();
        if !dir.is_dir() {
            return Ok(templates);
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
                continue;
            }
            match self.read_document(&path) {
                Ok(template) => templates.push(template),
                Err(err) => {
                    // Foreign files in the directory are skipped, not fatal.
                    tracing::debug!(path = %path.display(), error = %err, "skipping unreadable template document");
                }
            }
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(templates)
    }

    fn search(&self, query: &str) -> Result<Vec<Template>, SmithError> {
        Ok(search_templates(self.get_all()?, query))
    }

    fn delete(&self, id: &str) -> Result<(), SmithError> {
        let path = self.document_path(id);
        if !path.is_file() {
            return Err(SmithError::Store(format!("template {id} does not exist")));
        }
        fs::remove_file(&path)?;
        Ok(())
    }
}

/// Writes every file of a generated artifact under `output_dir`, returning
/// the paths written.
pub fn write_artifact(artifact: &Artifact, output_dir: &Path) -> Result<Vec<String>, SmithError> {
    let mut written = Vec::with_capacity(artifact.files.len());
    for file in &artifact.files {
        let target = output_dir.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.contents)?;
        written.push(target.display().to_string());
    }
    Ok(written)
}

/// Exports a template document to the given path.
pub fn export_template(
    store: &dyn TemplateStore,
    id: &str,
    export_path: &Path,
) -> Result<(), SmithError> {
    let template = store
        .get(id)?
        .ok_or_else(|| SmithError::Store(format!("template {id} does not exist")))?;
    if let Some(parent) = export_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(export_path, serde_yaml::to_string(&template)?)?;
    Ok(())
}

/// Imports a template document from a file path or an HTTPS URL and
/// registers it with the store. A template whose id is already taken is
/// re-registered under a fresh id.
pub fn import_template(
    store: &dyn TemplateStore,
    locator: &str,
) -> Result<Template, SmithError> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return Err(SmithError::Store(
            "import locator must not be empty".to_string(),
        ));
    }

    let body = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        let url = Url::parse(trimmed).map_err(|err| {
            SmithError::Store(format!("import locator {trimmed} is not a valid URL: {err}"))
        })?;
        fetch_document(&url)?
    } else {
        fs::read_to_string(trimmed)?
    };

    let mut template: Template = serde_yaml::from_str(&body)
        .map_err(|err| SmithError::Store(format!("invalid template document: {err}")))?;

    if store.get(&template.id)?.is_some() {
        template.id = new_id();
    }
    store.save(&template)?;
    Ok(template)
}

fn fetch_document(url: &Url) -> Result<String, SmithError> {
    match ureq::get(url.as_str()).call() {
        Ok(response) => {
            if response.status() >= 400 {
                return Err(SmithError::Store(format!(
                    "failed to download template {}; status {}",
                    url,
                    response.status()
                )));
            }
            response
                .into_string()
                .map_err(|err| SmithError::Store(err.to_string()))
        }
        Err(err) => Err(SmithError::Store(format!(
            "failed to download template {}: {}",
            url, err
        ))),
    }
}
