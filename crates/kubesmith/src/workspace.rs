use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SmithError;

/// Canonical paths for a Kubesmith workspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkspacePaths {
    root: PathBuf,
    dot_kubesmith: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: PathBuf, dot_kubesmith: PathBuf) -> Self {
        Self {
            root,
            dot_kubesmith,
        }
    }

    /// Returns the workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `.kubesmith` folder for this workspace.
    pub fn dot_kubesmith(&self) -> &Path {
        &self.dot_kubesmith
    }

    /// Canonical template document directory (`{root}/.kubesmith/templates`).
    pub fn templates_dir(&self) -> PathBuf {
        self.dot_kubesmith.join("templates")
    }

    /// Default generation output directory (`{root}/generated`).
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("generated")
    }
}

/// Trait describing a reusable workspace locator.
pub trait WorkspaceLocator: Send + Sync {
    fn workspace(&self) -> Result<WorkspacePaths, SmithError>;
}

/// Filesystem-backed workspace locator with lightweight caching.
pub struct FilesystemWorkspaceLocator {
    start: PathBuf,
    cache: Mutex<Option<WorkspacePaths>>,
}

impl FilesystemWorkspaceLocator {
    pub fn new(start: impl Into<PathBuf>) -> Self {
        Self {
            start: start.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn from_current_dir() -> Result<Self, SmithError> {
        Ok(Self::new(env::current_dir()?))
    }

    fn refresh(&self) -> Result<WorkspacePaths, SmithError> {
        discover(&self.start)
    }
}

impl WorkspaceLocator for FilesystemWorkspaceLocator {
    fn workspace(&self) -> Result<WorkspacePaths, SmithError> {
        if let Some(paths) = self.cache.lock().unwrap().clone() {
            if paths.root().is_dir() && paths.dot_kubesmith().is_dir() {
                return Ok(paths);
            }
        }

        let discovered = self.refresh()?;
        *self.cache.lock().unwrap() = Some(discovered.clone());
        Ok(discovered)
    }
}

impl<T> WorkspaceLocator for std::sync::Arc<T>
where
    T: WorkspaceLocator + ?Sized,
{
    fn workspace(&self) -> Result<WorkspacePaths, SmithError> {
        (**self).workspace()
    }
}

/// Performs one-off workspace discovery from an arbitrary starting path.
pub fn discover(start: impl AsRef<Path>) -> Result<WorkspacePaths, SmithError> {
    let canonical_start = normalize_start(start.as_ref())?;

    for ancestor in canonical_start.ancestors() {
        let candidate = ancestor.join(".kubesmith");
        if candidate.is_dir() {
            return Ok(WorkspacePaths::new(ancestor.to_path_buf(), candidate));
        }
    }

    Err(SmithError::Workspace(format!(
        "no .kubesmith directory found from {}",
        canonical_start.display()
    )))
}

/// Creates the `.kubesmith` layout under `root`, returning the resulting
/// paths. Safe to call on an already-initialized workspace.
pub fn initialize(root: impl AsRef<Path>) -> Result<WorkspacePaths, SmithError> {
    let root = root.as_ref();
    let dot_kubesmith = root.join(".kubesmith");
    fs::create_dir_all(dot_kubesmith.join("templates"))?;
    Ok(WorkspacePaths::new(
        root.to_path_buf(),
        dot_kubesmith,
    ))
}

/// Returns the workspace-relative form of `path`, or `None` when it lies
/// outside the workspace.
pub fn workspace_relative_path(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|p| p.to_string_lossy().to_string())
}

fn normalize_start(start: &Path) -> Result<PathBuf, SmithError> {
    let mut cursor = start.to_path_buf();

    // Walk up until a real path exists to avoid failures for not-yet-created files.
    while !cursor.exists() {
        if !cursor.pop() {
            return Err(SmithError::Workspace(format!(
                "unable to find existing ancestor for {}",
                start.display()
            )));
        }
    }

    if cursor.is_file() {
        cursor = cursor.parent().map(Path::to_path_buf).ok_or_else(|| {
            SmithError::Workspace(format!(
                "file path {} has no parent directory",
                start.display()
            ))
        })?;
    }

    if !cursor.is_dir() {
        return Err(SmithError::Workspace(format!(
            "start path {} is not a directory",
            cursor.display()
        )));
    }

    Ok(fs::canonicalize(cursor)?)
}
