use std::fmt;

use thiserror::Error;

/// High-level error type shared across Kubesmith components.
#[derive(Debug, Error)]
pub enum SmithError {
    #[error("template error: {0}")]
    Template(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("package error: {0}")]
    Package(String),
    #[error("workspace error: {0}")]
    Workspace(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SmithError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for SmithError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl SmithError {
    pub fn context<T: fmt::Display>(self, ctx: T) -> Self {
        match self {
            SmithError::Template(msg) => SmithError::Template(format!("{ctx}: {msg}")),
            SmithError::Schema(msg) => SmithError::Schema(format!("{ctx}: {msg}")),
            SmithError::Catalog(msg) => SmithError::Catalog(format!("{ctx}: {msg}")),
            SmithError::Store(msg) => SmithError::Store(format!("{ctx}: {msg}")),
            SmithError::Render(msg) => SmithError::Render(format!("{ctx}: {msg}")),
            SmithError::Package(msg) => SmithError::Package(format!("{ctx}: {msg}")),
            SmithError::Workspace(msg) => SmithError::Workspace(format!("{ctx}: {msg}")),
            SmithError::Serialization(msg) => SmithError::Serialization(format!("{ctx}: {msg}")),
            SmithError::Io(err) => SmithError::Io(err),
        }
    }
}

/// Failure parsing an edited resource document back into the field model.
///
/// Callers decide whether to surface, log, or ignore; the core never
/// swallows the failure on their behalf.
#[derive(Debug, Error)]
pub enum ResourceParseError {
    #[error("resource document is not valid YAML: {0}")]
    Syntax(String),
    #[error("resource document must be a mapping at the top level")]
    NotAMapping,
    #[error("resource document field '{0}' must be a string")]
    ScalarExpected(&'static str),
}
