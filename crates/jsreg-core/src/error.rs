//! Registry error types.

use crate::compiler::CompilerError;
use std::fmt;
use thiserror::Error;

/// Registry error codes.
pub mod codes {
    pub const INVALID_NAME: &str = "INVALID_NAME";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ARCHIVE_ERROR: &str = "ARCHIVE_ERROR";
    pub const UNSUPPORTED_TARGET: &str = "UNSUPPORTED_TARGET";
    pub const TRANSFORM_ERROR: &str = "TRANSFORM_ERROR";
    pub const LOCAL_ONLY: &str = "LOCAL_ONLY";
    pub const STORE_ERROR: &str = "STORE_ERROR";
}

/// What a [`RegistryError::NotFound`] failed to locate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    /// No published (public) record exists for the package.
    Package(String),
    /// The package exists but not at this version.
    Version { name: String, version: String },
    /// The archive is well-formed but has no entry at this path.
    Path(String),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package(name) => write!(f, "package '{name}'"),
            Self::Version { name, version } => write!(f, "version {version} of '{name}'"),
            Self::Path(path) => write!(f, "file '{path}'"),
        }
    }
}

/// Core error type for registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("package name contains invalid characters: {name:?}")]
    InvalidName { name: String },

    #[error("{0} not found")]
    NotFound(Missing),

    #[error("failed to read archive: {0}")]
    Archive(String),

    #[error("unsupported build target '{0}'")]
    UnsupportedTarget(String),

    #[error("transform failed: {0}")]
    Transform(#[from] CompilerError),

    #[error("'{name}' is a local package and cannot be imported as a dependency")]
    LocalOnly { name: String },

    #[error("store error: {0}")]
    Store(String),
}

impl RegistryError {
    /// Get the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => codes::INVALID_NAME,
            Self::NotFound(_) => codes::NOT_FOUND,
            Self::Archive(_) => codes::ARCHIVE_ERROR,
            Self::UnsupportedTarget(_) => codes::UNSUPPORTED_TARGET,
            Self::Transform(_) => codes::TRANSFORM_ERROR,
            Self::LocalOnly { .. } => codes::LOCAL_ONLY,
            Self::Store(_) => codes::STORE_ERROR,
        }
    }

    #[must_use]
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    #[must_use]
    pub fn package_not_found(name: impl Into<String>) -> Self {
        Self::NotFound(Missing::Package(name.into()))
    }

    #[must_use]
    pub fn version_not_found(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::NotFound(Missing::Version {
            name: name.into(),
            version: version.into(),
        })
    }

    #[must_use]
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::NotFound(Missing::Path(path.into()))
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this is a `NotFound` of any kind.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Store(format!("invalid JSON: {e}"))
    }
}
