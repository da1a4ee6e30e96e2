//! Error types for the namespace registry and lockfile subsystem.
//!
//! Domain failures are typed so callers can decide policy (strict mode,
//! fail-closed seeding, reported validation) without string matching.

use std::fmt;
use std::path::PathBuf;

/// Convenience alias for results produced by this crate.
pub type Result<T, E = NamespaceError> = std::result::Result<T, E>;

/// Errors raised by the namespace subsystem
#[derive(Debug, thiserror::Error)]
pub enum NamespaceError {
    /// A package resolves to two or more namespaces under a single source
    #[error("Package '{package}' specified in multiple namespaces: {}", .namespaces.join(" and "))]
    Conflict {
        package: String,
        /// Every namespace that currently claims the package (at least two)
        namespaces: Vec<String>,
    },

    /// A source cannot honour namespaced declarations
    #[error(
        "Source '{source_id}' does not support namespaces. \
         Please use a namespace-aware package index or disable strict mode."
    )]
    NotSupported { source_id: String },

    /// Locked and resolved state disagree for a package
    #[error("Lockfile inconsistency for package '{package}': {details}")]
    Inconsistency { package: String, details: String },

    /// The persisted lockfile cannot be trusted
    #[error(transparent)]
    InvalidLockfile(#[from] InvalidLockfile),

    /// Reading or writing the lockfile failed
    #[error("Failed to {action} namespace lockfile {}: {error}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The lockfile document could not be rendered
    #[error("Failed to serialize namespace lockfile: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// A declaration block was used incorrectly
    #[error("Invalid namespace declaration: {0}")]
    Declaration(String),
}

impl NamespaceError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        error: std::io::Error,
    ) -> Self {
        Self::Io {
            action,
            path: path.into(),
            error,
        }
    }

    /// Check if this is a namespace conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Get the lockfile defect if this error wraps one.
    pub fn as_invalid_lockfile(&self) -> Option<&InvalidLockfile> {
        match self {
            Self::InvalidLockfile(invalid) => Some(invalid),
            _ => None,
        }
    }
}

/// Key path into a lockfile document, as precise as the defect allows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Locator {
    pub source: Option<String>,
    pub namespace: Option<String>,
    pub package: Option<String>,
}

impl Locator {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn namespace(source: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            namespace: Some(namespace.into()),
            package: None,
        }
    }

    pub fn package(
        source: impl Into<String>,
        namespace: impl Into<String>,
        package: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            namespace: Some(namespace.into()),
            package: Some(package.into()),
        }
    }

    /// The source/namespace part of the path, without the package.
    pub fn container(&self) -> String {
        Self {
            package: None,
            ..self.clone()
        }
        .to_string()
    }

    /// Check if this locator points at the document root.
    pub fn is_root(&self) -> bool {
        self.source.is_none()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments: Vec<&str> = [&self.source, &self.namespace, &self.package]
            .into_iter()
            .filter_map(|segment| segment.as_deref())
            .collect();
        if segments.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", segments.join("/"))
        }
    }
}

/// Defects that make a persisted lockfile untrustworthy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidLockfile {
    /// The document is not valid YAML
    #[error("YAML syntax error: {message}")]
    Syntax { message: String },

    /// The document does not have the source/namespace/package shape
    #[error("{message} (at {locator})")]
    Structure { locator: Locator, message: String },

    /// A package record lacks a required field
    #[error(
        "Package '{}' in {} missing {field}",
        .locator.package.as_deref().unwrap_or("?"),
        .locator.container()
    )]
    MissingField {
        locator: Locator,
        field: &'static str,
    },

    /// A package record carries a version outside the version grammar
    #[error(
        "Invalid version '{version}' for package '{}' in {}: {reason}",
        .locator.package.as_deref().unwrap_or("?"),
        .locator.container()
    )]
    BadVersion {
        locator: Locator,
        version: String,
        reason: String,
    },
}

impl InvalidLockfile {
    pub(crate) fn structure(locator: Locator, message: impl Into<String>) -> Self {
        Self::Structure {
            locator,
            message: message.into(),
        }
    }

    /// Locator of the defect, when one exists.
    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Self::Syntax { .. } => None,
            Self::Structure { locator, .. }
            | Self::MissingField { locator, .. }
            | Self::BadVersion { locator, .. } => Some(locator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_every_namespace() {
        let err = NamespaceError::Conflict {
            package: "pkg".to_string(),
            namespaces: vec!["org1".to_string(), "org2".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Package 'pkg' specified in multiple namespaces: org1 and org2"
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::root().to_string(), "<root>");
        assert_eq!(Locator::source("s").to_string(), "s");
        assert_eq!(Locator::package("s", "ns", "pkg").to_string(), "s/ns/pkg");
    }

    #[test]
    fn test_missing_field_message() {
        let err = InvalidLockfile::MissingField {
            locator: Locator::package("https://example.org", "orgA", "pkg"),
            field: "version",
        };
        assert_eq!(
            err.to_string(),
            "Package 'pkg' in https://example.org/orgA missing version"
        );
    }

    #[test]
    fn test_invalid_lockfile_converts() {
        let err: NamespaceError = InvalidLockfile::Syntax {
            message: "bad".to_string(),
        }
        .into();
        assert!(err.as_invalid_lockfile().is_some());
        assert_eq!(err.to_string(), "YAML syntax error: bad");
    }
}
