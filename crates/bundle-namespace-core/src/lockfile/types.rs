//! Lockfile document types.
//!
//! The persisted shape is `source -> namespace -> package -> record`, with
//! every level kept in insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Packages of one namespace, keyed by package name
pub type PackageTable = IndexMap<String, PackageRecord>;

/// Namespaces of one source
pub type NamespaceTable = IndexMap<String, PackageTable>;

/// Locked metadata for one (source, namespace, package) triple
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Locked version. `None` only for records read back with an explicit
    /// null, which validation reports as missing.
    pub version: Option<String>,

    /// Direct dependency names, sorted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Platform tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl PackageRecord {
    /// Create a record with a version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            dependencies: Vec::new(),
            platform: None,
        }
    }

    /// Set the dependency names (stored sorted)
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dependencies: Vec<String> = dependencies.into_iter().map(Into::into).collect();
        dependencies.sort();
        self.dependencies = dependencies;
        self
    }

    /// Set the platform tag
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

/// Full lockfile document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockDocument {
    sources: IndexMap<String, NamespaceTable>,
}

impl LockDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the record of a triple
    pub fn insert(
        &mut self,
        source: impl Into<String>,
        namespace: impl Into<String>,
        package: impl Into<String>,
        record: PackageRecord,
    ) {
        self.sources
            .entry(source.into())
            .or_default()
            .entry(namespace.into())
            .or_default()
            .insert(package.into(), record);
    }

    /// Source keys in document order
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Namespaces of a source
    pub fn namespaces(&self, source: &str) -> Option<&NamespaceTable> {
        self.sources.get(source)
    }

    /// Packages of a namespace
    pub fn packages(&self, source: &str, namespace: &str) -> Option<&PackageTable> {
        self.namespaces(source)?.get(namespace)
    }

    /// Record of a single triple
    pub fn record(&self, source: &str, namespace: &str, package: &str) -> Option<&PackageRecord> {
        self.packages(source, namespace)?.get(package)
    }

    /// Every `(source, namespace, package, record)` entry in document order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str, &PackageRecord)> {
        self.sources.iter().flat_map(|(source, namespaces)| {
            namespaces.iter().flat_map(move |(namespace, packages)| {
                packages.iter().map(move |(package, record)| {
                    (source.as_str(), namespace.as_str(), package.as_str(), record)
                })
            })
        })
    }

    /// Number of package records
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    /// Check if the document holds no package records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dependencies_sorted() {
        let record = PackageRecord::new("1.0.0").with_dependencies(["rspec", "rails", "rack"]);
        assert_eq!(record.dependencies, vec!["rack", "rails", "rspec"]);
    }

    #[test]
    fn test_document_lookups() {
        let mut document = LockDocument::new();
        document.insert("s", "orgA", "pkg", PackageRecord::new("1.2.3"));

        assert_eq!(document.sources().collect::<Vec<_>>(), vec!["s"]);
        assert_eq!(
            document.record("s", "orgA", "pkg").and_then(|r| r.version.as_deref()),
            Some("1.2.3")
        );
        assert!(document.record("s", "orgB", "pkg").is_none());
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn test_record_omits_empty_optional_fields() {
        let yaml = serde_yaml::to_string(&PackageRecord::new("1.0.0")).unwrap();
        assert_eq!(yaml, "version: 1.0.0\n");
    }
}
