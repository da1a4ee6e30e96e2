//! Namespace registry
//!
//! In-memory index of `source -> namespace -> package` declarations. The
//! registry never rejects a declaration; ambiguity is only detected when a
//! caller asks for "the" namespace of a package via
//! [`NamespaceRegistry::namespace_of`].

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use crate::error::{NamespaceError, Result};
use crate::source::SourceIdentity;

type PackageSet = IndexSet<String>;
type NamespaceTable = IndexMap<String, PackageSet>;
type SourceTable = IndexMap<String, NamespaceTable>;

/// Process-scoped store of namespace declarations.
///
/// Shared by reference (or `Arc`) between the declaration layer, the
/// lockfile reader/writer and the validator. All reads observe a consistent
/// view: `register` takes the write lock, every query holds the read lock
/// for its whole scan.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    sources: RwLock<SourceTable>,
}

impl NamespaceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package under a namespace of a source.
    ///
    /// Registering the same triple twice is a no-op; first-registration
    /// order is preserved at every level.
    pub fn register<S>(&self, source: &S, namespace: impl AsRef<str>, package: impl AsRef<str>)
    where
        S: SourceIdentity + ?Sized,
    {
        let source_key = source.identity();
        let namespace_key = namespace.as_ref().to_string();
        let package = package.as_ref();

        let mut sources = self.sources.write();
        let packages = sources
            .entry(source_key)
            .or_default()
            .entry(namespace_key)
            .or_default();
        if !packages.contains(package) {
            packages.insert(package.to_string());
        }
    }

    /// Packages registered for a source and namespace, in registration order
    pub fn packages<S>(&self, source: &S, namespace: impl AsRef<str>) -> Vec<String>
    where
        S: SourceIdentity + ?Sized,
    {
        let sources = self.sources.read();
        sources
            .get(&source.identity())
            .and_then(|namespaces| namespaces.get(namespace.as_ref()))
            .map(|packages| packages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Namespaces declared under a source, in registration order
    pub fn namespaces<S>(&self, source: &S) -> Vec<String>
    where
        S: SourceIdentity + ?Sized,
    {
        let sources = self.sources.read();
        sources
            .get(&source.identity())
            .map(|namespaces| namespaces.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Source keys known to the registry, in registration order
    pub fn sources(&self) -> Vec<String> {
        self.sources.read().keys().cloned().collect()
    }

    /// Check if a package is registered in a namespace of a source
    pub fn is_registered<S>(
        &self,
        source: &S,
        namespace: impl AsRef<str>,
        package: impl AsRef<str>,
    ) -> bool
    where
        S: SourceIdentity + ?Sized,
    {
        let sources = self.sources.read();
        sources
            .get(&source.identity())
            .and_then(|namespaces| namespaces.get(namespace.as_ref()))
            .is_some_and(|packages| packages.contains(package.as_ref()))
    }

    /// Resolve the single namespace a package belongs to under a source.
    ///
    /// Returns `Ok(None)` when no namespace claims the package and
    /// [`NamespaceError::Conflict`] when two or more do.
    pub fn namespace_of<S>(&self, source: &S, package: impl AsRef<str>) -> Result<Option<String>>
    where
        S: SourceIdentity + ?Sized,
    {
        let package = package.as_ref();
        let sources = self.sources.read();
        let Some(namespaces) = sources.get(&source.identity()) else {
            return Ok(None);
        };

        let mut found: Vec<String> = namespaces
            .iter()
            .filter(|(_, packages)| packages.contains(package))
            .map(|(namespace, _)| namespace.clone())
            .collect();

        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            _ => Err(NamespaceError::Conflict {
                package: package.to_string(),
                namespaces: found,
            }),
        }
    }

    /// Copy of the full index for serialization and validation
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            sources: self.sources.read().clone(),
        }
    }

    /// Total number of distinct (source, namespace, package) registrations
    pub fn count(&self) -> usize {
        self.sources
            .read()
            .values()
            .flat_map(|namespaces| namespaces.values())
            .map(|packages| packages.len())
            .sum()
    }

    /// Check if nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Drop every registration
    pub fn reset(&self) {
        self.sources.write().clear();
    }
}

/// Read-only copy of the registry index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    sources: SourceTable,
}

impl RegistrySnapshot {
    /// Source keys in registration order
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Namespaces and their packages under a source
    pub fn namespaces(&self, source: &str) -> impl Iterator<Item = (&str, &PackageSet)> {
        self.sources
            .get(source)
            .into_iter()
            .flat_map(|namespaces| namespaces.iter())
            .map(|(namespace, packages)| (namespace.as_str(), packages))
    }

    /// Every `(source, namespace, package)` triple in registration order
    pub fn triples(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.sources.iter().flat_map(|(source, namespaces)| {
            namespaces.iter().flat_map(move |(namespace, packages)| {
                packages
                    .iter()
                    .map(move |package| (source.as_str(), namespace.as_str(), package.as_str()))
            })
        })
    }

    pub fn count(&self) -> usize {
        self.triples().count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
