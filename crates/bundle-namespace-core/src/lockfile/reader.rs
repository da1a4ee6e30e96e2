//! Lockfile reader
//!
//! Parses the persisted document and checks its whole shape eagerly: a
//! [`ParsedLockfile`] is only ever handed out for a document that is
//! structurally sound end to end.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use super::types::{LockDocument, PackageRecord, PackageTable};
use crate::error::{InvalidLockfile, Locator, NamespaceError, Result};
use crate::registry::NamespaceRegistry;

/// Reads the namespace lockfile at a fixed path
#[derive(Debug, Clone)]
pub struct LockfileReader {
    path: PathBuf,
}

impl LockfileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the lockfile exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Parse the lockfile.
    ///
    /// A missing file parses as an empty document. Syntax and shape defects
    /// fail with [`NamespaceError::InvalidLockfile`] on the first violation.
    pub fn parse(&self) -> Result<ParsedLockfile> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ParsedLockfile::default());
            }
            Err(err) => return Err(NamespaceError::io("read", &self.path, err)),
        };
        Ok(parse_str(&content)?)
    }

    /// Parse the lockfile and replay it into a registry.
    ///
    /// Returns the number of triples replayed.
    pub fn populate(&self, registry: &NamespaceRegistry) -> Result<usize> {
        let parsed = self.parse()?;
        Ok(parsed.replay_into(registry))
    }
}

/// Parse lockfile content from a string
pub fn parse_str(content: &str) -> std::result::Result<ParsedLockfile, InvalidLockfile> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| InvalidLockfile::Syntax {
        message: e.to_string(),
    })?;
    let document = build_document(value)?;
    Ok(ParsedLockfile { document })
}

/// A structurally valid lockfile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLockfile {
    document: LockDocument,
}

impl ParsedLockfile {
    /// The underlying document
    pub fn document(&self) -> &LockDocument {
        &self.document
    }

    pub fn into_document(self) -> LockDocument {
        self.document
    }

    pub fn sources(&self) -> Vec<&str> {
        self.document.sources().collect()
    }

    pub fn namespaces_in(&self, source: &str) -> Vec<&str> {
        self.document
            .namespaces(source)
            .map(|namespaces| namespaces.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn packages_in(&self, source: &str, namespace: &str) -> Option<&PackageTable> {
        self.document.packages(source, namespace)
    }

    pub fn record_of(
        &self,
        source: &str,
        namespace: &str,
        package: &str,
    ) -> Option<&PackageRecord> {
        self.document.record(source, namespace, package)
    }

    pub fn version_of(&self, source: &str, namespace: &str, package: &str) -> Option<&str> {
        self.record_of(source, namespace, package)?
            .version
            .as_deref()
    }

    /// Every `(source, namespace, package)` triple in document order
    pub fn triples(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.document
            .entries()
            .map(|(source, namespace, package, _)| (source, namespace, package))
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    /// Register every locked triple. Idempotent through the registry's own
    /// de-duplication.
    pub fn replay_into(&self, registry: &NamespaceRegistry) -> usize {
        let mut replayed = 0;
        for (source, namespace, package) in self.triples() {
            registry.register(source, namespace, package);
            replayed += 1;
        }
        tracing::debug!(replayed, "Replayed namespace lockfile into registry");
        replayed
    }
}

fn build_document(value: Value) -> std::result::Result<LockDocument, InvalidLockfile> {
    let mut document = LockDocument::new();

    let sources = match value {
        Value::Null => return Ok(document),
        Value::Mapping(map) => map,
        _ => {
            return Err(InvalidLockfile::structure(
                Locator::root(),
                "Lockfile must be a mapping at the top level",
            ));
        }
    };

    let mut seen_sources = HashSet::new();
    for (source_key, namespaces) in sources {
        let source = key_string(&source_key, Locator::root(), "source")?;
        if !seen_sources.insert(source.clone()) {
            return Err(duplicate_key(Locator::root(), "source", &source));
        }
        let Value::Mapping(namespaces) = namespaces else {
            return Err(InvalidLockfile::structure(
                Locator::source(&source),
                format!("Namespaces for source '{}' must be a mapping", source),
            ));
        };

        let mut seen_namespaces = HashSet::new();
        for (namespace_key, packages) in namespaces {
            let namespace = key_string(&namespace_key, Locator::source(&source), "namespace")?;
            if !seen_namespaces.insert(namespace.clone()) {
                return Err(duplicate_key(Locator::source(&source), "namespace", &namespace));
            }
            let Value::Mapping(packages) = packages else {
                return Err(InvalidLockfile::structure(
                    Locator::namespace(&source, &namespace),
                    format!("Packages for namespace '{}' must be a mapping", namespace),
                ));
            };

            let mut seen_packages = HashSet::new();
            for (package_key, record) in packages {
                let package = key_string(
                    &package_key,
                    Locator::namespace(&source, &namespace),
                    "package",
                )?;
                if !seen_packages.insert(package.clone()) {
                    return Err(duplicate_key(
                        Locator::namespace(&source, &namespace),
                        "package",
                        &package,
                    ));
                }
                let locator = Locator::package(&source, &namespace, &package);
                let record = build_record(record, locator)?;
                document.insert(source.clone(), namespace.clone(), package, record);
            }
        }
    }

    Ok(document)
}

fn build_record(
    value: Value,
    locator: Locator,
) -> std::result::Result<PackageRecord, InvalidLockfile> {
    let Value::Mapping(fields) = value else {
        return Err(InvalidLockfile::structure(
            locator.clone(),
            format!(
                "Data for package '{}' must be a mapping",
                locator.package.as_deref().unwrap_or_default()
            ),
        ));
    };

    let Some(version) = fields.get("version") else {
        return Err(InvalidLockfile::MissingField {
            locator,
            field: "version",
        });
    };
    let version = match version {
        Value::Null => None,
        other => Some(scalar_string(other).ok_or_else(|| {
            InvalidLockfile::structure(locator.clone(), "Field 'version' must be a scalar")
        })?),
    };

    let dependencies = dependency_names(&fields, &locator)?;

    let platform = match fields.get("platform") {
        None | Some(Value::Null) => None,
        Some(other) => Some(scalar_string(other).ok_or_else(|| {
            InvalidLockfile::structure(locator.clone(), "Field 'platform' must be a scalar")
        })?),
    };

    Ok(PackageRecord {
        version,
        dependencies,
        platform,
    })
}

fn dependency_names(
    fields: &Mapping,
    locator: &Locator,
) -> std::result::Result<Vec<String>, InvalidLockfile> {
    match fields.get("dependencies") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                scalar_string(item).ok_or_else(|| {
                    InvalidLockfile::structure(
                        locator.clone(),
                        "Entries of 'dependencies' must be scalars",
                    )
                })
            })
            .collect(),
        Some(_) => Err(InvalidLockfile::structure(
            locator.clone(),
            "Field 'dependencies' must be a sequence",
        )),
    }
}

/// String form of a scalar. Numbers and booleans keep their YAML spelling.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn key_string(
    key: &Value,
    parent: Locator,
    level: &str,
) -> std::result::Result<String, InvalidLockfile> {
    scalar_string(key).ok_or_else(|| {
        InvalidLockfile::structure(parent, format!("Every {} key must be a scalar", level))
    })
}

/// Distinct YAML keys (`1` and `'1'`) that read back as the same string
fn duplicate_key(parent: Locator, level: &str, key: &str) -> InvalidLockfile {
    InvalidLockfile::structure(parent, format!("Duplicate {} key '{}'", level, key))
}
