//! Namespace declarations
//!
//! The manifest-processing side of the subsystem: block-scoped namespace
//! declarations that feed the registry, and a TOML manifest format for
//! tools that keep declarations outside the host manifest.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{NamespaceError, Result};
use crate::registry::NamespaceRegistry;
use crate::source::identity_of;

/// A declared dependency, possibly scoped to a namespace
/// Equality and hashing include the namespace, so `rails` and `myorg/rails`
/// are distinct dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedDependency {
    pub name: String,
    pub namespace: Option<String>,
    /// Normalized source key
    pub source: String,
}

impl NamespacedDependency {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            source: source.into(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespace.is_some()
    }
}

impl fmt::Display for NamespacedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Block-scoped declaration builder over a registry.
///
/// Namespaces nest; the innermost one applies. Only namespaced declarations
/// are registered.
pub struct DeclarationScope<'r> {
    registry: &'r NamespaceRegistry,
    namespaces: Vec<String>,
    source: Option<String>,
    declared: Vec<NamespacedDependency>,
}

impl<'r> DeclarationScope<'r> {
    pub fn new(registry: &'r NamespaceRegistry) -> Self {
        Self {
            registry,
            namespaces: Vec::new(),
            source: None,
            declared: Vec::new(),
        }
    }

    /// Set the default source for later declarations
    pub fn set_source(&mut self, source: Option<&str>) {
        self.source = source.map(str::to_string);
    }

    /// Run a block with a default source, restoring the previous one after
    pub fn with_source<T>(&mut self, source: &str, block: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.source.replace(source.to_string());
        let result = block(self);
        self.source = previous;
        result
    }

    /// Run a block inside one or more namespaces.
    ///
    /// Fails if no namespace identifier is given. The namespace stack is
    /// restored once the block returns.
    pub fn namespace<N, T>(
        &mut self,
        namespaces: &[N],
        block: impl FnOnce(&mut Self) -> T,
    ) -> Result<T>
    where
        N: AsRef<str>,
    {
        if namespaces.is_empty() {
            return Err(NamespaceError::Declaration(
                "namespace requires at least one namespace identifier".to_string(),
            ));
        }
        let depth = self.namespaces.len();
        self.namespaces
            .extend(namespaces.iter().map(|ns| ns.as_ref().to_string()));
        let result = block(self);
        self.namespaces.truncate(depth);
        Ok(result)
    }

    /// Innermost active namespace
    pub fn current_namespace(&self) -> Option<&str> {
        self.namespaces.last().map(String::as_str)
    }

    /// Declare a package in the current namespace and default source
    pub fn package(&mut self, name: &str) -> NamespacedDependency {
        let namespace = self.current_namespace().map(str::to_string);
        let source = self.source.clone();
        self.declare(name, namespace.as_deref(), source.as_deref())
    }

    /// Declare a package with an explicit namespace option
    pub fn package_in(&mut self, name: &str, namespace: &str) -> NamespacedDependency {
        let source = self.source.clone();
        self.declare(name, Some(namespace), source.as_deref())
    }

    /// Declare a package with explicit namespace and source options
    pub fn declare(
        &mut self,
        name: &str,
        namespace: Option<&str>,
        source: Option<&str>,
    ) -> NamespacedDependency {
        let source_key = identity_of(&source);
        let mut dependency = NamespacedDependency::new(name, source_key.as_str());
        if let Some(namespace) = namespace {
            self.registry.register(source_key.as_str(), namespace, name);
            dependency = dependency.with_namespace(namespace);
        }
        self.declared.push(dependency.clone());
        dependency
    }

    /// Everything declared so far, in declaration order
    pub fn declared(&self) -> &[NamespacedDependency] {
        &self.declared
    }

    pub fn into_declared(self) -> Vec<NamespacedDependency> {
        self.declared
    }
}

/// One `[[namespace]]` table of a declarations manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceDeclaration {
    /// Namespace identifier
    pub name: String,

    /// Source URL; the default source when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Packages declared in this namespace
    #[serde(default)]
    pub packages: Vec<String>,
}

/// TOML file of namespace declarations
///
/// ```toml
/// [[namespace]]
/// name = "myorg"
/// source = "https://gems.example.com"
/// packages = ["gem1", "gem2"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationManifest {
    #[serde(default, rename = "namespace")]
    pub namespaces: Vec<NamespaceDeclaration>,
}

impl DeclarationManifest {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("TOML parsing error: {}", e))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read declarations: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse declarations: {}", path.display()))
    }

    /// Register every declaration and return the declared dependencies
    pub fn apply(&self, registry: &NamespaceRegistry) -> Vec<NamespacedDependency> {
        let mut scope = DeclarationScope::new(registry);
        for declaration in &self.namespaces {
            scope.set_source(declaration.source.as_deref());
            for package in &declaration.packages {
                scope.package_in(package, &declaration.name);
            }
        }
        let declared = scope.into_declared();
        tracing::debug!(declared = declared.len(), "Applied namespace declarations");
        declared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DEFAULT_SOURCE;
    use std::collections::HashSet;

    #[test]
    fn test_dependency_display_and_equality() {
        let plain = NamespacedDependency::new("rails", "s");
        let scoped = NamespacedDependency::new("rails", "s").with_namespace("myorg");

        assert_eq!(plain.to_string(), "rails");
        assert_eq!(scoped.to_string(), "myorg/rails");
        assert_ne!(plain, scoped);

        let set: HashSet<_> = [plain.clone(), scoped.clone(), scoped].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_namespace_block_registers_packages() {
        let registry = NamespaceRegistry::new();
        let mut scope = DeclarationScope::new(&registry);
        scope.set_source(Some("https://rubygems.org"));

        scope
            .namespace(&["myorg"], |scope| {
                scope.package("gem1");
                scope.package("gem2");
            })
            .unwrap();
        let outside = scope.package("rails");

        assert_eq!(registry.packages("https://rubygems.org", "myorg"), vec!["gem1", "gem2"]);
        assert!(!outside.is_namespaced());
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_nested_namespaces_innermost_wins() {
        let registry = NamespaceRegistry::new();
        let mut scope = DeclarationScope::new(&registry);

        scope
            .namespace(&["outer"], |scope| {
                scope
                    .namespace(&["inner"], |scope| {
                        scope.package("deep");
                    })
                    .unwrap();
                scope.package("shallow");
            })
            .unwrap();

        assert!(registry.is_registered(DEFAULT_SOURCE, "inner", "deep"));
        assert!(registry.is_registered(DEFAULT_SOURCE, "outer", "shallow"));
        assert_eq!(scope.current_namespace(), None);
    }

    #[test]
    fn test_namespace_requires_identifier() {
        let registry = NamespaceRegistry::new();
        let mut scope = DeclarationScope::new(&registry);
        let empty: [&str; 0] = [];
        let err = scope.namespace(&empty, |_| ()).unwrap_err();
        assert!(matches!(err, NamespaceError::Declaration(_)));
    }

    #[test]
    fn test_package_option_overrides_block() {
        let registry = NamespaceRegistry::new();
        let mut scope = DeclarationScope::new(&registry);
        scope
            .namespace(&["block"], |scope| {
                scope.package_in("pkg", "option");
            })
            .unwrap();

        assert!(registry.is_registered(DEFAULT_SOURCE, "option", "pkg"));
        assert!(!registry.is_registered(DEFAULT_SOURCE, "block", "pkg"));
    }

    #[test]
    fn test_with_source_restores_previous() {
        let registry = NamespaceRegistry::new();
        let mut scope = DeclarationScope::new(&registry);
        scope.with_source("https://private.example", |scope| {
            scope.package_in("secret", "corp");
        });
        scope.package_in("public", "corp");

        assert!(registry.is_registered("https://private.example", "corp", "secret"));
        assert!(registry.is_registered(DEFAULT_SOURCE, "corp", "public"));
    }

    #[test]
    fn test_manifest_apply() {
        let manifest = DeclarationManifest::from_toml_str(
            r#"
[[namespace]]
name = "orgA"
source = "https://example.org"
packages = ["pkg1", "pkg2"]

[[namespace]]
name = "orgB"
packages = ["pkg3"]
"#,
        )
        .unwrap();

        let registry = NamespaceRegistry::new();
        let declared = manifest.apply(&registry);

        assert_eq!(declared.len(), 3);
        assert_eq!(registry.packages("https://example.org", "orgA"), vec!["pkg1", "pkg2"]);
        assert!(registry.is_registered(DEFAULT_SOURCE, "orgB", "pkg3"));
    }
}
