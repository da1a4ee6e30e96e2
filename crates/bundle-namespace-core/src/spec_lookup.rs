//! Resolved specifications handed over by the resolution layer.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Outcome of resolution for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSpec {
    /// Package name
    pub name: String,

    /// Resolved version, recorded verbatim
    pub version: String,

    /// Platform tag (e.g. "ruby", "x86_64-linux")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Names of direct dependencies
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ResolvedSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            platform: None,
            dependencies: Vec::new(),
        }
    }

    /// Set the platform tag
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the direct dependency names
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-package lookup into the resolution result.
pub trait SpecLookup {
    /// Resolved specification for a package, if resolution produced one
    fn lookup(&self, package: &str) -> Option<ResolvedSpec>;
}

impl SpecLookup for [ResolvedSpec] {
    fn lookup(&self, package: &str) -> Option<ResolvedSpec> {
        self.iter().find(|spec| spec.name == package).cloned()
    }
}

impl SpecLookup for Vec<ResolvedSpec> {
    fn lookup(&self, package: &str) -> Option<ResolvedSpec> {
        self.as_slice().lookup(package)
    }
}

impl SpecLookup for HashMap<String, ResolvedSpec> {
    fn lookup(&self, package: &str) -> Option<ResolvedSpec> {
        self.get(package).cloned()
    }
}

impl SpecLookup for IndexMap<String, ResolvedSpec> {
    fn lookup(&self, package: &str) -> Option<ResolvedSpec> {
        self.get(package).cloned()
    }
}

impl<T: SpecLookup + ?Sized> SpecLookup for &T {
    fn lookup(&self, package: &str) -> Option<ResolvedSpec> {
        (**self).lookup(package)
    }
}

/// Adapter turning a closure into a [`SpecLookup`].
pub struct FnLookup<F>(pub F);

impl<F> SpecLookup for FnLookup<F>
where
    F: Fn(&str) -> Option<ResolvedSpec>,
{
    fn lookup(&self, package: &str) -> Option<ResolvedSpec> {
        (self.0)(package)
    }
}

/// Load a JSON array of resolved specifications.
pub fn load_resolved_specs(path: &Path) -> anyhow::Result<Vec<ResolvedSpec>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read resolved specs: {}", path.display()))?;
    let specs: Vec<ResolvedSpec> = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse resolved specs: {}", path.display()))?;
    Ok(specs)
}
