//! Namespace-aware resolution hooks
//!
//! What the resolution layer calls into while filtering candidate versions:
//! conflict policy (strict vs. advisory), namespace-scoped filtering against
//! a package index, and locked-vs-resolved drift detection.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::config::NamespaceConfig;
use crate::declaration::NamespacedDependency;
use crate::error::{NamespaceError, Result};
use crate::lockfile::ParsedLockfile;
use crate::registry::NamespaceRegistry;
use crate::spec_lookup::SpecLookup;

/// Package index that knows which versions each namespace offers
pub trait NamespaceIndex {
    /// Whether this index can scope packages by namespace at all
    fn supports_namespaces(&self) -> bool {
        true
    }

    /// Whether `namespace` on `source` offers `package` at `version`
    fn offers(&self, source: &str, namespace: &str, package: &str, version: &str) -> bool;
}

/// Index that accepts every candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl NamespaceIndex for AcceptAll {
    fn offers(&self, _source: &str, _namespace: &str, _package: &str, _version: &str) -> bool {
        true
    }
}

/// A package claimed by more than one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceConflict {
    pub package: String,
    pub namespaces: Vec<String>,
}

/// Resolution-side namespace bookkeeping
#[derive(Debug)]
pub struct NamespaceResolver<'c> {
    config: &'c NamespaceConfig,
    tracked: IndexMap<String, String>,
    conflicts: Vec<NamespaceConflict>,
}

impl<'c> NamespaceResolver<'c> {
    pub fn new(config: &'c NamespaceConfig) -> Self {
        Self {
            config,
            tracked: IndexMap::new(),
            conflicts: Vec::new(),
        }
    }

    /// Record the namespace a package was requested from
    pub fn track(&mut self, package: impl Into<String>, namespace: impl Into<String>) {
        self.tracked.insert(package.into(), namespace.into());
    }

    /// Record namespace metadata carried by a declared dependency
    pub fn track_dependency(&mut self, dependency: &NamespacedDependency) {
        if let Some(namespace) = &dependency.namespace {
            self.track(dependency.name.clone(), namespace.clone());
        }
    }

    /// Namespace tracked for a package
    pub fn namespace_for(&self, package: &str) -> Option<&str> {
        self.tracked.get(package).map(String::as_str)
    }

    /// Apply conflict policy to a package requested from several namespaces.
    ///
    /// Fewer than two namespaces is not a conflict. Otherwise the conflict is
    /// recorded; strict mode turns it into an error.
    pub fn detect_conflict(&mut self, package: &str, namespaces: &[String]) -> Result<()> {
        if namespaces.len() < 2 {
            return Ok(());
        }

        self.conflicts.push(NamespaceConflict {
            package: package.to_string(),
            namespaces: namespaces.to_vec(),
        });

        if self.config.strict_mode {
            return Err(NamespaceError::Conflict {
                package: package.to_string(),
                namespaces: namespaces.to_vec(),
            });
        }
        if self.config.warn_on_missing {
            tracing::warn!(
                "Package '{}' requested from multiple namespaces: {}",
                package,
                namespaces.join(", ")
            );
        }
        Ok(())
    }

    /// Resolve every registered package's namespace and apply conflict
    /// policy. Unambiguous packages are tracked.
    pub fn check_registry(&mut self, registry: &NamespaceRegistry) -> Result<()> {
        for source in registry.sources() {
            let mut seen = IndexSet::new();
            for namespace in registry.namespaces(source.as_str()) {
                for package in registry.packages(source.as_str(), &namespace) {
                    if !seen.insert(package.clone()) {
                        continue;
                    }
                    match registry.namespace_of(source.as_str(), &package) {
                        Ok(Some(found)) => self.track(package, found),
                        Ok(None) => {}
                        Err(NamespaceError::Conflict {
                            package,
                            namespaces,
                        }) => self.detect_conflict(&package, &namespaces)?,
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(())
    }

    /// Keep the candidate versions the package's namespace offers.
    ///
    /// Packages without a tracked namespace pass through untouched. An index
    /// without namespace support fails in strict mode and is ignored
    /// otherwise.
    pub fn filter_versions<V, I>(
        &self,
        source: &str,
        package: &str,
        versions: I,
        index: &dyn NamespaceIndex,
    ) -> Result<Vec<V>>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let Some(namespace) = self.namespace_for(package) else {
            return Ok(versions.into_iter().collect());
        };

        if !index.supports_namespaces() {
            if self.config.strict_mode {
                return Err(NamespaceError::NotSupported {
                    source_id: source.to_string(),
                });
            }
            if self.config.warn_on_missing {
                tracing::warn!(
                    source,
                    namespace,
                    package,
                    "Source does not support namespaces; ignoring namespace"
                );
            }
            return Ok(versions.into_iter().collect());
        }

        Ok(versions
            .into_iter()
            .filter(|version| index.offers(source, namespace, package, version.as_ref()))
            .collect())
    }

    /// Conflicts recorded so far
    pub fn conflicts(&self) -> &[NamespaceConflict] {
        &self.conflicts
    }

    /// Compare locked versions with the resolution result.
    ///
    /// Returns one [`NamespaceError::Inconsistency`] per locked package whose
    /// resolved version differs; unresolved packages are not reported.
    pub fn check_locked<L>(&self, parsed: &ParsedLockfile, lookup: &L) -> Vec<NamespaceError>
    where
        L: SpecLookup + ?Sized,
    {
        parsed
            .document()
            .entries()
            .filter_map(|(source, namespace, package, record)| {
                let locked = record.version.as_deref()?;
                let resolved = lookup.lookup(package)?;
                (resolved.version != locked).then(|| NamespaceError::Inconsistency {
                    package: package.to_string(),
                    details: format!(
                        "locked at {} in {}/{} but resolved to {}",
                        locked, source, namespace, resolved.version
                    ),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::parse_str;
    use crate::spec_lookup::ResolvedSpec;

    struct OnlyStable;

    impl NamespaceIndex for OnlyStable {
        fn offers(&self, _source: &str, namespace: &str, _package: &str, version: &str) -> bool {
            namespace == "myorg" && !version.contains("pre")
        }
    }

    struct Legacy;

    impl NamespaceIndex for Legacy {
        fn supports_namespaces(&self) -> bool {
            false
        }

        fn offers(&self, _: &str, _: &str, _: &str, _: &str) -> bool {
            false
        }
    }

    fn conflicted_registry() -> NamespaceRegistry {
        let registry = NamespaceRegistry::new();
        registry.register("s", "org1", "pkg");
        registry.register("s", "org2", "pkg");
        registry.register("s", "org1", "solo");
        registry
    }

    #[test]
    fn test_single_namespace_is_not_a_conflict() {
        let config = NamespaceConfig::default();
        let mut resolver = NamespaceResolver::new(&config);
        resolver.detect_conflict("pkg", &["org1".to_string()]).unwrap();
        assert!(resolver.conflicts().is_empty());
    }

    #[test]
    fn test_conflict_is_advisory_by_default() {
        let config = NamespaceConfig::default();
        let mut resolver = NamespaceResolver::new(&config);
        resolver.check_registry(&conflicted_registry()).unwrap();

        assert_eq!(
            resolver.conflicts(),
            &[NamespaceConflict {
                package: "pkg".to_string(),
                namespaces: vec!["org1".to_string(), "org2".to_string()],
            }]
        );
        assert_eq!(resolver.namespace_for("solo"), Some("org1"));
        assert_eq!(resolver.namespace_for("pkg"), None);
    }

    #[test]
    fn test_conflict_is_fatal_in_strict_mode() {
        let config = NamespaceConfig {
            strict_mode: true,
            ..NamespaceConfig::default()
        };
        let mut resolver = NamespaceResolver::new(&config);
        let err = resolver.check_registry(&conflicted_registry()).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_filter_versions_by_namespace() {
        let config = NamespaceConfig::default();
        let mut resolver = NamespaceResolver::new(&config);
        resolver.track("gem1", "myorg");

        let kept = resolver
            .filter_versions("s", "gem1", ["1.0.0", "1.1.0.pre", "1.1.0"], &OnlyStable)
            .unwrap();
        assert_eq!(kept, vec!["1.0.0", "1.1.0"]);

        let untouched = resolver
            .filter_versions("s", "other", ["0.1.0.pre"], &OnlyStable)
            .unwrap();
        assert_eq!(untouched, vec!["0.1.0.pre"]);
    }

    #[test]
    fn test_accept_all_keeps_everything() {
        let config = NamespaceConfig::default();
        let mut resolver = NamespaceResolver::new(&config);
        resolver.track_dependency(&NamespacedDependency::new("gem1", "s").with_namespace("myorg"));

        let kept = resolver
            .filter_versions("s", "gem1", vec!["1.0.0".to_string()], &AcceptAll)
            .unwrap();
        assert_eq!(kept, vec!["1.0.0".to_string()]);
    }

    #[test]
    fn test_unsupported_source() {
        let lenient = NamespaceConfig::default();
        let mut resolver = NamespaceResolver::new(&lenient);
        resolver.track("gem1", "myorg");
        assert_eq!(
            resolver.filter_versions("s", "gem1", ["1.0.0"], &Legacy).unwrap(),
            vec!["1.0.0"]
        );

        let strict = NamespaceConfig {
            strict_mode: true,
            ..NamespaceConfig::default()
        };
        let mut resolver = NamespaceResolver::new(&strict);
        resolver.track("gem1", "myorg");
        let err = resolver
            .filter_versions("legacy-source", "gem1", ["1.0.0"], &Legacy)
            .unwrap_err();
        assert!(matches!(
            err,
            NamespaceError::NotSupported { ref source_id } if source_id == "legacy-source"
        ));
    }

    #[test]
    fn test_check_locked_reports_drift() {
        let parsed = parse_str(
            concat!(
                "s:\n  ns:\n",
                "    same:\n      version: 1.0.0\n",
                "    moved:\n      version: 1.0.0\n",
                "    gone:\n      version: 1.0.0\n",
            ),
        )
        .unwrap();
        let specs = vec![
            ResolvedSpec::new("same", "1.0.0"),
            ResolvedSpec::new("moved", "2.0.0"),
        ];

        let config = NamespaceConfig::default();
        let resolver = NamespaceResolver::new(&config);
        let issues = resolver.check_locked(&parsed, &specs);

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].to_string(),
            "Lockfile inconsistency for package 'moved': \
             locked at 1.0.0 in s/ns but resolved to 2.0.0"
        );
    }
}
