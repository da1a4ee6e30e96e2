//! Namespace session
//!
//! Ties the subsystem into a host tool's install lifecycle: seed the
//! registry from the lockfile before resolution, apply conflict policy,
//! write the lockfile after resolution. Lifecycle hooks never fail the host
//! operation; they log and carry on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{ConfigStore, NamespaceConfig};
use crate::declaration::{DeclarationManifest, DeclarationScope, NamespacedDependency};
use crate::error::Result;
use crate::lockfile::{LockfileReader, LockfileWriter};
use crate::registry::NamespaceRegistry;
use crate::resolver::{NamespaceConflict, NamespaceResolver};
use crate::spec_lookup::SpecLookup;
use crate::validator::{LockfileValidator, ReportSink, TracingSink, ValidationOutcome};

/// One host-tool run against a project
#[derive(Debug, Clone)]
pub struct NamespaceSession {
    config: NamespaceConfig,
    project_root: PathBuf,
    registry: Arc<NamespaceRegistry>,
}

impl NamespaceSession {
    /// Create a session with a fresh registry
    pub fn new(config: NamespaceConfig, project_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            project_root: project_root.into(),
            registry: Arc::new(NamespaceRegistry::new()),
        }
    }

    /// Create a session from every configuration layer of a store
    pub fn from_store(store: &ConfigStore) -> anyhow::Result<Self> {
        let config = store.load()?;
        Ok(Self::new(config, store.project_root()))
    }

    /// Share an existing registry instead of a fresh one
    pub fn with_registry(mut self, registry: Arc<NamespaceRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.config.lockfile_path_in(&self.project_root)
    }

    pub fn reader(&self) -> LockfileReader {
        LockfileReader::new(self.lockfile_path())
    }

    pub fn writer(&self) -> LockfileWriter {
        LockfileWriter::new(self.lockfile_path())
    }

    /// Declaration scope over this session's registry
    pub fn declare(&self) -> DeclarationScope<'_> {
        DeclarationScope::new(&self.registry)
    }

    /// Register every declaration of a manifest
    pub fn apply_manifest(&self, manifest: &DeclarationManifest) -> Vec<NamespacedDependency> {
        manifest.apply(&self.registry)
    }

    /// Resolver bound to this session's configuration
    pub fn resolver(&self) -> NamespaceResolver<'_> {
        NamespaceResolver::new(&self.config)
    }

    /// Seed the registry from the lockfile before resolution.
    ///
    /// Returns `true` when a lockfile was replayed. A missing or unreadable
    /// lockfile leaves the registry untouched.
    pub fn seed_from_lockfile(&self) -> bool {
        let reader = self.reader();
        if !reader.exists() {
            tracing::debug!(path = %reader.path().display(), "No namespace lockfile to seed from");
            return false;
        }

        let parsed = match reader.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("Ignoring namespace lockfile: {}", err);
                return false;
            }
        };
        let replayed = parsed.replay_into(&self.registry);
        tracing::debug!(replayed, path = %reader.path().display(), "Seeded namespace registry");

        if self.config.warn_on_missing {
            let outcome = self.validate_with(&reader);
            if !outcome.errors.is_empty() || !outcome.warnings.is_empty() {
                outcome.report(&mut TracingSink);
            }
        }
        true
    }

    /// Apply conflict policy to everything registered so far.
    ///
    /// Fails only in strict mode.
    pub fn check_conflicts(&self) -> Result<Vec<NamespaceConflict>> {
        let mut resolver = self.resolver();
        resolver.check_registry(&self.registry)?;
        Ok(resolver.conflicts().to_vec())
    }

    /// Write the lockfile after resolution.
    ///
    /// Returns `true` when a lockfile was written. Failures are logged and
    /// swallowed.
    pub fn write_lockfile<L>(&self, lookup: &L) -> bool
    where
        L: SpecLookup + ?Sized,
    {
        let writer = self.writer();
        match writer.write(&self.registry, lookup) {
            Ok(true) => {
                tracing::info!(path = %writer.path().display(), "Namespace lockfile written");
                true
            }
            Ok(false) => false,
            Err(err) => {
                tracing::warn!("Failed to write namespace lockfile: {}", err);
                false
            }
        }
    }

    /// Validate the lockfile against the registry
    pub fn validate(&self) -> ValidationOutcome {
        self.validate_with(&self.reader())
    }

    /// Validate and send the report to a sink
    pub fn validate_into(&self, sink: &mut dyn ReportSink) -> ValidationOutcome {
        let outcome = self.validate();
        outcome.report(sink);
        outcome
    }

    fn validate_with(&self, reader: &LockfileReader) -> ValidationOutcome {
        LockfileValidator::new(reader)
            .with_scheme(self.config.version_scheme)
            .validate(&self.registry)
    }
}
