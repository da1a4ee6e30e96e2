//! Lockfile writer
//!
//! Turns the registry plus the resolution result into the persisted
//! document. The document is always replaced wholesale (tmp + rename).

use std::io::Write;
use std::path::{Path, PathBuf};

use super::types::{LockDocument, PackageRecord};
use crate::error::{NamespaceError, Result};
use crate::registry::{NamespaceRegistry, RegistrySnapshot};
use crate::spec_lookup::SpecLookup;

/// Writes the namespace lockfile at a fixed path
#[derive(Debug, Clone)]
pub struct LockfileWriter {
    path: PathBuf,
}

impl LockfileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A lockfile is only written when at least one namespace is in use.
    pub fn should_generate(registry: &NamespaceRegistry) -> bool {
        registry.count() > 0
    }

    /// Build the document for a registry snapshot.
    ///
    /// Packages the lookup cannot resolve have no version to record and are
    /// left out, as are namespaces and sources left empty by that.
    pub fn generate<L>(snapshot: &RegistrySnapshot, lookup: &L) -> LockDocument
    where
        L: SpecLookup + ?Sized,
    {
        let mut document = LockDocument::new();
        for (source, namespace, package) in snapshot.triples() {
            let Some(spec) = lookup.lookup(package) else {
                tracing::debug!(source, namespace, package, "No resolved spec; not locking");
                continue;
            };
            let mut record = PackageRecord::new(spec.version).with_dependencies(spec.dependencies);
            record.platform = spec.platform;
            document.insert(source, namespace, package, record);
        }
        document
    }

    /// Render a document as YAML
    pub fn render(document: &LockDocument) -> Result<String> {
        Ok(serde_yaml::to_string(document)?)
    }

    /// Generate and atomically write the lockfile.
    ///
    /// Returns `Ok(false)` without touching the filesystem when the registry
    /// is empty.
    pub fn write<L>(&self, registry: &NamespaceRegistry, lookup: &L) -> Result<bool>
    where
        L: SpecLookup + ?Sized,
    {
        if !Self::should_generate(registry) {
            return Ok(false);
        }
        let document = Self::generate(&registry.snapshot(), lookup);
        let content = Self::render(&document)?;
        self.write_atomic(content.as_bytes())?;
        tracing::debug!(
            path = %self.path.display(),
            packages = document.len(),
            "Wrote namespace lockfile"
        );
        Ok(true)
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| NamespaceError::io("create directory for", &dir, e))?;

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "namespace-lock".to_string());
        let tmp_path = dir.join(format!(".{}.{}.tmp", file_name, std::process::id()));

        let result = write_and_sync(&tmp_path, bytes)
            .and_then(|()| std::fs::rename(&tmp_path, &self.path));
        if let Err(err) = result {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(NamespaceError::io("write", &self.path, err));
        }
        Ok(())
    }
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
