//! Namespace configuration
//!
//! Layers, lowest precedence first:
//! - built-in defaults
//! - global file: `<config_dir>/bundle-namespace/config.toml`
//! - project file: `<project_root>/.bundle/namespace.toml`
//! - host-tool settings (`namespace.strict_mode = "true"`, ...)
//! - environment (`BUNDLE_NAMESPACE__STRICT_MODE=true`, ...)

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::lockfile::DEFAULT_LOCKFILE_NAME;
use crate::version::VersionScheme;

const SETTINGS_PREFIX: &str = "namespace.";
const ENV_PREFIX: &str = "BUNDLE_NAMESPACE__";

/// Effective configuration of the namespace subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// Namespace conflicts are fatal instead of advisory
    pub strict_mode: bool,

    /// Surface advisory warnings to the user
    pub warn_on_missing: bool,

    /// Lockfile location; relative paths resolve against the project root
    pub lockfile_path: PathBuf,

    /// Grammar used to validate locked versions
    pub version_scheme: VersionScheme,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            warn_on_missing: true,
            lockfile_path: PathBuf::from(DEFAULT_LOCKFILE_NAME),
            version_scheme: VersionScheme::default(),
        }
    }
}

/// Partial configuration as written in a TOML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_mode: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_on_missing: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockfile_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_scheme: Option<VersionScheme>,
}

impl ConfigOverlay {
    /// Parse an overlay from TOML content
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("TOML parsing error: {}", e))
    }

    /// Load an overlay file; a missing file is an empty overlay
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl NamespaceConfig {
    /// Apply a file overlay on top of this configuration
    pub fn apply(&mut self, overlay: &ConfigOverlay) {
        if let Some(strict_mode) = overlay.strict_mode {
            self.strict_mode = strict_mode;
        }
        if let Some(warn_on_missing) = overlay.warn_on_missing {
            self.warn_on_missing = warn_on_missing;
        }
        if let Some(path) = &overlay.lockfile_path {
            self.lockfile_path = path.clone();
        }
        if let Some(scheme) = overlay.version_scheme {
            self.version_scheme = scheme;
        }
    }

    /// Apply host-tool settings given as string key/value pairs.
    ///
    /// Keys outside the `namespace.` prefix are ignored. Values that cannot
    /// be interpreted leave the current value in place.
    pub fn apply_settings<I, K, V>(&mut self, settings: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in settings {
            let Some(name) = key.as_ref().strip_prefix(SETTINGS_PREFIX) else {
                continue;
            };
            let value = value.as_ref();
            match name {
                "strict_mode" => apply_bool(&mut self.strict_mode, key.as_ref(), value),
                "warn_on_missing" => apply_bool(&mut self.warn_on_missing, key.as_ref(), value),
                "lockfile_path" if value.trim().is_empty() => {
                    tracing::warn!(key = key.as_ref(), "Empty lockfile path; keeping current");
                }
                "lockfile_path" => self.lockfile_path = PathBuf::from(value),
                "version_scheme" => match value.parse::<VersionScheme>() {
                    Ok(scheme) => self.version_scheme = scheme,
                    Err(err) => tracing::warn!(key = key.as_ref(), "{}", err),
                },
                _ => tracing::debug!(key = key.as_ref(), "Ignoring unknown namespace setting"),
            }
        }
    }

    /// Apply `BUNDLE_NAMESPACE__*` variables from an environment listing
    pub fn apply_env_vars<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let settings: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                let name = key.as_ref().strip_prefix(ENV_PREFIX)?;
                Some((
                    format!("{}{}", SETTINGS_PREFIX, name.to_lowercase()),
                    value.as_ref().to_string(),
                ))
            })
            .collect();
        self.apply_settings(settings);
    }

    /// Apply `BUNDLE_NAMESPACE__*` variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_os(std::env::vars_os());
    }

    /// Apply an OS environment listing. Entries that are not valid Unicode
    /// are skipped.
    pub fn apply_env_os<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (Ok(key), Err(_)) => {
                    tracing::debug!(
                        key = %key,
                        "Skipping environment variable with non-Unicode value"
                    );
                    None
                }
                (Err(key), _) => {
                    tracing::debug!(key = ?key, "Skipping non-Unicode environment variable");
                    None
                }
            })
            .collect();
        self.apply_env_vars(vars);
    }

    /// Lockfile location for a project
    pub fn lockfile_path_in(&self, project_root: &Path) -> PathBuf {
        if self.lockfile_path.is_absolute() {
            self.lockfile_path.clone()
        } else {
            project_root.join(&self.lockfile_path)
        }
    }
}

fn apply_bool(slot: &mut bool, key: &str, value: &str) {
    match value.trim() {
        "true" => *slot = true,
        "false" => *slot = false,
        other => tracing::warn!(key, value = other, "Expected 'true' or 'false'; keeping {}", slot),
    }
}

/// Loads the layered configuration for a project
#[derive(Debug, Clone)]
pub struct ConfigStore {
    global_path: Option<PathBuf>,
    project_root: PathBuf,
}

impl ConfigStore {
    /// Store using the user's config directory for the global layer
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        let global_dir = dirs::config_dir().map(|dir| dir.join("bundle-namespace"));
        Self::from_paths(global_dir, project_root)
    }

    pub fn from_paths(global_dir: Option<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            global_path: global_dir.map(|dir| dir.join("config.toml")),
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn global_path(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn project_path(&self) -> PathBuf {
        self.project_root.join(".bundle").join("namespace.toml")
    }

    /// Load defaults plus both file layers
    pub fn load_files(&self) -> anyhow::Result<NamespaceConfig> {
        let mut config = NamespaceConfig::default();
        if let Some(global) = &self.global_path {
            config.apply(&ConfigOverlay::load(global)?);
        }
        config.apply(&ConfigOverlay::load(&self.project_path())?);
        Ok(config)
    }

    /// Load every layer, including the process environment
    pub fn load(&self) -> anyhow::Result<NamespaceConfig> {
        self.load_with_settings(std::iter::empty::<(&str, &str)>())
    }

    /// Load every layer with host-tool settings between the files and the
    /// environment
    pub fn load_with_settings<I, K, V>(&self, settings: I) -> anyhow::Result<NamespaceConfig>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = self.load_files()?;
        config.apply_settings(settings);
        config.apply_env();
        Ok(config)
    }
}
