//! Bundle Namespace Core Library
//!
//! Namespace-scoped package declarations for a package manager: a
//! process-wide registry of `source -> namespace -> package` declarations,
//! a companion YAML lockfile that persists them alongside resolved versions,
//! and a validator that reconciles the two.

pub mod config;
pub mod declaration;
pub mod error;
pub mod lockfile;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod source;
pub mod spec_lookup;
pub mod validator;
pub mod version;

pub use error::{InvalidLockfile, Locator, NamespaceError, Result};
pub use registry::NamespaceRegistry;
pub use session::NamespaceSession;

/// Re-exports of commonly used types
pub mod prelude {
    // Registry
    pub use crate::registry::{NamespaceRegistry, RegistrySnapshot};
    pub use crate::source::{DEFAULT_SOURCE, SourceIdentity};

    // Lockfile
    pub use crate::lockfile::{
        DEFAULT_LOCKFILE_NAME, LockDocument, LockfileReader, LockfileWriter, PackageRecord,
        ParsedLockfile,
    };
    pub use crate::spec_lookup::{FnLookup, ResolvedSpec, SpecLookup};

    // Validation
    pub use crate::validator::{
        LockfileValidator, ReportLevel, ReportLine, ReportSink, TracingSink, ValidationOutcome,
    };
    pub use crate::version::VersionScheme;

    // Declarations and resolution
    pub use crate::declaration::{DeclarationManifest, DeclarationScope, NamespacedDependency};
    pub use crate::resolver::{AcceptAll, NamespaceConflict, NamespaceIndex, NamespaceResolver};

    // Configuration
    pub use crate::config::{ConfigOverlay, ConfigStore, NamespaceConfig};
    pub use crate::session::NamespaceSession;

    // Errors
    pub use crate::error::{InvalidLockfile, Locator, NamespaceError};
}
