//! Namespace lockfile codec.
//!
//! The writer serializes registry state plus resolved specifications; the
//! reader validates and reconstructs it, and can replay it into a registry.

pub mod reader;
pub mod types;
pub mod writer;

pub use reader::{LockfileReader, ParsedLockfile, parse_str};
pub use types::{LockDocument, NamespaceTable, PackageRecord, PackageTable};
pub use writer::LockfileWriter;

/// Default lockfile name, relative to the project root
pub const DEFAULT_LOCKFILE_NAME: &str = "bundler-namespace-lock.yaml";
