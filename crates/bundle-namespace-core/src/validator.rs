//! Consistency validator
//!
//! Reconciles the live registry with the persisted lockfile. Structural and
//! version defects are errors; drift between the two sides is advisory.

use serde::Serialize;

use crate::error::{InvalidLockfile, Locator};
use crate::lockfile::{LockfileReader, ParsedLockfile};
use crate::registry::NamespaceRegistry;
use crate::version::{VersionError, VersionScheme};

/// Result of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    /// Valid iff no errors were found. Warnings never affect validity.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Render the outcome: all errors, then all warnings, then a single
    /// acknowledgement when there was nothing to report.
    pub fn report(&self, sink: &mut dyn ReportSink) {
        if !self.errors.is_empty() {
            sink.error("Namespace lockfile validation errors:");
            for error in &self.errors {
                sink.error(&format!("  - {}", error));
            }
        }

        if !self.warnings.is_empty() {
            sink.warn("Namespace lockfile validation warnings:");
            for warning in &self.warnings {
                sink.warn(&format!("  - {}", warning));
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            sink.info("Namespace lockfile is valid");
        }
    }
}

/// Destination for validation reports
pub trait ReportSink {
    fn error(&mut self, message: &str);
    fn warn(&mut self, message: &str);
    fn info(&mut self, message: &str);
}

/// Severity of a reported line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Error,
    Warn,
    Info,
}

/// A single recorded report line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub level: ReportLevel,
    pub message: String,
}

impl ReportSink for Vec<ReportLine> {
    fn error(&mut self, message: &str) {
        self.push(ReportLine {
            level: ReportLevel::Error,
            message: message.to_string(),
        });
    }

    fn warn(&mut self, message: &str) {
        self.push(ReportLine {
            level: ReportLevel::Warn,
            message: message.to_string(),
        });
    }

    fn info(&mut self, message: &str) {
        self.push(ReportLine {
            level: ReportLevel::Info,
            message: message.to_string(),
        });
    }
}

/// Routes report lines to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn error(&mut self, message: &str) {
        tracing::error!("{}", message);
    }

    fn warn(&mut self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn info(&mut self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// Validates a lockfile against a registry
#[derive(Debug, Clone)]
pub struct LockfileValidator<'a> {
    reader: &'a LockfileReader,
    scheme: VersionScheme,
}

impl<'a> LockfileValidator<'a> {
    pub fn new(reader: &'a LockfileReader) -> Self {
        Self {
            reader,
            scheme: VersionScheme::default(),
        }
    }

    /// Use a different version grammar for the field-level checks
    pub fn with_scheme(mut self, scheme: VersionScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Run every reachable validation phase.
    pub fn validate(&self, registry: &NamespaceRegistry) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        if !self.reader.exists() {
            return outcome;
        }

        let parsed = match self.reader.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                outcome
                    .errors
                    .push(format!("Invalid lockfile structure: {}", err));
                return outcome;
            }
        };

        check_against_registry(&parsed, registry, &mut outcome);
        check_versions(&parsed, self.scheme, &mut outcome);
        outcome
    }

    /// Validate and report whether the error list is empty
    pub fn is_valid(&self, registry: &NamespaceRegistry) -> bool {
        self.validate(registry).is_valid()
    }
}

fn check_against_registry(
    parsed: &ParsedLockfile,
    registry: &NamespaceRegistry,
    outcome: &mut ValidationOutcome,
) {
    let snapshot = registry.snapshot();
    for (source, namespace, package) in snapshot.triples() {
        if parsed.record_of(source, namespace, package).is_none() {
            outcome.warnings.push(format!(
                "Package '{}' registered in namespace '{}' of {} but not locked",
                package, namespace, source
            ));
        }
    }

    for (source, namespace, package) in parsed.triples() {
        if !registry.is_registered(source, namespace, package) {
            outcome.warnings.push(format!(
                "Package '{}' locked in namespace '{}' of {} but not registered",
                package, namespace, source
            ));
        }
    }
}

fn check_versions(parsed: &ParsedLockfile, scheme: VersionScheme, outcome: &mut ValidationOutcome) {
    for (source, namespace, package, record) in parsed.document().entries() {
        let locator = Locator::package(source, namespace, package);
        let missing = InvalidLockfile::MissingField {
            locator: locator.clone(),
            field: "version",
        };

        let Some(version) = record.version.as_deref() else {
            outcome.errors.push(missing.to_string());
            continue;
        };

        match scheme.check(version) {
            Ok(()) => {}
            Err(VersionError::Blank) => outcome.errors.push(missing.to_string()),
            Err(err) => outcome.errors.push(
                InvalidLockfile::BadVersion {
                    locator,
                    version: version.to_string(),
                    reason: err.to_string(),
                }
                .to_string(),
            ),
        }
    }
}
