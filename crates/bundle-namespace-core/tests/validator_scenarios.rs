use pretty_assertions::assert_eq;
use tempfile::TempDir;

use bundle_namespace_core::lockfile::{LockfileReader, LockfileWriter};
use bundle_namespace_core::spec_lookup::ResolvedSpec;
use bundle_namespace_core::validator::{LockfileValidator, ReportLevel, ReportLine};
use bundle_namespace_core::NamespaceRegistry;

fn write_locked(temp: &TempDir) -> LockfileReader {
    let path = temp.path().join("bundler-namespace-lock.yaml");
    let registry = NamespaceRegistry::new();
    registry.register("s", "orgA", "pkg");
    LockfileWriter::new(&path)
        .write(&registry, &vec![ResolvedSpec::new("pkg", "1.2.3")])
        .unwrap();
    LockfileReader::new(path)
}

#[test]
fn matching_registry_is_clean() {
    let temp = TempDir::new().unwrap();
    let reader = write_locked(&temp);

    let registry = NamespaceRegistry::new();
    registry.register("s", "orgA", "pkg");
    let outcome = LockfileValidator::new(&reader).validate(&registry);

    assert!(outcome.errors.is_empty());
    assert!(outcome.warnings.is_empty());
}

#[test]
fn extra_registration_is_single_warning() {
    let temp = TempDir::new().unwrap();
    let reader = write_locked(&temp);

    let registry = NamespaceRegistry::new();
    registry.register("s", "orgA", "pkg");
    registry.register("s", "orgA", "other-pkg");
    let outcome = LockfileValidator::new(&reader).validate(&registry);

    assert!(outcome.is_valid());
    assert_eq!(
        outcome.warnings,
        vec!["Package 'other-pkg' registered in namespace 'orgA' of s but not locked".to_string()]
    );
}

#[test]
fn removed_declaration_is_warning() {
    let temp = TempDir::new().unwrap();
    let reader = write_locked(&temp);

    let outcome = LockfileValidator::new(&reader).validate(&NamespaceRegistry::new());

    assert!(outcome.is_valid());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("not registered"));
}

#[test]
fn syntax_error_is_single_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bundler-namespace-lock.yaml");
    std::fs::write(&path, "s:\n  orgA: [unclosed\n").unwrap();

    let registry = NamespaceRegistry::new();
    registry.register("s", "orgA", "pkg");
    let outcome = LockfileValidator::new(&LockfileReader::new(path)).validate(&registry);

    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.warnings.is_empty());
}

#[test]
fn report_lists_errors_before_warnings() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bundler-namespace-lock.yaml");
    std::fs::write(&path, "s:\n  orgA:\n    pkg:\n      version: not-a-version!\n").unwrap();

    let registry = NamespaceRegistry::new();
    registry.register("s", "orgA", "fresh");
    let outcome = LockfileValidator::new(&LockfileReader::new(path)).validate(&registry);

    let mut lines: Vec<ReportLine> = Vec::new();
    outcome.report(&mut lines);

    let messages: Vec<&str> = lines.iter().map(|line| line.message.as_str()).collect();
    assert_eq!(messages[0], "Namespace lockfile validation errors:");
    assert!(messages[1].starts_with("  - Invalid version 'not-a-version!'"));
    assert_eq!(messages[2], "Namespace lockfile validation warnings:");
    assert_eq!(lines.len(), 5);
    assert!(lines[2..].iter().all(|line| line.level == ReportLevel::Warn));
}
