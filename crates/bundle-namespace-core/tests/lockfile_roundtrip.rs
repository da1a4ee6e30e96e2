use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use tempfile::TempDir;

use bundle_namespace_core::lockfile::{LockfileReader, LockfileWriter, parse_str};
use bundle_namespace_core::spec_lookup::{FnLookup, ResolvedSpec};
use bundle_namespace_core::{InvalidLockfile, NamespaceError, NamespaceRegistry};

const SOURCES: [&str; 2] = ["https://rubygems.org", "default"];
const NAMESPACES: [&str; 3] = ["orgA", "orgB", "orgC"];
const PACKAGES: [&str; 5] = ["alpha", "beta", "gamma", "delta", "epsilon"];

type Triples = BTreeSet<(String, String, String)>;

fn triples_of(registry: &NamespaceRegistry) -> Triples {
    registry
        .snapshot()
        .triples()
        .map(|(s, n, p)| (s.to_string(), n.to_string(), p.to_string()))
        .collect()
}

/// Registry where each package sits in exactly one namespace per source
fn conflict_free_registry(calls: &[(usize, usize, usize)]) -> NamespaceRegistry {
    let registry = NamespaceRegistry::new();
    let mut owner: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for (s, n, p) in calls {
        let n = *owner.entry((*s, *p)).or_insert(*n);
        registry.register(SOURCES[*s], NAMESPACES[n], PACKAGES[*p]);
    }
    registry
}

proptest! {
    #[test]
    fn generate_parse_replay_keeps_resolved_triples(
        calls in prop::collection::vec((0..2usize, 0..3usize, 0..5usize), 0..30),
        resolved in prop::collection::vec(any::<bool>(), 5),
    ) {
        let registry = conflict_free_registry(&calls);
        let lookup = FnLookup(|name: &str| {
            let index = PACKAGES.iter().position(|p| *p == name)?;
            resolved[index].then(|| ResolvedSpec::new(name, "1.0.0"))
        });

        let document = LockfileWriter::generate(&registry.snapshot(), &lookup);
        let yaml = LockfileWriter::render(&document).unwrap();
        let parsed = parse_str(&yaml).unwrap();

        let replayed = NamespaceRegistry::new();
        parsed.replay_into(&replayed);

        let expected: Triples = triples_of(&registry)
            .into_iter()
            .filter(|(_, _, p)| {
                let index = PACKAGES.iter().position(|name| name == p).unwrap();
                resolved[index]
            })
            .collect();
        prop_assert_eq!(triples_of(&replayed), expected);
    }

    #[test]
    fn replay_is_idempotent(
        calls in prop::collection::vec((0..2usize, 0..3usize, 0..5usize), 0..30),
    ) {
        let registry = conflict_free_registry(&calls);
        let lookup = FnLookup(|name: &str| Some(ResolvedSpec::new(name, "2.0.0")));
        let document = LockfileWriter::generate(&registry.snapshot(), &lookup);
        let yaml = LockfileWriter::render(&document).unwrap();
        let parsed = parse_str(&yaml).unwrap();

        let once = NamespaceRegistry::new();
        parsed.replay_into(&once);
        let twice = NamespaceRegistry::new();
        parsed.replay_into(&twice);
        parsed.replay_into(&twice);

        prop_assert_eq!(triples_of(&once), triples_of(&twice));
        prop_assert_eq!(once.count(), twice.count());
    }
}

#[test]
fn top_level_sequence_fails_without_partial_data() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bundler-namespace-lock.yaml");
    std::fs::write(&path, "- s\n- orgA\n").unwrap();

    let err = LockfileReader::new(&path).parse().unwrap_err();
    assert!(matches!(
        err.as_invalid_lockfile(),
        Some(InvalidLockfile::Structure { .. })
    ));
}

#[test]
fn record_without_version_is_missing_field() {
    let err = parse_str("s:\n  orgA:\n    pkg:\n      platform: ruby\n").unwrap_err();
    match err {
        InvalidLockfile::MissingField { locator, field } => {
            assert_eq!(field, "version");
            assert_eq!(locator.package.as_deref(), Some("pkg"));
        }
        other => panic!("expected missing field, got {other:?}"),
    }
}

#[test]
fn missing_lockfile_parses_empty() {
    let temp = TempDir::new().unwrap();
    let reader = LockfileReader::new(temp.path().join("absent.yaml"));
    assert!(reader.parse().unwrap().is_empty());

    let registry = NamespaceRegistry::new();
    assert_eq!(reader.populate(&registry).unwrap(), 0);
    assert!(registry.is_empty());
}

#[test]
fn empty_registry_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bundler-namespace-lock.yaml");
    let registry = NamespaceRegistry::new();

    assert!(!LockfileWriter::should_generate(&registry));
    let lookup = FnLookup(|name: &str| Some(ResolvedSpec::new(name, "1.0.0")));
    assert!(!LockfileWriter::new(&path).write(&registry, &lookup).unwrap());
    assert!(!path.exists());
}

#[test]
fn written_file_reads_back() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/dir/bundler-namespace-lock.yaml");

    let registry = NamespaceRegistry::new();
    registry.register("https://rubygems.org", "myorg", "gem1");
    let specs = vec![
        ResolvedSpec::new("gem1", "1.2.3")
            .with_platform("x86_64-linux")
            .with_dependencies(["zeitwerk", "activesupport"]),
    ];
    assert!(LockfileWriter::new(&path).write(&registry, &specs).unwrap());

    let parsed = LockfileReader::new(&path).parse().unwrap();
    let record = parsed
        .record_of("https://rubygems.org", "myorg", "gem1")
        .unwrap();
    assert_eq!(record.version.as_deref(), Some("1.2.3"));
    assert_eq!(record.platform.as_deref(), Some("x86_64-linux"));
    assert_eq!(record.dependencies, vec!["activesupport", "zeitwerk"]);
}

#[test]
fn unreadable_lockfile_is_io_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("lock-dir");
    std::fs::create_dir(&path).unwrap();

    let err = LockfileReader::new(&path).parse().unwrap_err();
    assert!(matches!(err, NamespaceError::Io { .. }));
}
