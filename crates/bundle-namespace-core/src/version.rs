//! Version grammar checks for locked package records.
//!
//! The lockfile stores versions verbatim; this module only decides whether a
//! recorded string is a version under the host ecosystem's grammar.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version grammar of the host package ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionScheme {
    /// RubyGems-style versions (`1.2.3`, `2.0.0.rc1`, `1.0-java`)
    #[default]
    RubyGems,
    /// Semantic versions (`1.2.3`, `1.0.0-alpha.1+build`)
    Semver,
}

/// Why a version string was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("version is blank")]
    Blank,

    #[error("malformed version number '{0}'")]
    Malformed(String),
}

impl VersionScheme {
    /// Check a version string against this grammar.
    pub fn check(self, version: &str) -> Result<(), VersionError> {
        if version.trim().is_empty() {
            return Err(VersionError::Blank);
        }
        let valid = match self {
            VersionScheme::RubyGems => is_rubygems_version(version),
            VersionScheme::Semver => semver::Version::parse(version.trim()).is_ok(),
        };
        if valid {
            Ok(())
        } else {
            Err(VersionError::Malformed(version.to_string()))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VersionScheme::RubyGems => "rubygems",
            VersionScheme::Semver => "semver",
        }
    }
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rubygems" | "gem" => Ok(VersionScheme::RubyGems),
            "semver" => Ok(VersionScheme::Semver),
            other => Err(format!(
                "Unknown version scheme: {}. Use 'rubygems' or 'semver'",
                other
            )),
        }
    }
}

/// RubyGems grammar: `digits ("." alnum+)* ("-" [alnum-]+ ("." [alnum-]+)*)?`,
/// optionally surrounded by whitespace.
fn is_rubygems_version(input: &str) -> bool {
    let trimmed = input.trim();
    let (release, prerelease) = match trimmed.split_once('-') {
        Some((release, prerelease)) => (release, Some(prerelease)),
        None => (trimmed, None),
    };

    let mut segments = release.split('.');
    let leading_numeric = segments
        .next()
        .is_some_and(|first| !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit()));
    if !leading_numeric {
        return false;
    }
    let alphanumeric =
        |segment: &str| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphanumeric());
    if !segments.all(alphanumeric) {
        return false;
    }

    match prerelease {
        None => true,
        Some(rest) => rest.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        }),
    }
}
