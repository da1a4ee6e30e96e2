//! Source identity normalization.
//!
//! The registry and lockfile only ever see source keys as strings. Callers
//! convert whatever they hold (a URL, a configured name, nothing at all)
//! through [`SourceIdentity`] once, at the boundary.

/// Source key used when a declaration names no source.
pub const DEFAULT_SOURCE: &str = "default";

/// Anything that can name a package source.
pub trait SourceIdentity {
    /// The stable string identity of this source.
    fn identity(&self) -> String;
}

impl SourceIdentity for str {
    fn identity(&self) -> String {
        self.to_string()
    }
}

impl SourceIdentity for String {
    fn identity(&self) -> String {
        self.clone()
    }
}

impl SourceIdentity for url::Url {
    fn identity(&self) -> String {
        self.as_str().to_string()
    }
}

impl<T: SourceIdentity + ?Sized> SourceIdentity for &T {
    fn identity(&self) -> String {
        (**self).identity()
    }
}

impl<T: SourceIdentity> SourceIdentity for Option<T> {
    fn identity(&self) -> String {
        match self {
            Some(source) => source.identity(),
            None => DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Normalize a source to its registry key.
pub fn identity_of<S: SourceIdentity + ?Sized>(source: &S) -> String {
    source.identity()
}
