//! Scope references: navigable coordinates into one symbol tree.

use std::fmt;
use std::sync::Arc;

use super::Element;

/// A (blob, path) coordinate locating an element within one tree.
///
/// Resolving a scoperef walks the `names` maps from the blob root along
/// `path`; the path segments are declaration names.
#[derive(Clone, Debug)]
pub struct ScopeRef {
    /// The tree root. Always a scope element with blob ilk.
    pub blob: Arc<Element>,
    /// Lexical path from the blob root down to the referenced element.
    pub path: Vec<Arc<str>>,
}

impl ScopeRef {
    /// A scoperef addressing the blob root itself.
    pub fn root(blob: Arc<Element>) -> Self {
        debug_assert!(blob.is_blob(), "scoperef root must be a blob");
        ScopeRef {
            blob,
            path: Vec::new(),
        }
    }

    pub fn new(blob: Arc<Element>, path: Vec<Arc<str>>) -> Self {
        ScopeRef { blob, path }
    }

    /// The scoperef one level deeper, entering `name`.
    pub fn join(&self, name: impl Into<Arc<str>>) -> Self {
        let mut path = self.path.clone();
        path.push(name.into());
        ScopeRef {
            blob: Arc::clone(&self.blob),
            path,
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, [{}])", self.blob, self.path.join("."))
    }
}
