//! Blob providers.
//!
//! A [`Library`] serves symbol-tree blobs by module name. Libraries are
//! consulted in priority order per evaluation (current-directory,
//! extra-paths, site, catalog, stdlib); the ordering is supplied by the
//! caller, never owned by the resolver. Once published, libraries are
//! shared read-only across concurrent evaluations; the only interior
//! mutability is the directory library's load cache.
//!
//! ## Key Types
//!
//! - [`Library`] — the provider interface
//! - [`BlobLibrary`] — in-memory map (catalogs, tests)
//! - [`DirLibrary`] — serialized trees (`<name>.json` / `<name>/index.json`)
//!   under one or more root directories
//! - [`ImportLibs`] — lazy per-request iterator adding the parent-directory
//!   fallback after the regular libraries

mod builtin;
mod dir;
mod parentdir;

pub use builtin::global_builtin_blob;
pub use dir::DirLibrary;
pub use parentdir::{ImportLibs, import_libs};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::base::Abort;
use crate::tree::Element;

/// Errors from blob providers.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// No library in the consulted set has the module.
    #[error("no blob for module '{0}'")]
    NotFound(String),

    /// A serialized tree could not be read.
    #[error("failed to read blob file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A serialized tree could not be parsed.
    #[error("malformed blob file {path}: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },

    /// The evaluation owning this lookup was cancelled.
    #[error("blob lookup aborted")]
    Aborted,
}

/// A named, searchable provider of blobs.
///
/// `name` identifies the provider's role in the priority list (`curdirlib`,
/// `reldirlib`, `parentdirlib`, `stdlib`, ...); the resolver uses it to
/// replace the relative-import library when imports cross directories.
pub trait Library: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap membership probe; `get_blob` may still fail afterwards (e.g.
    /// a malformed file).
    fn has_blob(&self, module: &str) -> bool;

    fn get_blob(&self, module: &str) -> Result<Arc<Element>, LibraryError>;

    /// Module names (and whether each is a package directory) completing
    /// the given `/`-separated import prefix.
    fn get_blob_imports(&self, prefix: &str) -> Vec<(String, bool)>;
}

/// An in-memory library: module name → blob.
///
/// Backs catalogs and tests; also the conventional home of the built-in
/// fallback blob under the module name `"*"`.
#[derive(Default)]
pub struct BlobLibrary {
    name: String,
    blobs: RwLock<FxHashMap<String, Arc<Element>>>,
}

impl BlobLibrary {
    pub fn new(name: impl Into<String>) -> Self {
        BlobLibrary {
            name: name.into(),
            blobs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a blob under a module name. Publishing happens before the
    /// library is shared with evaluations.
    pub fn add_blob(&self, module: impl Into<String>, blob: Arc<Element>) {
        debug_assert!(blob.is_blob());
        self.blobs.write().insert(module.into(), blob);
    }
}

impl Library for BlobLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_blob(&self, module: &str) -> bool {
        self.blobs.read().contains_key(module)
    }

    fn get_blob(&self, module: &str) -> Result<Arc<Element>, LibraryError> {
        self.blobs
            .read()
            .get(module)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(module.to_string()))
    }

    fn get_blob_imports(&self, prefix: &str) -> Vec<(String, bool)> {
        let blobs = self.blobs.read();
        blobs
            .keys()
            .filter(|name| name.starts_with(prefix))
            .map(|name| (name.clone(), false))
            .collect()
    }
}

/// Load a module's blob from the first library that has it.
///
/// Polls `abort` before each library so deep import chains unwind promptly
/// on cancellation. An all-miss is `NotFound` — recoverable; callers try
/// the next candidate import.
pub fn import_blob_name(
    module: &str,
    libs: impl IntoIterator<Item = Arc<dyn Library>>,
    abort: &dyn Abort,
) -> Result<Arc<Element>, LibraryError> {
    for lib in libs {
        if abort.is_aborted() {
            return Err(LibraryError::Aborted);
        }
        if lib.has_blob(module) {
            tracing::debug!(module, library = lib.name(), "import hit");
            return lib.get_blob(module);
        }
    }
    Err(LibraryError::NotFound(module.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::NeverAborted;
    use crate::tree::BlobBuilder;

    #[test]
    fn import_blob_name_respects_priority_order() {
        let first = BlobLibrary::new("curdirlib");
        let second = BlobLibrary::new("stdlib");
        first.add_blob("m", BlobBuilder::new("m-cur").build());
        second.add_blob("m", BlobBuilder::new("m-std").build());

        let libs: Vec<Arc<dyn Library>> = vec![Arc::new(first), Arc::new(second)];
        let blob = import_blob_name("m", libs, &NeverAborted).unwrap();
        assert_eq!(blob.name(), "m-cur");
    }

    #[test]
    fn import_blob_name_miss_is_not_found() {
        let libs: Vec<Arc<dyn Library>> = vec![Arc::new(BlobLibrary::new("stdlib"))];
        let err = import_blob_name("nope", libs, &NeverAborted).unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(_)));
    }
}
