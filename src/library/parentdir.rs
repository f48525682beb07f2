//! Lazy parent-directory import library generator.
//!
//! Ecosystem convention: a nested package may import from an ancestor
//! directory without that directory appearing on any explicit path list.
//! [`ImportLibs`] yields the regular priority-ordered libraries first and,
//! only when those are exhausted, probes the importing file's ancestor
//! directories (bounded depth) for a package matching the import's first
//! segment. Consumption is incremental: a first match short-circuits any
//! further directory probing. Each iterator is private to one request; no
//! iteration state is shared.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::dir::{DirLibrary, PACKAGE_INDEX};
use super::Library;

/// How many ancestor directories to probe before giving up.
const MAX_PARENT_DIRS: usize = 5;

/// Iterator over candidate libraries for one import lookup.
pub struct ImportLibs {
    libs: Vec<Arc<dyn Library>>,
    index: usize,
    /// Path of the importing file, if known.
    buf_path: Option<PathBuf>,
    /// First `/`-segment of the module being imported.
    import_name: String,
    probed_parents: bool,
}

/// Candidate libraries for importing `module` from the file at `buf_path`.
pub fn import_libs(
    libs: &[Arc<dyn Library>],
    buf_path: Option<&Path>,
    module: &str,
) -> ImportLibs {
    let import_name = module.split('/').next().unwrap_or(module).to_string();
    ImportLibs {
        libs: libs.to_vec(),
        index: 0,
        buf_path: buf_path.map(Path::to_path_buf),
        import_name,
        probed_parents: false,
    }
}

impl Iterator for ImportLibs {
    type Item = Arc<dyn Library>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.libs.len() {
            let lib = Arc::clone(&self.libs[self.index]);
            self.index += 1;
            return Some(lib);
        }
        if self.probed_parents || self.import_name.is_empty() {
            return None;
        }
        self.probed_parents = true;

        // No regular library matched: probe ancestors of the importing file
        // for a package directory carrying the first import segment.
        let mut lookup = self.buf_path.as_deref()?.parent()?.to_path_buf();
        for _ in 0..MAX_PARENT_DIRS {
            if lookup
                .join(&self.import_name)
                .join(PACKAGE_INDEX)
                .is_file()
            {
                tracing::debug!(
                    dir = %lookup.display(),
                    import = %self.import_name,
                    "adding parent-directory import library"
                );
                return Some(Arc::new(DirLibrary::new("parentdirlib", lookup)));
            }
            lookup = lookup.parent()?.to_path_buf();
        }
        None
    }
}
