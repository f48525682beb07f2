//! Directory-backed libraries.

use parking_lot::RwLock;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::base::Ilk;
use crate::tree::Element;

use super::{Library, LibraryError};

/// The file name serving a package directory's own blob.
pub const PACKAGE_INDEX: &str = "index.json";

/// A library serving serialized symbol trees from one or more directories.
///
/// Module `foo` is served from `<dir>/foo.json`, or `<dir>/foo/index.json`
/// when `foo` is a package directory; `/`-separated module paths descend
/// into subdirectories. Loaded blobs are cached per module name; misses are
/// cached too, so repeated failed probes do not re-scan the disk. The cache
/// is populated at most once per name under concurrent access (checked,
/// then inserted, under the write lock).
pub struct DirLibrary {
    name: String,
    dirs: Vec<PathBuf>,
    cache: RwLock<FxHashMap<String, Option<Arc<Element>>>>,
}

impl DirLibrary {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self::with_dirs(name, vec![dir.into()])
    }

    pub fn with_dirs(name: impl Into<String>, dirs: Vec<PathBuf>) -> Self {
        DirLibrary {
            name: name.into(),
            dirs,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// The root directories, in search order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Locate the file that would serve `module`, without loading it.
    fn locate(&self, module: &str) -> Option<PathBuf> {
        let rel: PathBuf = module.split('/').collect();
        for dir in &self.dirs {
            let file = dir.join(&rel).with_extension("json");
            if file.is_file() {
                return Some(file);
            }
            let index = dir.join(&rel).join(PACKAGE_INDEX);
            if index.is_file() {
                return Some(index);
            }
        }
        None
    }

    /// Eagerly parse every serialized tree under the root directories into
    /// the cache, in parallel.
    pub fn preload(&self) {
        let mut files = Vec::new();
        for dir in &self.dirs {
            collect_blob_files(dir, dir, &mut files);
        }
        let loaded: Vec<(String, Option<Arc<Element>>)> = files
            .par_iter()
            .map(|(module, path)| (module.clone(), load_blob_file(path).ok()))
            .collect();
        let mut cache = self.cache.write();
        for (module, blob) in loaded {
            cache.entry(module).or_insert(blob);
        }
    }
}

impl Library for DirLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_blob(&self, module: &str) -> bool {
        if let Some(entry) = self.cache.read().get(module) {
            return entry.is_some();
        }
        self.locate(module).is_some()
    }

    fn get_blob(&self, module: &str) -> Result<Arc<Element>, LibraryError> {
        if let Some(entry) = self.cache.read().get(module) {
            return entry
                .clone()
                .ok_or_else(|| LibraryError::NotFound(module.to_string()));
        }

        let mut cache = self.cache.write();
        // Another evaluation may have populated the entry while we waited
        // for the write lock.
        if let Some(entry) = cache.get(module) {
            return entry
                .clone()
                .ok_or_else(|| LibraryError::NotFound(module.to_string()));
        }

        let loaded = match self.locate(module) {
            Some(path) => Some(load_blob_file(&path)?),
            None => None,
        };
        cache.insert(module.to_string(), loaded.clone());
        loaded.ok_or_else(|| LibraryError::NotFound(module.to_string()))
    }

    fn get_blob_imports(&self, prefix: &str) -> Vec<(String, bool)> {
        let (parent, partial) = match prefix.rsplit_once('/') {
            Some((parent, partial)) => (parent, partial),
            None => ("", prefix),
        };
        let mut results = Vec::new();
        for dir in &self.dirs {
            let listing = if parent.is_empty() {
                dir.clone()
            } else {
                dir.join(parent.split('/').collect::<PathBuf>())
            };
            let Ok(entries) = std::fs::read_dir(&listing) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if !stem.starts_with(partial) {
                    continue;
                }
                let qualified = if parent.is_empty() {
                    stem.to_string()
                } else {
                    format!("{parent}/{stem}")
                };
                if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                    if stem != "index" && !results.contains(&(qualified.clone(), false)) {
                        results.push((qualified, false));
                    }
                } else if path.is_dir()
                    && path.join(PACKAGE_INDEX).is_file()
                    && !results.contains(&(qualified.clone(), true))
                {
                    results.push((qualified, true));
                }
            }
        }
        results
    }
}

/// Read and parse one serialized tree. A blob with no recorded source path
/// gets the file it was loaded from, so declarations remain locatable.
fn load_blob_file(path: &Path) -> Result<Arc<Element>, LibraryError> {
    let text = std::fs::read_to_string(path).map_err(|source| LibraryError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut elem: Element =
        serde_json::from_str(&text).map_err(|source| LibraryError::Malformed {
            path: path.display().to_string(),
            source,
        })?;
    match &mut elem {
        Element::Scope(scope) if scope.ilk == Ilk::Blob => {
            if scope.src.is_none() {
                scope.src = Some(path.display().to_string());
            }
        }
        _ => {
            return Err(LibraryError::Malformed {
                path: path.display().to_string(),
                source: serde::de::Error::custom("root element is not a blob"),
            });
        }
    }
    Ok(Arc::new(elem))
}

/// Recursively gather `(module, path)` pairs for every serialized tree.
fn collect_blob_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_blob_files(root, &path, out);
        } else if path.extension().is_some_and(|e| e == "json") {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let mut module = rel.with_extension("");
            if module.file_name().is_some_and(|f| f == "index") {
                module.pop();
            }
            let module = module
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !module.is_empty() {
                out.push((module, path));
            }
        }
    }
}
