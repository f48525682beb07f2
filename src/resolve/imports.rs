//! Import following.
//!
//! Resolves the leading tokens of an expression through the `Import`
//! children of a scope: wildcard imports, named/aliased imports with the
//! export-lookup fallback chain, multi-segment module paths, and relative
//! imports re-rooted at the importing file's directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::citdl::Token;
use crate::library::{DirLibrary, Library, import_blob_name, import_libs};
use crate::tree::{Element, ImportElem, ScopeRef};

use super::evaluator::Evaluator;
use super::{Hit, ResolveError};

impl Evaluator {
    /// Try to resolve the leading tokens through `elem`'s imports, in
    /// declaration order.
    ///
    /// Returns `(hit, tokens-consumed)` on the first import that answers;
    /// `None` when no import applies. Failures to load or look up one
    /// candidate move on to the next; only cancellation and contract
    /// violations escalate from here.
    pub(super) fn hit_from_elem_imports(
        &mut self,
        tokens: &[Token],
        elem: &Arc<Element>,
        defn_only: bool,
    ) -> Result<Option<(Hit, usize)>, ResolveError> {
        let first = match &tokens[0] {
            Token::Name(name) => name.as_str(),
            Token::Call(_) => return Ok(None),
        };
        let imports: Vec<ImportElem> = elem.imports().cloned().collect();
        if imports.is_empty() {
            return Ok(None);
        }

        // Longest partial prefix across multi-segment imports; consulted
        // only when no import matches outright.
        let mut partial: Option<(String, usize)> = None;

        for imp in &imports {
            self.check_aborted()?;

            if imp.is_wildcard() {
                // Members of the target module are directly accessible.
                let blob = match self.load_import_blob(&imp.module) {
                    Ok(blob) => blob,
                    Err(err) if err.is_recoverable() => continue,
                    Err(err) => return Err(err),
                };
                self.set_reldir_from_blob(&blob);
                let scoperef = ScopeRef::root(Arc::clone(&blob));
                match self.hit_from_getattr(tokens, blob, scoperef, defn_only) {
                    Ok(found) => return Ok(Some(found)),
                    Err(err) if err.is_recoverable() => continue,
                    Err(err) => return Err(err),
                }
            }

            // Relative prefixes play no part in name matching; loading
            // still sees the original module path.
            let plain_module = imp.module.trim_start_matches(['.', '/']);
            let alias_match = imp.alias.as_deref() == Some(first);
            let symbol_match =
                imp.alias.is_none() && imp.symbol.as_deref() == Some(first);
            let module_match =
                imp.alias.is_none() && !symbol_match && plain_module == first;

            if alias_match || symbol_match || module_match {
                let blob = match self.load_import_blob(&imp.module) {
                    Ok(blob) => blob,
                    Err(err) if err.is_recoverable() => continue,
                    Err(err) => return Err(err),
                };
                self.set_reldir_from_blob(&blob);
                // An import naming no symbol denotes the default export;
                // resolving that lands on the exported object or, failing
                // everything, the module object itself.
                let symbol = imp.symbol.as_deref().unwrap_or("default");
                match self.resolve_import_symbol(&blob, symbol, defn_only)? {
                    Some(hit) => return Ok(Some((hit, 1))),
                    None => continue,
                }
            }

            if imp.module.contains('/') && !imp.is_relative() {
                let segments: Vec<&str> = imp.module.split('/').collect();
                let shared = segments
                    .iter()
                    .zip(tokens)
                    .take_while(|(seg, tok)| {
                        !tok.is_call() && tok.as_str() == **seg
                    })
                    .count();
                if shared == segments.len() && shared > 0 {
                    // The token sequence names the sub-module exactly.
                    let blob = match self.load_import_blob(&imp.module) {
                        Ok(blob) => blob,
                        Err(err) if err.is_recoverable() => continue,
                        Err(err) => return Err(err),
                    };
                    self.set_reldir_from_blob(&blob);
                    return Ok(Some((
                        Hit::new(Arc::clone(&blob), ScopeRef::root(blob)),
                        shared,
                    )));
                }
                if shared > 0 && partial.as_ref().is_none_or(|(_, n)| shared > *n) {
                    partial = Some((segments[..shared].join("/"), shared));
                }
            }
        }

        if let Some((prefix_module, shared)) = partial {
            tracing::debug!(module = %prefix_module, "trying partial import prefix");
            match self.load_import_blob(&prefix_module) {
                Ok(blob) => {
                    self.set_reldir_from_blob(&blob);
                    return Ok(Some((
                        Hit::new(Arc::clone(&blob), ScopeRef::root(blob)),
                        shared,
                    )));
                }
                Err(err) if err.is_recoverable() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// Look up an exported symbol in a loaded module blob.
    ///
    /// Exported names live under a conventional `exports` container when
    /// the module has one, else at the blob's top level. `default` denotes
    /// the exported object itself; when the container instead carries a
    /// `default` variable, its deferred type is chased into the real
    /// exported object and the lookup retried there. A symbol nobody
    /// exports is finally chased through the module's own imports
    /// (re-exports). `None` means this import cannot answer for the
    /// symbol.
    pub(super) fn resolve_import_symbol(
        &mut self,
        blob: &Arc<Element>,
        symbol: &str,
        defn_only: bool,
    ) -> Result<Option<Hit>, ResolveError> {
        self.check_aborted()?;
        // Re-export and default chains between modules can be circular.
        self.bump_budget(&format!("{}#{symbol}", blob.name()))?;

        let mut exports = match blob.names().and_then(|names| names.get("exports")) {
            Some(container) => Arc::clone(container),
            None => Arc::clone(blob),
        };
        let mut scoperef = ScopeRef::root(Arc::clone(blob));
        loop {
            let direct = exports
                .names()
                .and_then(|names| names.get(symbol))
                .filter(|found| found.as_import().is_none());
            if let Some(found) = direct {
                let at = if exports.is_blob() {
                    scoperef
                } else {
                    scoperef.join(Arc::from(exports.name()))
                };
                return Ok(Some(Hit::new(Arc::clone(found), at)));
            }
            if symbol == "default" {
                // `default` denotes the exported object itself.
                return Ok(Some(Hit::new(exports, scoperef)));
            }
            let default = exports
                .names()
                .and_then(|names| names.get("default"))
                .filter(|found| found.as_import().is_none())
                .cloned();
            let Some(default) = default else { break };
            // The symbol may sit behind a `default` variable; chase its
            // deferred type into the real exported object and retry there.
            let mut hit = Hit::new(default, scoperef);
            while hit.elem.as_variable().is_some() {
                hit = self.hit_from_variable_type_inference(
                    &hit.elem.clone(),
                    &hit.scoperef.clone(),
                    defn_only,
                )?;
            }
            exports = hit.elem;
            scoperef = hit.scoperef;
        }

        // Re-exports: `export { x } from './y'` and wildcard re-exports.
        for imp in blob.imports().cloned().collect::<Vec<_>>() {
            let reexported = if imp.is_wildcard() {
                true
            } else {
                &*imp.local_name() == symbol
            };
            if !reexported {
                continue;
            }
            let target = match self.load_import_blob(&imp.module) {
                Ok(target) => target,
                Err(err) if err.is_recoverable() => continue,
                Err(err) => return Err(err),
            };
            self.set_reldir_from_blob(&target);
            let inner_symbol = match (&imp.symbol, imp.is_wildcard()) {
                (Some(sym), false) => sym.to_string(),
                _ => symbol.to_string(),
            };
            match self.resolve_import_symbol(&target, &inner_symbol, defn_only)? {
                Some(hit) => return Ok(Some(hit)),
                None => continue,
            }
        }

        Ok(None)
    }

    /// Load a module blob through the library chain, re-rooting relative
    /// module names at the current relative-import directory.
    pub(super) fn load_import_blob(
        &self,
        module: &str,
    ) -> Result<Arc<Element>, ResolveError> {
        if module.starts_with('.') {
            let (dir, name) = self.relative_base(module)?;
            tracing::debug!(module, dir = %dir.display(), "relative import");
            let reldir: Arc<dyn Library> = Arc::new(DirLibrary::new("reldirlib", dir));
            let blob = import_blob_name(&name, std::iter::once(reldir), self.abort.as_ref())?;
            return Ok(blob);
        }
        let candidates = import_libs(&self.libs, self.buf_path.as_deref(), module);
        let blob = import_blob_name(module, candidates, self.abort.as_ref())?;
        Ok(blob)
    }

    /// Point relative-import resolution at the directory of a blob just
    /// entered through an import.
    pub(super) fn set_reldir_from_blob(&mut self, blob: &Arc<Element>) {
        let dir = blob
            .as_scope()
            .and_then(|s| s.src.as_deref())
            .map(Path::new)
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        if dir.is_some() {
            self.reldir = dir;
        }
    }

    /// Split a relative module name into the directory to search and the
    /// remaining `/`-joined module path.
    fn relative_base(&self, module: &str) -> Result<(PathBuf, String), ResolveError> {
        let mut dir = self
            .reldir
            .clone()
            .or_else(|| {
                self.buf_path
                    .as_deref()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
            })
            .ok_or_else(|| {
                ResolveError::Unresolved(format!(
                    "relative import '{module}' with no source location"
                ))
            })?;

        let mut segments = module.split('/').peekable();
        while let Some(segment) = segments.peek() {
            match *segment {
                "" | "." => {
                    segments.next();
                }
                ".." => {
                    segments.next();
                    dir = dir.parent().map(Path::to_path_buf).ok_or_else(|| {
                        ResolveError::Unresolved(format!(
                            "relative import '{module}' escapes the filesystem root"
                        ))
                    })?;
                }
                _ => break,
            }
        }
        let name = segments.collect::<Vec<_>>().join("/");
        if name.is_empty() {
            return Err(ResolveError::Unresolved(format!(
                "relative import '{module}' names no module"
            )));
        }
        Ok((dir, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::BlobLibrary;
    use crate::tree::{BlobBuilder, ScopeBuilder, VarBuilder};

    fn libs_with(
        blobs: Vec<(&str, Arc<Element>)>,
    ) -> Vec<Arc<dyn Library>> {
        let lib = BlobLibrary::new("testlib");
        for (module, blob) in blobs {
            lib.add_blob(module, blob);
        }
        vec![Arc::new(lib)]
    }

    fn evaluator(libs: Vec<Arc<dyn Library>>) -> Evaluator {
        Evaluator::new(libs, BlobBuilder::new("*").build())
    }

    #[test]
    fn named_import_resolves_exported_symbol() {
        let bar = BlobBuilder::new("bar")
            .child(ScopeBuilder::class("Widget").build())
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("bar").with_symbol("Widget"))
            .build();
        let mut ev = evaluator(libs_with(vec![("bar", bar)]));

        let tokens = crate::citdl::tokenize("Widget");
        let (hit, n) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(hit.elem.name(), "Widget");
        assert_eq!(hit.scoperef.blob.name(), "bar");
    }

    #[test]
    fn aliased_default_import_falls_back_to_module_object() {
        // No `default` export in the target: the alias denotes the module.
        let bar = BlobBuilder::new("bar")
            .child(VarBuilder::new("bar").citdl("Number").build())
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("bar").with_symbol("default").with_alias("Bar"))
            .build();
        let mut ev = evaluator(libs_with(vec![("bar", bar)]));

        let tokens = crate::citdl::tokenize("Bar");
        let (hit, n) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(n, 1);
        assert!(hit.elem.is_blob());
        assert_eq!(hit.elem.name(), "bar");
    }

    #[test]
    fn default_import_lands_on_exports_container() {
        // `exports.x = ...` in the target: the default import denotes the
        // exports object, so members resolve through it.
        let bar = BlobBuilder::new("bar")
            .child(
                ScopeBuilder::object("exports")
                    .child(ScopeBuilder::function("x").build())
                    .build(),
            )
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("bar").with_symbol("default").with_alias("Bar"))
            .build();
        let mut ev = evaluator(libs_with(vec![("bar", bar)]));

        let hit = ev
            .eval_citdl("Bar.x", &ScopeRef::root(foo), false)
            .unwrap();
        assert_eq!(hit.elem.name(), "x");
        assert_eq!(hit.scoperef.blob.name(), "bar");
    }

    #[test]
    fn named_import_chases_default_variable() {
        // The exported symbol sits behind a `default` variable whose
        // deferred type names the real exported object.
        let bar = BlobBuilder::new("bar")
            .child(VarBuilder::new("default").citdl("impl").build())
            .child(
                ScopeBuilder::object("impl")
                    .child(ScopeBuilder::function("x").build())
                    .build(),
            )
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("bar").with_symbol("x"))
            .build();
        let mut ev = evaluator(libs_with(vec![("bar", bar)]));

        let tokens = crate::citdl::tokenize("x");
        let (hit, n) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(hit.elem.name(), "x");
        assert_eq!(hit.scoperef.blob.name(), "bar");
    }

    #[test]
    fn module_import_surfaces_exports_container() {
        let cfg = BlobBuilder::new("cfg")
            .child(
                ScopeBuilder::object("exports")
                    .child(ScopeBuilder::function("listen").build())
                    .build(),
            )
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("cfg"))
            .build();
        let mut ev = evaluator(libs_with(vec![("cfg", cfg)]));

        let tokens = crate::citdl::tokenize("cfg");
        let (hit, n) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(hit.elem.name(), "exports");

        let hit = ev
            .eval_citdl("cfg.listen", &ScopeRef::root(foo), false)
            .unwrap();
        assert_eq!(hit.elem.name(), "listen");
    }

    #[test]
    fn wildcard_import_exposes_members_directly() {
        let util = BlobBuilder::new("util")
            .child(ScopeBuilder::function("clamp").build())
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("util").with_symbol("*"))
            .build();
        let mut ev = evaluator(libs_with(vec![("util", util)]));

        let tokens = crate::citdl::tokenize("clamp");
        let (hit, n) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(hit.elem.name(), "clamp");
    }

    #[test]
    fn multi_segment_import_consumes_shared_prefix() {
        let sub = BlobBuilder::new("pkg/sub")
            .child(VarBuilder::new("value").citdl("Number").build())
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("pkg/sub"))
            .build();
        let mut ev = evaluator(libs_with(vec![("pkg/sub", sub)]));

        let tokens = crate::citdl::tokenize("pkg.sub.value");
        let (hit, n) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(hit.elem.name(), "pkg/sub");
    }

    #[test]
    fn partial_prefix_falls_back_to_longest_match() {
        let pkg = BlobBuilder::new("pkg").build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("pkg/sub/deep"))
            .build();
        let mut ev = evaluator(libs_with(vec![("pkg", pkg)]));

        // Only the first segment is shared with the expression.
        let tokens = crate::citdl::tokenize("pkg.other");
        let (hit, n) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(hit.elem.name(), "pkg");
    }

    #[test]
    fn reexported_symbol_is_chased_through_imports() {
        let inner = BlobBuilder::new("inner")
            .child(ScopeBuilder::class("Thing").build())
            .build();
        let outer = BlobBuilder::new("outer")
            .import(ImportElem::new("inner").with_symbol("Thing"))
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("outer").with_symbol("Thing"))
            .build();
        let mut ev = evaluator(libs_with(vec![("inner", inner), ("outer", outer)]));

        let tokens = crate::citdl::tokenize("Thing");
        let (hit, _) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(hit.elem.name(), "Thing");
        assert_eq!(hit.scoperef.blob.name(), "inner");
    }

    #[test]
    fn unknown_module_moves_to_next_import() {
        let real = BlobBuilder::new("real")
            .child(ScopeBuilder::function("f").build())
            .build();
        let foo = BlobBuilder::new("foo")
            .import(ImportElem::new("ghost").with_symbol("f"))
            .import(ImportElem::new("real").with_symbol("f"))
            .build();
        let mut ev = evaluator(libs_with(vec![("real", real)]));

        let tokens = crate::citdl::tokenize("f");
        let (hit, _) = ev
            .hit_from_elem_imports(&tokens, &foo, false)
            .unwrap()
            .unwrap();
        assert_eq!(hit.scoperef.blob.name(), "real");
    }
}
