//! The evaluator: core hit-resolution algorithm.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::base::{Abort, Flag, Ilk, NeverAborted};
use crate::citdl::{self, Token};
use crate::library::Library;
use crate::tree::{Element, ScopeRef};

use super::scope::{elem_at, parent_scoperef};
use super::{Hit, ResolveError};

/// Budget on evaluations of any single expression within one request.
/// Catches pathological fan-out that the cycle guard cannot (distinct
/// scopes re-evaluating the same expression without true recursion).
const MAX_EXPR_COUNT: u32 = 100;

/// Resolves CITDL expressions for one evaluation request.
///
/// Holds a private copy of the library priority list plus the directory
/// relative imports currently resolve against; the latter moves as
/// resolution crosses into other files' blobs and must never leak into
/// shared state. Trees, libraries and the built-in blob are read-only
/// throughout.
pub struct Evaluator {
    pub(super) libs: Vec<Arc<dyn Library>>,
    pub(super) buf_path: Option<PathBuf>,
    /// Directory relative imports resolve against; follows the blob most
    /// recently entered through an import.
    pub(super) reldir: Option<PathBuf>,
    pub(super) builtin: Arc<Element>,
    pub(super) abort: Arc<dyn Abort>,
    /// Scope-qualified expressions currently being resolved (cycle guard).
    in_progress: Vec<String>,
    /// Per-expression evaluation counts (budget sentinel).
    expr_counts: FxHashMap<String, u32>,
}

impl Evaluator {
    pub fn new(libs: Vec<Arc<dyn Library>>, builtin: Arc<Element>) -> Self {
        Evaluator {
            libs,
            buf_path: None,
            reldir: None,
            builtin,
            abort: Arc::new(NeverAborted),
            in_progress: Vec::new(),
            expr_counts: FxHashMap::default(),
        }
    }

    /// Set the path of the file being evaluated; enables relative imports
    /// and the parent-directory import fallback.
    pub fn with_buf_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.buf_path = Some(path.into());
        self
    }

    pub fn with_abort(mut self, abort: Arc<dyn Abort>) -> Self {
        self.abort = abort;
        self
    }

    pub fn buf_path(&self) -> Option<&Path> {
        self.buf_path.as_deref()
    }

    /// Resolve `expr` starting at `scoperef` down to a non-import,
    /// non-variable hit.
    ///
    /// With `defn_only` set, a variable that is a declaration in its own
    /// right (not flagged no-defn) terminates resolution, so "go to
    /// declaration" lands on the variable rather than its type.
    pub fn eval_citdl(
        &mut self,
        expr: &str,
        scoperef: &ScopeRef,
        defn_only: bool,
    ) -> Result<Hit, ResolveError> {
        self.hit_from_citdl(expr, scoperef, None, defn_only)
    }

    // ------------------------------------------------------------------
    // Core resolution
    // ------------------------------------------------------------------

    pub(super) fn hit_from_citdl(
        &mut self,
        expr: &str,
        scoperef: &ScopeRef,
        variable: Option<&Arc<Element>>,
        defn_only: bool,
    ) -> Result<Hit, ResolveError> {
        self.check_aborted()?;
        let guard_key = self.enter(expr, scoperef)?;

        let mut tokens = citdl::tokenize(expr);
        // A leading `.` tokenizes to an empty leading token; strip it.
        while tokens.first().is_some_and(|t| t.as_str().is_empty()) {
            tokens.remove(0);
        }
        let result = if tokens.is_empty() {
            Err(ResolveError::Unresolved(expr.to_string()))
        } else {
            self.hit_from_tokens(&tokens, expr, scoperef, variable, defn_only)
                .map(|(hit, _)| hit)
        };

        self.leave(&guard_key);
        result
    }

    pub(super) fn hit_from_tokens(
        &mut self,
        tokens: &[Token],
        expr: &str,
        scoperef: &ScopeRef,
        variable: Option<&Arc<Element>>,
        defn_only: bool,
    ) -> Result<(Hit, usize), ResolveError> {
        // Call arguments are resolved against the caller's scope, not
        // wherever the chain has wandered to by the time a call applies.
        let args_scoperef = scoperef.clone();

        let Some((mut hit, nconsumed)) =
            self.hit_from_first_part(tokens, scoperef, variable, defn_only)?
        else {
            return Err(ResolveError::Unresolved(format!(
                "first part of '{expr}'"
            )));
        };
        tracing::debug!(
            consumed = %citdl::join(&tokens[..nconsumed]),
            elem = %hit.elem,
            "resolved first part"
        );

        let mut remaining = &tokens[nconsumed..];
        while !remaining.is_empty() {
            tracing::trace!(
                rest = %citdl::join(remaining),
                on = %hit.elem,
                "resolving chain"
            );
            let consumed = if remaining[0].is_call() {
                hit = self.hit_from_call(
                    hit.elem,
                    hit.scoperef,
                    remaining[0].as_str(),
                    &args_scoperef,
                    defn_only,
                )?;
                1
            } else {
                let (new_hit, n) =
                    self.hit_from_getattr(remaining, hit.elem, hit.scoperef, defn_only)?;
                hit = new_hit;
                n
            };
            remaining = &remaining[consumed..];
        }

        // Peel variable deferred types down to a concrete element.
        while hit.elem.as_variable().is_some() && (!defn_only || hit.elem.has_flag(Flag::NoDefn)) {
            hit = self.hit_from_variable_type_inference(&hit.elem.clone(), &hit.scoperef.clone(), defn_only)?;
        }

        tracing::debug!(expr, elem = %hit.elem, scope = %hit.scoperef, "resolved");
        Ok((hit, tokens.len() - remaining.len()))
    }

    /// Find a hit for the leading tokens by walking lexical scopes.
    ///
    /// Returns `(hit, tokens-consumed)`, or `None` when no scope on the
    /// walk can account for the first token. Usually one token is
    /// consumed; multi-segment module imports can consume several.
    pub(super) fn hit_from_first_part(
        &mut self,
        tokens: &[Token],
        scoperef: &ScopeRef,
        variable: Option<&Arc<Element>>,
        defn_only: bool,
    ) -> Result<Option<(Hit, usize)>, ResolveError> {
        let first = match &tokens[0] {
            Token::Name(name) => name.as_str(),
            Token::Call(_) => return Ok(None),
        };
        tracing::trace!(first, start = %scoperef, "resolving first part");

        // Scanners occasionally emit a literal `__builtins__` expression.
        if first == "__builtins__" {
            let builtin = Arc::clone(&self.builtin);
            return Ok(Some((
                Hit::new(Arc::clone(&builtin), ScopeRef::root(builtin)),
                1,
            )));
        }

        if first == "require" {
            if let Some(found) = self.hit_from_require(tokens, variable, defn_only)? {
                return Ok(Some(found));
            }
        }

        let mut scoperef = scoperef.clone();
        let mut elem = elem_at(&scoperef)?;
        // Remembered for the no-parent fallback below.
        let residual = elem.citdl().cloned().map(|c| (c, scoperef.clone()));

        loop {
            if let Some(item) = elem.names().and_then(|names| names.get(first)) {
                // Import children also live in the names map; those are the
                // import resolver's business. A variable's own citdl must
                // not resolve through the variable itself.
                if item.as_import().is_none() && variable.is_none_or(|v| !Arc::ptr_eq(v, item)) {
                    return Ok(Some((Hit::new(Arc::clone(item), scoperef), 1)));
                }
            }

            if let Some(found) = self.hit_from_elem_imports(tokens, &elem, defn_only)? {
                return Ok(Some(found));
            }

            if elem.is_blob() && elem.name() == first {
                // The blob itself is the thing we wanted.
                return Ok(Some((Hit::new(Arc::clone(&elem), scoperef), 1)));
            }

            match parent_scoperef(&scoperef, &self.builtin)? {
                Some(parent) => {
                    scoperef = parent;
                    elem = elem_at(&scoperef)?;
                }
                None => {
                    // No parent remains. A scope carrying its own deferred
                    // type gets one indirection through it ("this file
                    // re-exports this deferred type") before giving up.
                    if let Some((citdl, citdl_scoperef)) = residual {
                        match self.hit_from_type_inference(&citdl, &citdl_scoperef, defn_only) {
                            Ok(subhit) => {
                                if let Some(found) = self.hit_from_first_part(
                                    tokens,
                                    &subhit.scoperef,
                                    None,
                                    defn_only,
                                )? {
                                    return Ok(Some(found));
                                }
                            }
                            Err(err) if err.is_recoverable() => {}
                            Err(err) => return Err(err),
                        }
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Resolve an attribute access: `tokens[0]` looked up on `elem`.
    ///
    /// Typically consumes one token; a variable re-expressed through its
    /// citdl consumes the whole remainder in one recursive resolution.
    pub(super) fn hit_from_getattr(
        &mut self,
        tokens: &[Token],
        elem: Arc<Element>,
        scoperef: ScopeRef,
        defn_only: bool,
    ) -> Result<(Hit, usize), ResolveError> {
        self.check_aborted()?;
        let first = match &tokens[0] {
            Token::Name(name) => name.clone(),
            Token::Call(text) => {
                return Err(ResolveError::Unimplemented(format!(
                    "getattr with call token '{text}'"
                )));
            }
        };
        tracing::trace!(attr = %first, on = %elem, scope = %scoperef, "getattr");

        match &*elem {
            Element::Variable(var) => {
                // Nested declarations on the variable itself (closures).
                if let Some(attr) = var.names.get(first.as_str()) {
                    if attr.as_import().is_none() {
                        let inner = scoperef.join(Arc::clone(&var.name));
                        return Ok((Hit::new(Arc::clone(attr), inner), 1));
                    }
                }
                let Some(var_citdl) = var.citdl.clone() else {
                    return Err(ResolveError::Unresolved(format!(
                        "no type-inference info for {elem}"
                    )));
                };
                // Re-express as `<citdl>.<attrs...>` and resolve from
                // scratch; the variable's deferred type carries the lookup.
                self.bump_budget(&var_citdl)?;
                let mut combined = citdl::tokenize(&var_citdl);
                combined.extend(tokens.iter().cloned());
                let (hit, _) = self.hit_from_tokens(
                    &combined,
                    &var_citdl,
                    &scoperef,
                    Some(&elem),
                    defn_only,
                )?;
                Ok((hit, tokens.len()))
            }

            Element::Scope(scope) => {
                match scope.ilk {
                    Ilk::Function => {
                        if let Some(attr) = scope.names.get(first.as_str()) {
                            if attr.as_import().is_none() {
                                let inner = scoperef.join(Arc::clone(&scope.name));
                                return Ok((Hit::new(Arc::clone(attr), inner), 1));
                            }
                        }
                        // Function-internal arguments and variables do not
                        // resolve as attributes.
                    }
                    Ilk::Class | Ilk::Instance | Ilk::Object | Ilk::Interface => {
                        if let Some(attr) = scope.names.get(first.as_str()) {
                            if attr.as_import().is_none() {
                                let inner = scoperef.join(Arc::clone(&scope.name));
                                return Ok((Hit::new(Arc::clone(attr), inner), 1));
                            }
                        }
                        if let Some(found) = self.hit_from_elem_imports(tokens, &elem, defn_only)? {
                            return Ok(found);
                        }
                        // Depth-first through the inheritance edges; first
                        // base that can answer wins.
                        for r in scope.refs().to_vec() {
                            tracing::trace!(attr = %first, base = %r, "trying base");
                            let base = match self.hit_from_type_inference(&r, &scoperef, defn_only)
                            {
                                Ok(base) => base,
                                Err(err) if err.is_recoverable() => continue,
                                Err(err) => return Err(err),
                            };
                            match self.hit_from_getattr(
                                tokens,
                                base.elem,
                                base.scoperef,
                                defn_only,
                            ) {
                                Ok(found) => return Ok(found),
                                Err(err) if err.is_recoverable() => continue,
                                Err(err) => return Err(err),
                            }
                        }
                    }
                    Ilk::Blob => {
                        if let Some(attr) = scope.names.get(first.as_str()) {
                            if attr.as_import().is_none() {
                                return Ok((Hit::new(Arc::clone(attr), scoperef), 1));
                            }
                        }
                        if let Some(found) = self.hit_from_elem_imports(tokens, &elem, defn_only)? {
                            return Ok(found);
                        }
                    }
                }

                // A scope with a residual deferred type (a function-like
                // object with an inferred callable type).
                if let Some(scope_citdl) = scope.citdl.clone() {
                    let sub = self.hit_from_type_inference(&scope_citdl, &scoperef, defn_only)?;
                    return self.hit_from_getattr(tokens, sub.elem, sub.scoperef, defn_only);
                }

                Err(ResolveError::Unresolved(format!(
                    "'{first}' getattr on {elem} in {scoperef}"
                )))
            }

            Element::Import(_) => Err(ResolveError::Unimplemented(format!(
                "getattr on {elem}"
            ))),
        }
    }

    /// Resolve a function/constructor call on `elem`.
    pub(super) fn hit_from_call(
        &mut self,
        elem: Arc<Element>,
        scoperef: ScopeRef,
        args_token: &str,
        args_scoperef: &ScopeRef,
        defn_only: bool,
    ) -> Result<Hit, ResolveError> {
        // The callee may still be a variable; chase its type down to the
        // function/class actually being called.
        let mut hit = Hit::new(elem, scoperef);
        while hit.elem.as_variable().is_some() {
            hit = self.hit_from_variable_type_inference(
                &hit.elem.clone(),
                &hit.scoperef.clone(),
                defn_only,
            )?;
        }

        if let Some(scope) = hit.elem.as_scope() {
            match scope.ilk {
                Ilk::Class | Ilk::Interface | Ilk::Object => {
                    // Constructor call: the result is the instance view.
                    tracing::debug!(class = %scope.name, "call resolves to instance");
                    let instance = Arc::new(Element::Scope(scope.instance()));
                    return Ok(Hit::new(instance, hit.scoperef));
                }
                Ilk::Function => {
                    if let Some(ret) = scope.dominant_return().cloned() {
                        tracing::debug!(function = %scope.name, returns = %ret, "call inference");
                        let (citdl, at) = self.substitute_arg_placeholder(
                            &ret,
                            args_token,
                            &hit.scoperef,
                            args_scoperef,
                        );
                        return self.hit_from_citdl(&citdl, &at, None, defn_only);
                    }
                }
                _ => {}
            }
        }
        Err(ResolveError::NoReturnInfo(hit.elem.to_string()))
    }

    /// Substitute a positional `__argK` return placeholder with the K-th
    /// literal call argument, resolved at the caller's scope.
    fn substitute_arg_placeholder(
        &self,
        ret: &str,
        args_token: &str,
        callee_scoperef: &ScopeRef,
        args_scoperef: &ScopeRef,
    ) -> (String, ScopeRef) {
        if let Some(index) = ret.strip_prefix("__arg") {
            if let Ok(k) = index.parse::<usize>() {
                let args = citdl::call_args(args_token);
                if k >= 1 {
                    if let Some(arg) = args.get(k - 1) {
                        if !arg.starts_with("__arg") && !arg.is_empty() {
                            return (arg.to_string(), args_scoperef.clone());
                        }
                    }
                }
            }
        }
        (ret.to_string(), callee_scoperef.clone())
    }

    /// Resolve a variable's deferred type: its citdl as a fresh expression
    /// rooted at the variable's own scope.
    pub(super) fn hit_from_variable_type_inference(
        &mut self,
        elem: &Arc<Element>,
        scoperef: &ScopeRef,
        defn_only: bool,
    ) -> Result<Hit, ResolveError> {
        let Some(var_citdl) = elem.citdl().cloned() else {
            return Err(ResolveError::Unresolved(format!(
                "no type-inference info for {elem}"
            )));
        };
        tracing::trace!(citdl = %var_citdl, var = %elem, "variable type inference");
        self.hit_from_citdl(&var_citdl, scoperef, Some(elem), defn_only)
    }

    /// Resolve a free citdl string (inheritance edge, return type, residual
    /// scope type) at a scope.
    pub(super) fn hit_from_type_inference(
        &mut self,
        citdl_expr: &str,
        scoperef: &ScopeRef,
        defn_only: bool,
    ) -> Result<Hit, ResolveError> {
        self.hit_from_citdl(citdl_expr, scoperef, None, defn_only)
    }

    /// Dynamic-import special case: `require("mod")` (optionally
    /// `require("mod").symbol`) becomes a synthetic inline import.
    fn hit_from_require(
        &mut self,
        tokens: &[Token],
        variable: Option<&Arc<Element>>,
        defn_only: bool,
    ) -> Result<Option<(Hit, usize)>, ResolveError> {
        if tokens.len() < 2 || !tokens[1].is_call() {
            return Ok(None);
        }
        // The module name: a string-literal sole argument, else what the
        // scanner recorded on the variable being resolved.
        let from_literal = match citdl::call_args(tokens[1].as_str()).as_slice() {
            [only] => string_literal(only).map(str::to_string),
            _ => None,
        };
        let recorded = variable
            .and_then(|v| v.as_variable())
            .and_then(|v| v.required_module.clone());
        let Some(module) = from_literal.or_else(|| recorded.map(|m| m.to_string())) else {
            // Not a recognizable dynamic import; the normal name walk may
            // still know a `require` of its own.
            tracing::trace!("require() without a known module name");
            return Ok(None);
        };
        tracing::debug!(module, "resolving dynamic require");

        let blob = self.load_import_blob(&module)?;
        self.set_reldir_from_blob(&blob);

        match tokens.get(2) {
            Some(Token::Name(symbol)) => {
                let Some(hit) = self.resolve_import_symbol(&blob, symbol, defn_only)? else {
                    return Err(ResolveError::Unresolved(format!(
                        "'{symbol}' in require('{module}')"
                    )));
                };
                Ok(Some((hit, 3)))
            }
            _ => Ok(Some((
                Hit::new(Arc::clone(&blob), ScopeRef::root(blob)),
                2,
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------

    pub(super) fn check_aborted(&self) -> Result<(), ResolveError> {
        if self.abort.is_aborted() {
            Err(ResolveError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Push a scope-qualified expression onto the in-progress stack.
    ///
    /// Re-entering an expression already on the stack means a citdl or
    /// inheritance chain has looped back on itself.
    fn enter(&mut self, expr: &str, scoperef: &ScopeRef) -> Result<String, ResolveError> {
        let key = format!("{expr}@{}", scoperef);
        if self.in_progress.contains(&key) {
            return Err(ResolveError::CycleDetected(expr.to_string()));
        }
        self.bump_budget(expr)?;
        self.in_progress.push(key.clone());
        Ok(key)
    }

    fn leave(&mut self, key: &str) {
        if let Some(pos) = self.in_progress.iter().rposition(|k| k == key) {
            self.in_progress.remove(pos);
        }
    }

    pub(super) fn bump_budget(&mut self, expr: &str) -> Result<(), ResolveError> {
        let count = self.expr_counts.entry(expr.to_string()).or_insert(0);
        *count += 1;
        if *count > MAX_EXPR_COUNT {
            return Err(ResolveError::Unresolved(format!(
                "evaluation budget exceeded for '{expr}'"
            )));
        }
        Ok(())
    }
}

/// The inner text of a quoted string literal, if `text` is one.
fn string_literal(text: &str) -> Option<&str> {
    let text = text.trim();
    for quote in ['\'', '"', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literal_strips_matching_quotes() {
        assert_eq!(string_literal("'fs'"), Some("fs"));
        assert_eq!(string_literal("\"./util\""), Some("./util"));
        assert_eq!(string_literal("fs"), None);
        assert_eq!(string_literal("'fs\""), None);
    }
}
