//! Projections from a resolved hit to user-facing results: completion
//! member lists, calltips, and declaration records.

use indexmap::IndexSet;
use std::sync::Arc;

use crate::base::{Flag, Ilk};
use crate::tree::{Element, ImportElem, ScopeRef};

use super::evaluator::Evaluator;
use super::scope::elem_at;
use super::{Hit, ResolveError};

/// One completion entry: the element kind tag plus its name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Member {
    pub kind: &'static str,
    pub name: String,
}

impl Member {
    fn new(kind: &'static str, name: impl Into<String>) -> Self {
        Member {
            kind,
            name: name.into(),
        }
    }
}

/// A declaration record: where the resolved element was declared.
#[derive(Clone, Debug)]
pub struct Definition {
    /// Source file of the declaring blob, when known.
    pub path: Option<String>,
    pub blobname: String,
    /// Scope path of the declaring scope within the blob.
    pub lpath: Vec<String>,
    pub name: String,
    pub kind: &'static str,
    pub line: Option<u32>,
    pub doc: Option<String>,
    pub signature: Option<String>,
}

impl Evaluator {
    /// The completion members visible on a hit.
    ///
    /// Members come from the element's own names (filtered by the per-ilk
    /// hidden-attribute set), from wildcard imports, and from every
    /// reachable inheritance edge; the result is a duplicate-free union,
    /// sorted case-insensitively by name.
    pub fn members_from_hit(&mut self, hit: &Hit) -> Result<Vec<Member>, ResolveError> {
        let Some(scope) = hit.elem.as_scope() else {
            return Err(ResolveError::Unimplemented(format!(
                "member listing on {}",
                hit.elem
            )));
        };
        // The originating view's filter applies all the way down the
        // inheritance chain, whatever ilks the bases turn out to have.
        let hidden = scope.ilk.hidden_flags();
        let mut acc = IndexSet::new();
        self.collect_members(&hit.elem, &hit.scoperef, hidden, &mut acc)?;
        let mut members: Vec<Member> = acc.into_iter().collect();
        members.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(members)
    }

    fn collect_members(
        &mut self,
        elem: &Arc<Element>,
        scoperef: &ScopeRef,
        hidden: &'static [Flag],
        acc: &mut IndexSet<Member>,
    ) -> Result<(), ResolveError> {
        self.check_aborted()?;
        let Some(scope) = elem.as_scope() else {
            return Err(ResolveError::Unimplemented(format!(
                "member listing on {elem}"
            )));
        };

        for (name, child) in &scope.names {
            if let Some(imp) = child.as_import() {
                if imp.is_wildcard() {
                    // Members of the target module are directly visible.
                    match self.load_import_blob(&imp.module) {
                        Ok(blob) => {
                            let root = ScopeRef::root(Arc::clone(&blob));
                            self.collect_members(
                                &blob,
                                &root,
                                Ilk::Blob.hidden_flags(),
                                acc,
                            )?;
                        }
                        Err(err) if err.is_recoverable() => {}
                        Err(err) => return Err(err),
                    }
                } else if imp.symbol.is_some() {
                    // Completes under its local name with the target
                    // symbol's own kind; an unresolvable target is skipped.
                    match self.import_member(imp, name.as_ref()) {
                        Ok(Some(member)) => {
                            acc.insert(member);
                        }
                        Ok(None) => {}
                        Err(err) if err.is_recoverable() => {}
                        Err(err) => return Err(err),
                    }
                } else {
                    // A module-only import completes under its alias or the
                    // first path segment.
                    let cpln = match imp.alias.as_deref() {
                        Some(alias) => alias.to_string(),
                        None => {
                            let plain = imp.module.trim_start_matches(['.', '/']);
                            plain.split('/').next().unwrap_or(plain).to_string()
                        }
                    };
                    acc.insert(Member::new(child.kind_tag(), cpln));
                }
                continue;
            }
            if hidden.iter().any(|flag| child.has_flag(*flag)) {
                continue;
            }
            acc.insert(Member::new(child.kind_tag(), name.as_ref()));
        }

        // Inherited members; an unresolvable base never hides the rest.
        for r in scope.refs().to_vec() {
            match self.hit_from_type_inference(&r, scoperef, false) {
                Ok(base) => {
                    self.collect_members(&base.elem, &base.scoperef, hidden, acc)?;
                }
                Err(err) if err.is_recoverable() => continue,
                Err(err) => return Err(err),
            }
        }

        // A residual deferred type on the scope itself contributes too.
        if let Some(citdl) = scope.citdl.clone() {
            match self.hit_from_type_inference(&citdl, scoperef, false) {
                Ok(sub) => self.collect_members(&sub.elem, &sub.scoperef, hidden, acc)?,
                Err(err) if err.is_recoverable() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// The completion member for a non-wildcard symbol import: the target
    /// symbol's kind under the import's local name.
    fn import_member(
        &mut self,
        imp: &ImportElem,
        local: &str,
    ) -> Result<Option<Member>, ResolveError> {
        let Some(symbol) = imp.symbol.as_deref() else {
            return Ok(None);
        };
        let blob = self.load_import_blob(&imp.module)?;
        let direct = blob
            .names()
            .and_then(|names| names.get(symbol))
            .filter(|found| found.as_import().is_none());
        if let Some(found) = direct {
            return Ok(Some(Member::new(found.kind_tag(), local)));
        }
        match self.resolve_import_symbol(&blob, symbol, false)? {
            Some(hit) => Ok(Some(Member::new(hit.elem.kind_tag(), local))),
            None => Ok(None),
        }
    }

    /// The calltip for a hit: a function's recorded signature, or a
    /// constructible scope's constructor signature.
    pub fn calltip_from_hit(&mut self, hit: &Hit) -> Result<String, ResolveError> {
        match hit.elem.as_scope().map(|s| s.ilk) {
            Some(Ilk::Function) => Ok(render_calltip(&hit.elem)),
            Some(Ilk::Class | Ilk::Instance | Ilk::Interface | Ilk::Object) => {
                self.calltip_from_class(&hit.elem, &hit.scoperef)
            }
            _ => Err(ResolveError::Unimplemented(format!(
                "calltip on {}",
                hit.elem
            ))),
        }
    }

    /// Constructor calltip: the scope's own recorded signature, else a
    /// ctor-flagged member or a member named `constructor` when it carries
    /// a signature or doc (chasing base classes for an inherited one),
    /// else the scope's doc lines, else `Name()`.
    fn calltip_from_class(
        &mut self,
        elem: &Arc<Element>,
        scoperef: &ScopeRef,
    ) -> Result<String, ResolveError> {
        if elem.as_scope().is_some_and(|s| s.signature.is_some()) {
            return Ok(render_calltip(elem));
        }
        if let Some(ctor) = self.ctor_from_class(elem, scoperef)? {
            let informative = ctor.as_scope().is_some_and(|s| s.signature.is_some())
                || ctor.doc().is_some_and(|doc| !doc.is_empty());
            if informative {
                // An unsigned ctor renders under the class's own name.
                return Ok(render_calltip_named(&ctor, elem.name()));
            }
        }
        match elem.doc() {
            Some(doc) if !doc.is_empty() => Ok(doc
                .lines()
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")),
            _ => Ok(format!("{}()", elem.name())),
        }
    }

    fn ctor_from_class(
        &mut self,
        elem: &Arc<Element>,
        scoperef: &ScopeRef,
    ) -> Result<Option<Arc<Element>>, ResolveError> {
        let Some(scope) = elem.as_scope() else {
            return Ok(None);
        };
        let local = scope
            .names
            .values()
            .find(|child| child.has_flag(Flag::Ctor))
            .or_else(|| scope.names.get("constructor"));
        if let Some(ctor) = local {
            return Ok(Some(Arc::clone(ctor)));
        }
        for r in scope.refs().to_vec() {
            match self.hit_from_type_inference(&r, scoperef, false) {
                Ok(base) => {
                    if let Some(ctor) = self.ctor_from_class(&base.elem, &base.scoperef)? {
                        return Ok(Some(ctor));
                    }
                }
                Err(err) if err.is_recoverable() => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// The declaration record for a hit.
    pub fn defn_from_hit(&mut self, hit: &Hit) -> Result<Definition, ResolveError> {
        let blob = &hit.scoperef.blob;
        // A hit at the blob root declares the module itself.
        let elem = &hit.elem;
        let path = blob
            .as_scope()
            .and_then(|s| s.src.clone());
        let line = elem.line().or_else(|| {
            // Imports hit through a module object carry no line; fall back
            // to the declaring scope's own line.
            elem_at(&hit.scoperef).ok().and_then(|scope| scope.line())
        });
        Ok(Definition {
            path,
            blobname: blob.name().to_string(),
            lpath: hit.scoperef.path.iter().map(|s| s.to_string()).collect(),
            name: elem.name().to_string(),
            kind: elem.kind_tag(),
            line,
            doc: elem.doc().map(str::to_string),
            signature: elem
                .as_scope()
                .and_then(|s| s.signature.clone()),
        })
    }
}

/// Signature text for a calltip, falling back to `name(...)`; a doc string
/// is appended on its own line.
fn render_calltip(elem: &Arc<Element>) -> String {
    render_calltip_named(elem, elem.name())
}

/// As [`render_calltip`], with the signature fallback rendered under a
/// caller-supplied name (a ctor under its class's name).
fn render_calltip_named(elem: &Arc<Element>, name: &str) -> String {
    let signature = elem
        .as_scope()
        .and_then(|s| s.signature.clone())
        .unwrap_or_else(|| format!("{name}(...)"));
    match elem.doc() {
        Some(doc) if !doc.is_empty() => format!("{signature}\n{doc}"),
        _ => signature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{BlobLibrary, Library};
    use crate::tree::{BlobBuilder, ScopeBuilder, VarBuilder};

    fn evaluator() -> Evaluator {
        let libs: Vec<Arc<dyn Library>> = Vec::new();
        Evaluator::new(libs, BlobBuilder::new("*").build())
    }

    fn evaluator_with(blobs: Vec<(&str, Arc<Element>)>) -> Evaluator {
        let lib = BlobLibrary::new("testlib");
        for (module, blob) in blobs {
            lib.add_blob(module, blob);
        }
        let libs: Vec<Arc<dyn Library>> = vec![Arc::new(lib)];
        Evaluator::new(libs, BlobBuilder::new("*").build())
    }

    fn class_hit(blob: Arc<Element>, class: &str) -> Hit {
        let scoperef = ScopeRef::root(Arc::clone(&blob));
        let elem = Arc::clone(blob.names().unwrap().get(class).unwrap());
        Hit::new(elem, scoperef)
    }

    #[test]
    fn instance_members_hide_statics_and_ctor() {
        let blob = BlobBuilder::new("mod")
            .child(
                ScopeBuilder::class("Widget")
                    .child(
                        ScopeBuilder::function("create")
                            .attr(Flag::StaticMethod)
                            .build(),
                    )
                    .child(ScopeBuilder::function("constructor").attr(Flag::Ctor).build())
                    .child(ScopeBuilder::function("render").build())
                    .child(VarBuilder::new("width").attr(Flag::InstanceVar).build())
                    .build(),
            )
            .build();
        let hit = class_hit(blob, "Widget");
        let mut ev = evaluator();

        let class_members = ev.members_from_hit(&hit).unwrap();
        let class_names: Vec<&str> = class_members.iter().map(|m| m.name.as_str()).collect();
        assert!(class_names.contains(&"create"));
        assert!(class_names.contains(&"render"));
        assert!(!class_names.contains(&"width"));

        let instance = Arc::new(Element::Scope(
            hit.elem.as_scope().unwrap().instance(),
        ));
        let instance_hit = Hit::new(instance, hit.scoperef.clone());
        let inst_members = ev.members_from_hit(&instance_hit).unwrap();
        let inst_names: Vec<&str> = inst_members.iter().map(|m| m.name.as_str()).collect();
        assert!(inst_names.contains(&"render"));
        assert!(inst_names.contains(&"width"));
        assert!(!inst_names.contains(&"create"));
        assert!(!inst_names.contains(&"constructor"));
    }

    #[test]
    fn inherited_members_are_a_deduplicated_union() {
        let blob = BlobBuilder::new("mod")
            .child(
                ScopeBuilder::class("Base")
                    .child(ScopeBuilder::function("shared").build())
                    .child(ScopeBuilder::function("base_only").build())
                    .build(),
            )
            .child(
                ScopeBuilder::class("Sub")
                    .classref("Base")
                    .child(ScopeBuilder::function("shared").build())
                    .build(),
            )
            .build();
        let mut ev = evaluator();

        let sub = ev.members_from_hit(&class_hit(Arc::clone(&blob), "Sub")).unwrap();
        let base = ev.members_from_hit(&class_hit(blob, "Base")).unwrap();

        for member in &base {
            assert!(sub.contains(member), "missing inherited {member:?}");
        }
        let shared_count = sub.iter().filter(|m| m.name == "shared").count();
        assert_eq!(shared_count, 1);
    }

    #[test]
    fn symbol_imports_complete_with_target_kind() {
        let shapes = BlobBuilder::new("shapes")
            .child(ScopeBuilder::class("Circle").build())
            .build();
        let app = BlobBuilder::new("app")
            .import(crate::tree::ImportElem::new("shapes").with_symbol("Circle"))
            .import(crate::tree::ImportElem::new("pkg/sub"))
            .build();
        let mut ev = evaluator_with(vec![("shapes", shapes)]);

        let root = ScopeRef::root(Arc::clone(&app));
        let members = ev.members_from_hit(&Hit::new(app, root)).unwrap();

        assert!(members.contains(&Member::new("class", "Circle")));
        // Module-only imports complete under their first path segment.
        assert!(members.contains(&Member::new("module", "pkg")));
        assert!(!members.iter().any(|m| m.name == "pkg/sub"));
    }

    #[test]
    fn class_view_filter_applies_through_non_class_bases() {
        let blob = BlobBuilder::new("mod")
            .child(
                ScopeBuilder::object("proto")
                    .child(VarBuilder::new("cache").attr(Flag::InstanceVar).build())
                    .child(ScopeBuilder::function("helper").build())
                    .build(),
            )
            .child(ScopeBuilder::class("Sub").classref("proto").build())
            .build();
        let mut ev = evaluator();

        let members = ev.members_from_hit(&class_hit(blob, "Sub")).unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"helper"));
        // Instance variables stay hidden in a class view even when the
        // base is an object scope.
        assert!(!names.contains(&"cache"));
    }

    #[test]
    fn unsigned_class_calltip_uses_ctor_signature() {
        let blob = BlobBuilder::new("mod")
            .child(
                ScopeBuilder::class("Widget")
                    .child(
                        ScopeBuilder::function("constructor")
                            .attr(Flag::Ctor)
                            .signature("Widget(width, height)")
                            .build(),
                    )
                    .build(),
            )
            .build();
        let hit = class_hit(blob, "Widget");
        let calltip = evaluator().calltip_from_hit(&hit).unwrap();
        assert_eq!(calltip, "Widget(width, height)");
    }

    #[test]
    fn doc_only_ctor_renders_under_class_name() {
        let blob = BlobBuilder::new("mod")
            .child(
                ScopeBuilder::class("Widget")
                    .child(
                        ScopeBuilder::function("constructor")
                            .attr(Flag::Ctor)
                            .doc("Builds a widget.")
                            .build(),
                    )
                    .build(),
            )
            .build();
        let hit = class_hit(blob, "Widget");
        let calltip = evaluator().calltip_from_hit(&hit).unwrap();
        assert_eq!(calltip, "Widget(...)\nBuilds a widget.");
    }

    #[test]
    fn bare_ctor_calltip_falls_back_to_class_doc_then_name() {
        let blob = BlobBuilder::new("mod")
            .child(
                ScopeBuilder::class("Widget")
                    .doc("Creates widgets.")
                    .child(
                        ScopeBuilder::function("constructor")
                            .attr(Flag::Ctor)
                            .build(),
                    )
                    .build(),
            )
            .child(ScopeBuilder::class("Plain").build())
            .build();

        let calltip = evaluator()
            .calltip_from_hit(&class_hit(Arc::clone(&blob), "Widget"))
            .unwrap();
        assert_eq!(calltip, "Creates widgets.");

        let calltip = evaluator()
            .calltip_from_hit(&class_hit(blob, "Plain"))
            .unwrap();
        assert_eq!(calltip, "Plain()");
    }

    #[test]
    fn function_calltip_includes_doc() {
        let blob = BlobBuilder::new("mod")
            .child(
                ScopeBuilder::function("clamp")
                    .signature("clamp(value, lo, hi)")
                    .doc("Clamp value into [lo, hi].")
                    .build(),
            )
            .build();
        let hit = class_hit(blob, "clamp");
        let calltip = evaluator().calltip_from_hit(&hit).unwrap();
        assert_eq!(calltip, "clamp(value, lo, hi)\nClamp value into [lo, hi].");
    }

    #[test]
    fn defn_records_declaring_blob_and_scope_path() {
        let blob = BlobBuilder::new("bar")
            .src("/proj/bar.js")
            .child(VarBuilder::new("bar").citdl("Number").line(3).build())
            .build();
        let scoperef = ScopeRef::root(Arc::clone(&blob));
        let elem = Arc::clone(blob.names().unwrap().get("bar").unwrap());
        let defn = evaluator().defn_from_hit(&Hit::new(elem, scoperef)).unwrap();

        assert_eq!(defn.path.as_deref(), Some("/proj/bar.js"));
        assert_eq!(defn.blobname, "bar");
        assert_eq!(defn.name, "bar");
        assert_eq!(defn.kind, "variable");
        assert_eq!(defn.line, Some(3));
        assert!(defn.lpath.is_empty());
    }
}
