//! Cross-blob resolution through imports: named/aliased symbols, wildcard
//! imports, multi-segment module paths, and the dynamic require() form.

#![allow(clippy::unwrap_used)]

#[path = "helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use citdl::tree::{BlobBuilder, ImportElem, ScopeBuilder, VarBuilder};
use citdl::{Evaluator, ScopeRef};

use helpers::fixtures::{builtin_blob, library_with};

#[test]
fn default_alias_import_reaches_exported_variable() {
    // `import Bar from 'bar'` with no default export: `Bar` denotes the
    // module object, and `Bar.bar` its top-level variable.
    let bar = BlobBuilder::new("bar")
        .src("/proj/bar.js")
        .child(VarBuilder::new("bar").citdl("Number").line(3).build())
        .build();
    let foo = BlobBuilder::new("foo")
        .import(
            ImportElem::new("bar")
                .with_symbol("default")
                .with_alias("Bar")
                .with_line(1),
        )
        .build();
    let mut ev = Evaluator::new(library_with(vec![("bar", bar)]), builtin_blob());

    let hit = ev
        .eval_citdl("Bar.bar", &ScopeRef::root(foo), true)
        .unwrap();
    assert_eq!(hit.elem.citdl().map(|c| c.as_ref()), Some("Number"));

    let defn = ev.defn_from_hit(&hit).unwrap();
    assert_eq!(defn.path.as_deref(), Some("/proj/bar.js"));
    assert_eq!(defn.blobname, "bar");
    assert_eq!(defn.line, Some(3));
    assert_eq!(defn.kind, "variable");
}

#[test]
fn named_import_resolves_to_the_exported_class() {
    let shapes = BlobBuilder::new("shapes")
        .child(
            ScopeBuilder::class("Circle")
                .child(ScopeBuilder::function("area").build())
                .build(),
        )
        .build();
    let foo = BlobBuilder::new("foo")
        .import(ImportElem::new("shapes").with_symbol("Circle"))
        .build();
    let mut ev = Evaluator::new(library_with(vec![("shapes", shapes)]), builtin_blob());

    let hit = ev
        .eval_citdl("Circle().area", &ScopeRef::root(foo), false)
        .unwrap();
    assert_eq!(hit.elem.name(), "area");
    assert_eq!(hit.scoperef.blob.name(), "shapes");
}

#[test]
fn wildcard_import_makes_members_directly_visible() {
    let util = BlobBuilder::new("util")
        .child(ScopeBuilder::function("clamp").returns("Number", 1).build())
        .build();
    let foo = BlobBuilder::new("foo")
        .import(ImportElem::new("util").with_symbol("*"))
        .build();
    let mut ev = Evaluator::new(library_with(vec![("util", util)]), builtin_blob());

    let hit = ev
        .eval_citdl("clamp", &ScopeRef::root(foo), false)
        .unwrap();
    assert_eq!(hit.elem.name(), "clamp");
}

#[test]
fn wildcard_import_resolution_is_idempotent() {
    let util = BlobBuilder::new("util")
        .child(ScopeBuilder::function("clamp").build())
        .build();
    let foo = BlobBuilder::new("foo")
        .import(ImportElem::new("util").with_symbol("*"))
        .build();
    let libs = library_with(vec![("util", util)]);
    let root = ScopeRef::root(foo);

    let first = Evaluator::new(libs.clone(), builtin_blob())
        .eval_citdl("clamp", &root, false)
        .unwrap();
    let second = Evaluator::new(libs, builtin_blob())
        .eval_citdl("clamp", &root, false)
        .unwrap();
    assert!(Arc::ptr_eq(&first.elem, &second.elem));
    assert_eq!(
        first.scoperef.blob.name(),
        second.scoperef.blob.name()
    );
}

#[test]
fn multi_segment_import_path_consumes_matching_tokens() {
    let sub = BlobBuilder::new("pkg/sub")
        .child(VarBuilder::new("value").citdl("Number").line(2).build())
        .build();
    let foo = BlobBuilder::new("foo")
        .import(ImportElem::new("pkg/sub"))
        .build();
    let mut ev = Evaluator::new(library_with(vec![("pkg/sub", sub)]), builtin_blob());

    let hit = ev
        .eval_citdl("pkg.sub.value", &ScopeRef::root(foo), true)
        .unwrap();
    assert_eq!(hit.elem.name(), "value");
    assert_eq!(hit.elem.line(), Some(2));
}

#[test]
fn require_call_resolves_the_named_module() {
    let dbm = BlobBuilder::new("dbm")
        .child(ScopeBuilder::function("open").signature("open(path)").build())
        .build();
    let foo = BlobBuilder::new("foo").build();
    let mut ev = Evaluator::new(library_with(vec![("dbm", dbm)]), builtin_blob());
    let root = ScopeRef::root(foo);

    let module = ev.eval_citdl("require('dbm')", &root, false).unwrap();
    assert!(module.elem.is_blob());
    assert_eq!(module.elem.name(), "dbm");

    let symbol = ev
        .eval_citdl("require('dbm').open", &root, false)
        .unwrap();
    assert_eq!(symbol.elem.name(), "open");
}

#[test]
fn required_module_recorded_on_variable_backs_bare_require() {
    // `var db = require(someExpr)`: the scanner could not keep the literal
    // in the citdl but recorded the module on the variable.
    let dbm = BlobBuilder::new("dbm")
        .child(ScopeBuilder::function("open").build())
        .build();
    let foo = BlobBuilder::new("foo")
        .child(
            VarBuilder::new("db")
                .citdl("require()")
                .required_module("dbm")
                .build(),
        )
        .build();
    let mut ev = Evaluator::new(library_with(vec![("dbm", dbm)]), builtin_blob());

    let hit = ev
        .eval_citdl("db.open", &ScopeRef::root(foo), false)
        .unwrap();
    assert_eq!(hit.elem.name(), "open");
    assert_eq!(hit.scoperef.blob.name(), "dbm");
}

#[test]
fn unresolvable_import_falls_through_to_later_candidates() {
    let real = BlobBuilder::new("real")
        .child(ScopeBuilder::class("Thing").build())
        .build();
    let foo = BlobBuilder::new("foo")
        .import(ImportElem::new("missing").with_symbol("Thing"))
        .import(ImportElem::new("real").with_symbol("Thing"))
        .build();
    let mut ev = Evaluator::new(library_with(vec![("real", real)]), builtin_blob());

    let hit = ev
        .eval_citdl("Thing", &ScopeRef::root(foo), false)
        .unwrap();
    assert_eq!(hit.scoperef.blob.name(), "real");
}
