//! Build-then-freeze producer API for symbol trees.
//!
//! Scanners (external collaborators) construct trees through these
//! builders; `build()` freezes the result behind `Arc`. There is no mutable
//! symbol-table stack: a builder owns its subtree until it is attached to a
//! parent, so the resolver can never observe a partially-built tree.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::base::{Flag, Ilk};

use super::{Element, ImportElem, ScopeElem, VarElem};

/// Builder for a blob: the root element of one scanned file/module.
pub struct BlobBuilder {
    inner: ScopeElem,
}

impl BlobBuilder {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        BlobBuilder {
            inner: empty_scope(name.into(), Ilk::Blob),
        }
    }

    /// Set the source file path this blob was scanned from.
    pub fn src(mut self, path: impl Into<String>) -> Self {
        self.inner.src = Some(path.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.inner.doc = Some(doc.into());
        self
    }

    /// Attach a child element under its declared name.
    pub fn child(mut self, elem: Element) -> Self {
        insert_child(&mut self.inner.names, elem);
        self
    }

    pub fn import(self, import: ImportElem) -> Self {
        self.child(Element::Import(import))
    }

    /// Freeze the blob.
    pub fn build(self) -> Arc<Element> {
        Arc::new(Element::Scope(self.inner))
    }
}

/// Builder for a non-blob scope: class, function, interface, or object.
pub struct ScopeBuilder {
    inner: ScopeElem,
}

impl ScopeBuilder {
    pub fn new(name: impl Into<Arc<str>>, ilk: Ilk) -> Self {
        debug_assert!(ilk != Ilk::Blob, "use BlobBuilder for blobs");
        ScopeBuilder {
            inner: empty_scope(name.into(), ilk),
        }
    }

    pub fn class(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Ilk::Class)
    }

    pub fn function(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Ilk::Function)
    }

    pub fn interface(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Ilk::Interface)
    }

    pub fn object(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Ilk::Object)
    }

    pub fn attr(mut self, flag: Flag) -> Self {
        if !self.inner.attributes.contains(&flag) {
            self.inner.attributes.push(flag);
        }
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.inner.doc = Some(doc.into());
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.inner.signature = Some(signature.into());
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.inner.line = Some(line);
        self
    }

    /// Residual deferred type on the scope itself.
    pub fn citdl(mut self, citdl: impl Into<Arc<str>>) -> Self {
        self.inner.citdl = Some(citdl.into());
        self
    }

    pub fn classref(mut self, citdl: impl Into<Arc<str>>) -> Self {
        self.inner.classrefs.push(citdl.into());
        self
    }

    pub fn interfaceref(mut self, citdl: impl Into<Arc<str>>) -> Self {
        self.inner.interfacerefs.push(citdl.into());
        self
    }

    pub fn objectref(mut self, citdl: impl Into<Arc<str>>) -> Self {
        self.inner.objectrefs.push(citdl.into());
        self
    }

    /// Record one observed return type (functions). Repeated citdl strings
    /// accumulate into the histogram.
    pub fn returns(mut self, citdl: impl Into<Arc<str>>, count: u32) -> Self {
        let citdl = citdl.into();
        if let Some(entry) = self.inner.returns.iter_mut().find(|(c, _)| *c == citdl) {
            entry.1 += count;
        } else {
            self.inner.returns.push((citdl, count));
        }
        self
    }

    pub fn child(mut self, elem: Element) -> Self {
        insert_child(&mut self.inner.names, elem);
        self
    }

    pub fn import(self, import: ImportElem) -> Self {
        self.child(Element::Import(import))
    }

    pub fn build(self) -> Element {
        Element::Scope(self.inner)
    }
}

/// Builder for a variable element.
pub struct VarBuilder {
    inner: VarElem,
}

impl VarBuilder {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        VarBuilder {
            inner: VarElem {
                name: name.into(),
                attributes: Vec::new(),
                doc: None,
                line: None,
                citdl: None,
                names: IndexMap::new(),
                required_module: None,
            },
        }
    }

    pub fn attr(mut self, flag: Flag) -> Self {
        if !self.inner.attributes.contains(&flag) {
            self.inner.attributes.push(flag);
        }
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.inner.doc = Some(doc.into());
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.inner.line = Some(line);
        self
    }

    pub fn citdl(mut self, citdl: impl Into<Arc<str>>) -> Self {
        self.inner.citdl = Some(citdl.into());
        self
    }

    /// Nested declaration (e.g. a closure assigned onto the variable).
    pub fn child(mut self, elem: Element) -> Self {
        insert_child(&mut self.inner.names, elem);
        self
    }

    /// Mark this variable as assigned from `require("<module>")`.
    pub fn required_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.inner.required_module = Some(module.into());
        self
    }

    pub fn build(self) -> Element {
        Element::Variable(self.inner)
    }
}

fn empty_scope(name: Arc<str>, ilk: Ilk) -> ScopeElem {
    ScopeElem {
        name,
        ilk,
        attributes: Vec::new(),
        doc: None,
        signature: None,
        line: None,
        src: None,
        names: IndexMap::new(),
        classrefs: Vec::new(),
        interfacerefs: Vec::new(),
        objectrefs: Vec::new(),
        returns: Vec::new(),
        citdl: None,
    }
}

fn insert_child(names: &mut IndexMap<Arc<str>, Arc<Element>>, elem: Element) {
    let key = match &elem {
        Element::Import(import) => import.local_name(),
        other => Arc::from(other.name()),
    };
    names.insert(key, Arc::new(elem));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_roundtrips_through_json() {
        let blob = BlobBuilder::new("foo")
            .src("/src/foo.js")
            .child(
                ScopeBuilder::class("Widget")
                    .line(3)
                    .classref("Base")
                    .child(VarBuilder::new("count").citdl("Number").build())
                    .build(),
            )
            .import(ImportElem::new("bar").with_symbol("Bar").with_line(1))
            .build();

        let json = crate::tree::blob_to_json(&blob).unwrap();
        let back = crate::tree::blob_from_json(&json).unwrap();

        let scope = back.as_scope().unwrap();
        assert_eq!(scope.name.as_ref(), "foo");
        assert_eq!(scope.src.as_deref(), Some("/src/foo.js"));
        let widget = scope.names.get("Widget").unwrap();
        assert_eq!(widget.kind_tag(), "class");
        assert_eq!(widget.as_scope().unwrap().classrefs[0].as_ref(), "Base");
        assert_eq!(back.imports().count(), 1);
    }

    #[test]
    fn non_blob_root_is_rejected() {
        let json = r#"{"kind":"variable","name":"x"}"#;
        assert!(crate::tree::blob_from_json(json).is_err());
    }

    #[test]
    fn returns_histogram_accumulates() {
        let f = ScopeBuilder::function("f")
            .returns("Number", 2)
            .returns("String", 1)
            .returns("Number", 1)
            .build();
        let scope = f.as_scope().unwrap();
        assert_eq!(scope.dominant_return().unwrap().as_ref(), "Number");
    }
}
