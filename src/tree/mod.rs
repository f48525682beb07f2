//! Symbol tree model.
//!
//! One scanned file/module is represented as a **blob**: a root
//! [`ScopeElem`] whose `names` map holds the file's top-level declarations.
//! Scanners build trees through the builders in [`builder`]; trees are
//! immutable once built and shared via `Arc`. The resolver only reads them.
//!
//! Trees round-trip through JSON (serde, internally tagged on `"kind"`);
//! this is the serialized form directory libraries load from disk.
//!
//! ## Key Types
//!
//! - [`Element`] — tagged union: scope / variable / import
//! - [`ScopeElem`], [`VarElem`], [`ImportElem`] — the per-kind payloads
//! - [`ScopeRef`] — a (blob, path) coordinate locating an element in a tree
//! - [`BlobBuilder`], [`ScopeBuilder`], [`VarBuilder`] — producer API

mod builder;
mod element;
mod scoperef;

pub use builder::{BlobBuilder, ScopeBuilder, VarBuilder};
pub use element::{Element, ImportElem, ScopeElem, VarElem};
pub use scoperef::ScopeRef;

use std::sync::Arc;

/// Parse a serialized blob (the JSON tree form) back into an element.
///
/// Fails unless the root element is a scope with blob ilk.
pub fn blob_from_json(text: &str) -> Result<Arc<Element>, serde_json::Error> {
    use serde::de::Error;
    let elem: Element = serde_json::from_str(text)?;
    match &elem {
        Element::Scope(scope) if scope.ilk == crate::base::Ilk::Blob => Ok(Arc::new(elem)),
        _ => Err(serde_json::Error::custom("root element is not a blob")),
    }
}

/// Serialize a blob to its JSON tree form.
pub fn blob_to_json(blob: &Element) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(blob)
}
