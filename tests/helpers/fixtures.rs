//! Shared fixture builders for resolver integration tests.

use std::sync::Arc;

use citdl::library::{BlobLibrary, Library};
use citdl::tree::{BlobBuilder, ScopeBuilder};
use citdl::Element;

/// A small built-in blob: `Number` and `String` classes plus `parseInt`.
pub fn builtin_blob() -> Arc<Element> {
    BlobBuilder::new("*")
        .child(
            ScopeBuilder::class("Number")
                .child(
                    ScopeBuilder::function("toFixed")
                        .signature("toFixed(digits)")
                        .build(),
                )
                .build(),
        )
        .child(
            ScopeBuilder::class("String")
                .child(ScopeBuilder::function("charAt").build())
                .build(),
        )
        .child(
            ScopeBuilder::function("parseInt")
                .signature("parseInt(text, radix)")
                .returns("Number", 1)
                .build(),
        )
        .build()
}

/// One in-memory library serving the given module → blob pairs.
pub fn library_with(blobs: Vec<(&str, Arc<Element>)>) -> Vec<Arc<dyn Library>> {
    let lib = BlobLibrary::new("testlib");
    for (module, blob) in blobs {
        lib.add_blob(module, blob);
    }
    vec![Arc::new(lib)]
}

/// No libraries at all; resolution stays within the starting blob and the
/// built-in blob.
pub fn no_libs() -> Vec<Arc<dyn Library>> {
    Vec::new()
}
