//! The process-wide built-in fallback blob.
//!
//! Lexical scope resolution bottoms out here: the parent of every blob root
//! is the built-in blob (globals, built-in classes), whose own parent is
//! terminal. It is loaded once from the lowest-priority library's `"*"`
//! blob, memoized process-wide, and immutable thereafter — safe for
//! concurrent readers with no further locking.

use std::sync::{Arc, OnceLock};

use crate::tree::Element;

use super::{Library, LibraryError};

static BUILTIN_BLOB: OnceLock<Arc<Element>> = OnceLock::new();

/// The memoized built-in blob, loading it from `stdlib` on first call.
///
/// Later calls ignore `stdlib` entirely; evaluators that need a different
/// built-in scope (tests, per-language hosts) pass one explicitly instead
/// of going through the global.
pub fn global_builtin_blob(stdlib: &dyn Library) -> Result<Arc<Element>, LibraryError> {
    if let Some(blob) = BUILTIN_BLOB.get() {
        return Ok(Arc::clone(blob));
    }
    let blob = stdlib.get_blob("*")?;
    Ok(Arc::clone(BUILTIN_BLOB.get_or_init(|| blob)))
}
