//! The hit resolver.
//!
//! Resolution takes a CITDL expression and a starting scope and produces a
//! [`Hit`]: the element the expression denotes plus the scope it was found
//! in. The algorithm resolves the first token by walking lexical scopes
//! (names map → imports → blob self-name → parent), then iteratively
//! applies the remaining tokens as attribute accesses or call inferences,
//! and finally peels variable deferred types until a concrete element
//! remains.
//!
//! One [`Evaluator`] serves one evaluation request: it owns a private copy
//! of the library priority list (so relative-import re-rooting never leaks
//! into shared state), a cycle guard, and an evaluation budget. Symbol
//! trees and libraries are only ever read.

mod error;
mod evaluator;
mod imports;
mod outline;
mod scope;

pub use error::ResolveError;
pub use evaluator::Evaluator;
pub use outline::{Definition, Member};
pub use scope::elem_at;

use std::sync::Arc;

use crate::tree::{Element, ScopeRef};

/// A resolved location: the element found, and the scope it was found in.
///
/// The scope matters because further resolution is scope-relative (the
/// element's own citdl, its inheritance edges, `this`-like lookups).
#[derive(Clone, Debug)]
pub struct Hit {
    pub elem: Arc<Element>,
    pub scoperef: ScopeRef,
}

impl Hit {
    pub fn new(elem: Arc<Element>, scoperef: ScopeRef) -> Self {
        Hit { elem, scoperef }
    }
}
