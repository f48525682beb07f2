//! # citdl-core
//!
//! The CITDL symbolic resolver: given symbol trees for one or more scanned
//! files plus a deferred type expression (a CITDL string such as
//! `foo.bar(baz).qux`), walk scopes, inheritance graphs and cross-file
//! imports to produce a concrete declaration, a member list, or a call
//! signature.
//!
//! This crate does not parse source text. Per-language scanners produce
//! [`tree::Element`] trees (directly through the builders, or serialized as
//! JSON and served by a [`library::Library`]); the resolver only consumes
//! them.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! eval      → evaluation requests, result controller, cancellation
//!   ↓
//! resolve   → scope navigator, hit resolver, import resolution, projections
//!   ↓
//! library   → blob providers (in-memory, directory-backed, parent-dir fallback)
//!   ↓
//! citdl     → CITDL expression tokenizer
//!   ↓
//! tree      → symbol tree model (elements, scoperefs, builders, JSON form)
//!   ↓
//! base      → primitives (element ilks, attribute flags, kind tags)
//! ```

// ============================================================================
// MODULES (dependency order: base → tree → citdl → library → resolve → eval)
// ============================================================================

/// Foundation types: element ilks, attribute flags, completion kind tags
pub mod base;

/// Symbol tree model: elements, scope references, builders, JSON form
pub mod tree;

/// CITDL expression tokenizer
pub mod citdl;

/// Blob providers: in-memory, directory-backed, lazy parent-dir fallback
pub mod library;

/// The resolver: scope navigation, hit resolution, member/calltip/defn projection
pub mod resolve;

/// Evaluation requests: query kinds, controller interface, cancellation
pub mod eval;

// Re-export the types nearly every consumer needs
pub use base::{Flag, Ilk};
pub use eval::{EvalController, EvalRequest, EvalStatus, QueryKind};
pub use resolve::{Definition, Evaluator, Hit, Member, ResolveError};
pub use tree::{Element, ScopeRef};
