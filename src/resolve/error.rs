//! The resolver error taxonomy.

use thiserror::Error;

use crate::library::LibraryError;

/// Errors from hit resolution.
///
/// Structural failures (`Unresolved`, `NoReturnInfo`, `NotFound`) are
/// caught at each fallback boundary — parent scope, next import, next
/// inheritance edge — and only escalate to the evaluation request when no
/// alternative remains. `CycleDetected` and `Unimplemented` always
/// escalate; `Aborted` unwinds the whole request.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A lookup step failed; the caller tries the next candidate.
    #[error("could not resolve '{0}'")]
    Unresolved(String),

    /// A called function has no recorded return type.
    #[error("no return type info for {0}")]
    NoReturnInfo(String),

    /// A citdl/inheritance chain revisited an expression already being
    /// resolved in the current call stack.
    #[error("cycle detected while resolving '{0}'")]
    CycleDetected(String),

    /// A scope-path segment was absent while navigating a tree.
    #[error("scope path segment not found: {0}")]
    NotFound(String),

    /// An element kind the resolver has no rule for; a programming-contract
    /// violation, never swallowed.
    #[error("unexpected element for {0}")]
    Unimplemented(String),

    /// The request owning this resolution was cancelled.
    #[error("evaluation aborted")]
    Aborted,
}

impl ResolveError {
    /// Whether a fallback boundary may catch this failure and try the next
    /// candidate scope/import/inheritance edge.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ResolveError::Unresolved(_)
                | ResolveError::NoReturnInfo(_)
                | ResolveError::NotFound(_)
        )
    }
}

impl From<LibraryError> for ResolveError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Aborted => ResolveError::Aborted,
            LibraryError::NotFound(module) => ResolveError::Unresolved(module),
            // A broken blob file is a miss for this provider, not fatal.
            other => ResolveError::Unresolved(other.to_string()),
        }
    }
}
