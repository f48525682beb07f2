//! Evaluation requests and controllers.
//!
//! An [`EvalRequest`] packages one query — an expression, a starting scope,
//! and what the caller wants back (members, a calltip, or a declaration) —
//! and drives resolution to completion, reporting results and lifecycle
//! through an [`EvalController`]. One request runs single-threaded;
//! concurrent requests share the read-only trees and libraries, and
//! cancellation is per-request through the controller's `is_aborted`.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::base::Abort;
use crate::library::{Library, global_builtin_blob};
use crate::resolve::{Definition, Evaluator, Member, ResolveError};
use crate::tree::{BlobBuilder, Element, ScopeRef};

/// What an evaluation request is asking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    /// Completion members of the resolved element.
    Members,
    /// Call signature of the resolved callable.
    Calltip,
    /// Declaration location of the resolved element.
    Definition,
}

/// Terminal status of an evaluation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalStatus {
    Success,
    Error,
    Aborted,
}

/// Receives the lifecycle and results of one evaluation request.
///
/// `done` is called exactly once per evaluation; on `Error` and `Aborted`
/// no `set_*` call precedes it.
pub trait EvalController: Send + Sync {
    fn start(&self, request: &EvalRequest);
    fn set_members(&self, members: Vec<Member>);
    fn set_calltips(&self, calltips: Vec<String>);
    fn set_definitions(&self, definitions: Vec<Definition>);
    fn error(&self, message: &str);
    fn done(&self, status: EvalStatus);
    fn is_aborted(&self) -> bool {
        false
    }
}

/// Adapts a controller's cancellation flag to the resolver's abort
/// interface.
struct ControllerAbort(Arc<dyn EvalController>);

impl Abort for ControllerAbort {
    fn is_aborted(&self) -> bool {
        self.0.is_aborted()
    }
}

/// One evaluation query, bound to a starting scope.
pub struct EvalRequest {
    pub id: Uuid,
    pub scoperef: ScopeRef,
    pub expr: String,
    pub kind: QueryKind,
}

impl EvalRequest {
    pub fn new(expr: impl Into<String>, scoperef: ScopeRef, kind: QueryKind) -> Self {
        EvalRequest {
            id: Uuid::new_v4(),
            scoperef,
            expr: expr.into(),
            kind,
        }
    }

    /// Run the request against a library priority list, loading the
    /// built-in blob from the lowest-priority library's `"*"` module.
    pub fn evaluate(
        &self,
        libs: Vec<Arc<dyn Library>>,
        buf_path: Option<PathBuf>,
        ctlr: Arc<dyn EvalController>,
    ) {
        let builtin = libs
            .last()
            .and_then(|stdlib| global_builtin_blob(stdlib.as_ref()).ok())
            .unwrap_or_else(|| BlobBuilder::new("*").build());
        self.evaluate_with_builtin(libs, builtin, buf_path, ctlr);
    }

    /// Run the request with an explicitly supplied built-in blob.
    pub fn evaluate_with_builtin(
        &self,
        libs: Vec<Arc<dyn Library>>,
        builtin: Arc<Element>,
        buf_path: Option<PathBuf>,
        ctlr: Arc<dyn EvalController>,
    ) {
        let span = tracing::debug_span!("eval", id = %self.id, expr = %self.expr);
        let _guard = span.enter();
        ctlr.start(self);

        let mut evaluator = Evaluator::new(libs, builtin)
            .with_abort(Arc::new(ControllerAbort(Arc::clone(&ctlr))));
        if let Some(path) = buf_path {
            evaluator = evaluator.with_buf_path(path);
        }

        let defn_only = self.kind == QueryKind::Definition;
        let outcome = evaluator
            .eval_citdl(&self.expr, &self.scoperef, defn_only)
            .and_then(|hit| match self.kind {
                QueryKind::Members => {
                    let members = evaluator.members_from_hit(&hit)?;
                    ctlr.set_members(members);
                    Ok(())
                }
                QueryKind::Calltip => {
                    let calltip = evaluator.calltip_from_hit(&hit)?;
                    ctlr.set_calltips(vec![calltip]);
                    Ok(())
                }
                QueryKind::Definition => {
                    let definition = evaluator.defn_from_hit(&hit)?;
                    ctlr.set_definitions(vec![definition]);
                    Ok(())
                }
            });

        match outcome {
            Ok(()) => ctlr.done(EvalStatus::Success),
            Err(ResolveError::Aborted) => {
                tracing::debug!("evaluation aborted");
                ctlr.done(EvalStatus::Aborted);
            }
            Err(err) => {
                tracing::debug!(error = %err, "evaluation failed");
                ctlr.error(&format!("could not resolve '{}': {err}", self.expr));
                ctlr.done(EvalStatus::Error);
            }
        }
    }
}

#[derive(Default)]
struct Collected {
    members: Vec<Member>,
    calltips: Vec<String>,
    definitions: Vec<Definition>,
    errors: Vec<String>,
    status: Option<EvalStatus>,
}

/// A controller that collects results in memory.
///
/// The default host-side controller; also the conventional test harness.
/// Cancellation is cooperative through the embedded token.
#[derive(Default)]
pub struct CollectingController {
    state: Mutex<Collected>,
    cancel: CancellationToken,
}

impl CollectingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cooperative cancellation of the evaluation using this
    /// controller.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn members(&self) -> Vec<Member> {
        self.state.lock().members.clone()
    }

    pub fn calltips(&self) -> Vec<String> {
        self.state.lock().calltips.clone()
    }

    pub fn definitions(&self) -> Vec<Definition> {
        self.state.lock().definitions.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.state.lock().errors.clone()
    }

    /// The terminal status, once `done` has been called.
    pub fn status(&self) -> Option<EvalStatus> {
        self.state.lock().status
    }
}

impl EvalController for CollectingController {
    fn start(&self, request: &EvalRequest) {
        tracing::debug!(id = %request.id, expr = %request.expr, kind = ?request.kind, "starting");
    }

    fn set_members(&self, members: Vec<Member>) {
        self.state.lock().members = members;
    }

    fn set_calltips(&self, calltips: Vec<String>) {
        self.state.lock().calltips = calltips;
    }

    fn set_definitions(&self, definitions: Vec<Definition>) {
        self.state.lock().definitions = definitions;
    }

    fn error(&self, message: &str) {
        self.state.lock().errors.push(message.to_string());
    }

    fn done(&self, status: EvalStatus) {
        let mut state = self.state.lock();
        debug_assert!(state.status.is_none(), "done called twice");
        state.status = Some(status);
    }

    fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
