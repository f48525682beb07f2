//! Cooperative cancellation.

use tokio_util::sync::CancellationToken;

/// Polled at each recursive resolution boundary and by directory-scanning
/// libraries. Cancellation is per-request; it never affects other in-flight
/// requests or shared libraries.
pub trait Abort: Send + Sync {
    fn is_aborted(&self) -> bool;
}

impl Abort for CancellationToken {
    fn is_aborted(&self) -> bool {
        self.is_cancelled()
    }
}

/// An [`Abort`] that never fires. For callers without a cancellation path.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverAborted;

impl Abort for NeverAborted {
    fn is_aborted(&self) -> bool {
        false
    }
}
