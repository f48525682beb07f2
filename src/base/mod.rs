//! Foundation types for the CITDL resolver.
//!
//! This module provides the fundamental vocabulary used throughout the
//! crate:
//! - [`Ilk`] - The sub-kind of a scope element (class, function, blob, ...)
//! - [`Flag`] - Per-element attribute flags (hidden, static-method, ...)
//! - [`Abort`] - Cooperative cancellation polled at resolution boundaries
//!
//! This module has NO dependencies on other citdl modules.

mod cancel;
mod flags;
mod ilk;

pub use cancel::{Abort, NeverAborted};
pub use flags::Flag;
pub use ilk::Ilk;
