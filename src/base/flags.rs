//! Per-element attribute flags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An attribute flag attached to an element by the scanner.
///
/// These drive member visibility filtering and declaration lookup; they are
/// matched explicitly per element kind rather than by string membership
/// checks at call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    /// Never shown in completion lists.
    Hidden,
    /// An instance variable: hidden at class scope, shown on instances.
    InstanceVar,
    /// A static method: shown at class scope, hidden on instances.
    StaticMethod,
    /// The constructor: hidden on instances.
    Ctor,
    /// A declaration-only query should resolve through this element's citdl
    /// rather than stopping at it.
    NoDefn,
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Flag::Hidden => "hidden",
            Flag::InstanceVar => "instance-var",
            Flag::StaticMethod => "static-method",
            Flag::Ctor => "ctor",
            Flag::NoDefn => "no-defn",
        };
        f.write_str(s)
    }
}
