//! Scope element sub-kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::base::Flag;

/// The sub-kind of a scope element.
///
/// `Instance` never appears in a scanned tree; it is produced by the
/// resolver when a class/interface/object is called as a constructor. An
/// instance shares the class's members but filters them differently (static
/// methods and the constructor are hidden, instance variables are shown).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ilk {
    Class,
    Function,
    Interface,
    Object,
    Blob,
    Instance,
}

impl Ilk {
    /// The kind tag reported in member lists and declaration records.
    pub fn tag(&self) -> &'static str {
        match self {
            Ilk::Class => "class",
            Ilk::Function => "function",
            Ilk::Interface => "interface",
            Ilk::Object => "object",
            Ilk::Blob => "blob",
            Ilk::Instance => "instance",
        }
    }

    /// Flags that hide a member when listing the members of an element of
    /// this ilk.
    ///
    /// Class scope shows static members and hides instance variables; an
    /// instance shows instance variables and hides statics and the ctor.
    pub fn hidden_flags(&self) -> &'static [Flag] {
        match self {
            Ilk::Class => &[Flag::Hidden, Flag::InstanceVar],
            Ilk::Instance => &[Flag::Hidden, Flag::StaticMethod, Flag::Ctor],
            _ => &[Flag::Hidden],
        }
    }

    /// The inheritance-edge list consulted for elements of this ilk:
    /// classrefs for classes/instances, interfacerefs for interfaces,
    /// objectrefs for objects. Functions and blobs have no inheritance.
    pub fn has_inheritance(&self) -> bool {
        matches!(
            self,
            Ilk::Class | Ilk::Instance | Ilk::Interface | Ilk::Object
        )
    }
}

impl fmt::Display for Ilk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
