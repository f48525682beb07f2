//! Element types: the nodes of a symbol tree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::base::{Flag, Ilk};

/// A node in a symbol tree.
///
/// Scanners produce these; the resolver never mutates them, it only reads
/// them and builds transient [`Hit`](crate::resolve::Hit)s.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Element {
    /// A function/class/interface/object scope, or a blob (file root).
    Scope(ScopeElem),
    /// A variable, possibly carrying a deferred type (citdl) expression.
    Variable(VarElem),
    /// A reference to another module, with optional symbol/alias.
    Import(ImportElem),
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::Scope(s) => &s.name,
            Element::Variable(v) => &v.name,
            // An import is addressed by alias, then symbol, then module.
            Element::Import(i) => i
                .alias
                .as_deref()
                .or(i.symbol.as_deref())
                .unwrap_or(&i.module),
        }
    }

    /// The kind tag reported in member lists and declaration records.
    /// Imports report as `"module"`.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Element::Scope(s) => s.ilk.tag(),
            Element::Variable(_) => "variable",
            Element::Import(_) => "module",
        }
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        match self {
            Element::Scope(s) => s.attributes.contains(&flag),
            Element::Variable(v) => v.attributes.contains(&flag),
            Element::Import(_) => false,
        }
    }

    /// Nested declarations, if this element kind has any.
    pub fn names(&self) -> Option<&IndexMap<Arc<str>, Arc<Element>>> {
        match self {
            Element::Scope(s) => Some(&s.names),
            Element::Variable(v) => Some(&v.names),
            Element::Import(_) => None,
        }
    }

    /// The element's deferred-type expression, if any.
    pub fn citdl(&self) -> Option<&Arc<str>> {
        match self {
            Element::Scope(s) => s.citdl.as_ref(),
            Element::Variable(v) => v.citdl.as_ref(),
            Element::Import(_) => None,
        }
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            Element::Scope(s) => s.doc.as_deref(),
            Element::Variable(v) => v.doc.as_deref(),
            Element::Import(_) => None,
        }
    }

    /// Declaration line (1-based), when the scanner recorded one.
    pub fn line(&self) -> Option<u32> {
        match self {
            Element::Scope(s) => s.line,
            Element::Variable(v) => v.line,
            Element::Import(i) => i.line,
        }
    }

    pub fn as_scope(&self) -> Option<&ScopeElem> {
        match self {
            Element::Scope(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VarElem> {
        match self {
            Element::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_import(&self) -> Option<&ImportElem> {
        match self {
            Element::Import(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, Element::Scope(s) if s.ilk == Ilk::Blob)
    }

    /// Iterate the `Import` children of this element, in declaration order.
    pub fn imports(&self) -> impl Iterator<Item = &ImportElem> {
        self.names()
            .into_iter()
            .flat_map(|names| names.values())
            .filter_map(|child| child.as_import())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Scope(s) => write!(f, "<{} '{}'>", s.ilk, s.name),
            Element::Variable(v) => write!(f, "<variable '{}'>", v.name),
            Element::Import(i) => {
                write!(f, "<import '{}'", i.module)?;
                if let Some(sym) = &i.symbol {
                    write!(f, " symbol '{sym}'")?;
                }
                if let Some(alias) = &i.alias {
                    write!(f, " as '{alias}'")?;
                }
                f.write_str(">")
            }
        }
    }
}

/// A scope element: function, class, interface, object, or blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScopeElem {
    pub name: Arc<str>,
    pub ilk: Ilk,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Recorded signature, rendered verbatim into calltips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Source file path; set on blobs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Nested declarations; insertion order is declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub names: IndexMap<Arc<str>, Arc<Element>>,
    /// Base-class edges, each a deferred CITDL string.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classrefs: Vec<Arc<str>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfacerefs: Vec<Arc<str>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objectrefs: Vec<Arc<str>>,
    /// Return-type histogram (functions): citdl string → observation count.
    /// The resolver picks the entry with the highest count.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<(Arc<str>, u32)>,
    /// Residual deferred type on the scope itself (rare: a function-like
    /// object whose callable type was inferred).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citdl: Option<Arc<str>>,
}

impl ScopeElem {
    /// The inheritance edges consulted for this scope's ilk.
    pub fn refs(&self) -> &[Arc<str>] {
        match self.ilk {
            Ilk::Class | Ilk::Instance => &self.classrefs,
            Ilk::Interface => &self.interfacerefs,
            Ilk::Object => &self.objectrefs,
            _ => &[],
        }
    }

    /// The dominant recorded return type, if any.
    pub fn dominant_return(&self) -> Option<&Arc<str>> {
        self.returns
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(citdl, _)| citdl)
    }

    /// The instance view of this class/interface/object: same members,
    /// instance member filtering. Shallow copy; `names` values stay shared.
    pub fn instance(&self) -> ScopeElem {
        ScopeElem {
            ilk: Ilk::Instance,
            ..self.clone()
        }
    }
}

/// A variable element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VarElem {
    pub name: Arc<str>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Deferred-type expression; absent for literals whose concrete type
    /// the scanner already knew.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citdl: Option<Arc<str>>,
    /// Nested declarations (e.g. closures assigned onto the variable).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub names: IndexMap<Arc<str>, Arc<Element>>,
    /// Module name recorded by the scanner when this variable was assigned
    /// from a dynamic `require("...")` call with a literal argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_module: Option<Arc<str>>,
}

/// An import element.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportElem {
    /// Module name; `/`-separated for sub-module paths, `./`-prefixed for
    /// relative imports.
    pub module: Arc<str>,
    /// Imported symbol; `"*"` means a wildcard import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl ImportElem {
    pub fn new(module: impl Into<Arc<str>>) -> Self {
        ImportElem {
            module: module.into(),
            symbol: None,
            alias: None,
            line: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<Arc<str>>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<Arc<str>>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// The key this import occupies in its parent's `names` map: alias,
    /// then non-wildcard symbol, then module name.
    pub fn local_name(&self) -> Arc<str> {
        if let Some(alias) = &self.alias {
            return Arc::clone(alias);
        }
        if let Some(symbol) = &self.symbol {
            if symbol.as_ref() != "*" {
                return Arc::clone(symbol);
            }
        }
        Arc::clone(&self.module)
    }

    pub fn is_wildcard(&self) -> bool {
        self.symbol.as_deref() == Some("*")
    }

    pub fn is_relative(&self) -> bool {
        self.module.starts_with('.')
    }
}
