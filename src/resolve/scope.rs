//! Scope navigation over symbol trees.

use std::sync::Arc;

use crate::base::Ilk;
use crate::tree::{Element, ScopeRef};

use super::ResolveError;

/// The element a scoperef points at.
///
/// Walks the `names` maps from the blob root along the path; fails with
/// `NotFound` if any segment is absent.
pub fn elem_at(scoperef: &ScopeRef) -> Result<Arc<Element>, ResolveError> {
    let mut elem = Arc::clone(&scoperef.blob);
    for segment in &scoperef.path {
        let child = elem
            .names()
            .and_then(|names| names.get(segment.as_ref()))
            .cloned();
        elem = child.ok_or_else(|| {
            ResolveError::NotFound(format!("'{}' in {}", segment, scoperef))
        })?;
    }
    Ok(elem)
}

/// The lexical parent of a scoperef, given the process-wide built-in blob.
///
/// Drops the last path segment; when the resulting element is a class or
/// instance, drops one more — class-level scope is never a resolution
/// parent, only explicit member access reaches it. At a blob root the
/// parent is the built-in blob; the built-in blob itself is terminal.
pub fn parent_scoperef(
    scoperef: &ScopeRef,
    builtin: &Arc<Element>,
) -> Result<Option<ScopeRef>, ResolveError> {
    if !scoperef.path.is_empty() {
        let mut parent_path = scoperef.path[..scoperef.path.len() - 1].to_vec();
        if !parent_path.is_empty() {
            let parent = elem_at(&ScopeRef::new(
                Arc::clone(&scoperef.blob),
                parent_path.clone(),
            ))?;
            if matches!(
                parent.as_scope().map(|s| s.ilk),
                Some(Ilk::Class) | Some(Ilk::Instance)
            ) {
                parent_path.pop();
            }
        }
        Ok(Some(ScopeRef::new(
            Arc::clone(&scoperef.blob),
            parent_path,
        )))
    } else if Arc::ptr_eq(&scoperef.blob, builtin) {
        Ok(None)
    } else {
        Ok(Some(ScopeRef::root(Arc::clone(builtin))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{BlobBuilder, ScopeBuilder, VarBuilder};

    fn fixture() -> Arc<Element> {
        BlobBuilder::new("mod")
            .child(
                ScopeBuilder::class("Widget")
                    .child(
                        ScopeBuilder::function("render")
                            .child(VarBuilder::new("frame").build())
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    #[test]
    fn elem_at_walks_names_maps() {
        let blob = fixture();
        let scoperef = ScopeRef::new(
            Arc::clone(&blob),
            vec![Arc::from("Widget"), Arc::from("render")],
        );
        let elem = elem_at(&scoperef).unwrap();
        assert_eq!(elem.name(), "render");
    }

    #[test]
    fn elem_at_missing_segment_is_not_found() {
        let blob = fixture();
        let scoperef = ScopeRef::new(Arc::clone(&blob), vec![Arc::from("Gadget")]);
        assert!(matches!(
            elem_at(&scoperef),
            Err(ResolveError::NotFound(_))
        ));
    }

    #[test]
    fn parent_skips_class_scope() {
        let blob = fixture();
        let builtin = BlobBuilder::new("*").build();
        // Inside render: the next resolution parent is the blob root, not
        // the Widget class scope.
        let scoperef = ScopeRef::new(
            Arc::clone(&blob),
            vec![Arc::from("Widget"), Arc::from("render")],
        );
        let parent = parent_scoperef(&scoperef, &builtin).unwrap().unwrap();
        assert!(parent.path.is_empty());
        assert!(Arc::ptr_eq(&parent.blob, &blob));
    }

    #[test]
    fn blob_root_parent_is_builtin_and_builtin_is_terminal() {
        let blob = fixture();
        let builtin = BlobBuilder::new("*").build();
        let root = ScopeRef::root(Arc::clone(&blob));
        let parent = parent_scoperef(&root, &builtin).unwrap().unwrap();
        assert!(Arc::ptr_eq(&parent.blob, &builtin));
        assert!(
            parent_scoperef(&parent, &builtin).unwrap().is_none(),
            "built-in blob must be terminal"
        );
    }
}
