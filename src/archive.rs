//! Archive manager: reversible moves between the live and archive trees.
//!
//! Both trees share the same shape, so a move only toggles the
//! `archive/` prefix; the leaf filename and kind subdirectory are
//! preserved and relative references inside pipelines stay valid within
//! their own tree.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::store::{parse_component_rel, parse_pipeline_rel, Store, ARCHIVE_DIR};

/// Validate that `rel` names a component or pipeline file.
fn validate_item(rel: &str) -> Result<()> {
    if parse_component_rel(rel).is_ok() || parse_pipeline_rel(rel).is_ok() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "not a component or pipeline path: {}",
            rel
        )))
    }
}

/// Move a live component or pipeline into the archive tree. Returns the
/// new project-relative path.
pub fn archive(store: &Store, rel: &str) -> Result<String> {
    validate_item(rel)?;
    if rel.starts_with("archive/") {
        return Err(Error::Validation(format!("{} is already archived", rel)));
    }
    let dst_rel = format!("{}/{}", ARCHIVE_DIR, rel);
    move_between_trees(store, rel, &dst_rel)?;
    Ok(dst_rel)
}

/// Move an archived component or pipeline back to the live tree.
pub fn unarchive(store: &Store, rel: &str) -> Result<String> {
    validate_item(rel)?;
    let Some(dst_rel) = rel.strip_prefix("archive/") else {
        return Err(Error::Validation(format!("{} is not archived", rel)));
    };
    let dst_rel = dst_rel.to_string();
    move_between_trees(store, rel, &dst_rel)?;
    Ok(dst_rel)
}

fn move_between_trees(store: &Store, src_rel: &str, dst_rel: &str) -> Result<()> {
    let src = store.abs(src_rel)?;
    let dst = store.abs(dst_rel)?;
    if !src.exists() {
        return Err(Error::NotFound(src));
    }
    if dst.exists() {
        return Err(Error::Validation(format!(
            "{} already exists; remove it before moving",
            dst_rel
        )));
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create dir", parent, e))?;
    }
    move_file(&src, &dst)
}

/// Rename when both paths share a device; otherwise copy then delete,
/// removing the partial destination when the copy fails.
fn move_file(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(_) => {
            if let Err(e) = fs::copy(src, dst) {
                let _ = fs::remove_file(dst);
                return Err(Error::io("copy", src, e));
            }
            fs::remove_file(src).map_err(|e| Error::io("delete", src, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::pipeline::{ComponentRef, Pipeline};
    use crate::store::test_support::empty_project;
    use crate::store::{component_rel, pipeline_rel, Tree};

    #[test]
    fn test_archive_unarchive_round_trip_byte_identical() {
        let (_dir, store) = empty_project();
        let rel = component_rel(Tree::Live, ComponentKind::Prompt, "keep.md");
        store
            .write_component(&rel, "# Keep\n\nbody\n", &["t".to_string()], None)
            .unwrap();
        let before = store.read_raw(&rel).unwrap();

        let archived = archive(&store, &rel).unwrap();
        assert_eq!(archived, "archive/components/prompts/keep.md");
        assert!(!store.exists(&rel));
        assert_eq!(store.read_raw(&archived).unwrap(), before);

        let restored = unarchive(&store, &archived).unwrap();
        assert_eq!(restored, rel);
        assert!(!store.exists(&archived));
        assert_eq!(store.read_raw(&rel).unwrap(), before);
    }

    #[test]
    fn test_archive_pipeline_preserves_references() {
        let (_dir, store) = empty_project();
        let mut p = Pipeline::new("Flow");
        p.path = pipeline_rel(Tree::Live, "flow.yaml");
        p.components
            .push(ComponentRef::new(ComponentKind::Prompt, "foo"));
        store.write_pipeline(&p).unwrap();

        let archived = archive(&store, &p.path).unwrap();
        let read = store.read_pipeline(&archived).unwrap();
        assert!(read.archived);
        // The stored reference text is unchanged; it now resolves against
        // the archive tree.
        assert_eq!(read.components[0].path, "../components/prompts/foo.md");
        assert_eq!(
            read.resolved_refs()[0].1.as_deref(),
            Some("archive/components/prompts/foo.md")
        );
    }

    #[test]
    fn test_double_archive_rejected() {
        let (_dir, store) = empty_project();
        let rel = component_rel(Tree::Live, ComponentKind::Rules, "r.md");
        store.write_component(&rel, "r\n", &[], None).unwrap();
        let archived = archive(&store, &rel).unwrap();
        assert!(archive(&store, &archived).is_err());
        assert!(unarchive(&store, &rel).is_err());
    }

    #[test]
    fn test_archive_missing_is_not_found() {
        let (_dir, store) = empty_project();
        let rel = component_rel(Tree::Live, ComponentKind::Rules, "ghost.md");
        assert!(matches!(archive(&store, &rel), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_archive_collision_rejected() {
        let (_dir, store) = empty_project();
        let live = component_rel(Tree::Live, ComponentKind::Prompt, "dup.md");
        let arch = component_rel(Tree::Archive, ComponentKind::Prompt, "dup.md");
        store.write_component(&live, "live\n", &[], None).unwrap();
        store.write_component(&arch, "old\n", &[], None).unwrap();
        assert!(archive(&store, &live).is_err());
        // Nothing moved, nothing lost.
        assert_eq!(store.read_raw(&live).unwrap(), "live\n");
        assert_eq!(store.read_raw(&arch).unwrap(), "old\n");
    }
}
