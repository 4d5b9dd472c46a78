//! Rename engine: validate, slugify, move, and propagate.
//!
//! Renaming a component rewrites the reference in every pipeline of the
//! *same tree*; a pipeline in the other tree keeps its old reference and
//! is surfaced by [`scan_dangling_refs`] instead. Each pipeline rewrite
//! is atomic on its own; there is no cross-file transaction, so a partial
//! failure reports exactly which pipelines were and weren't updated.

use std::fs;

use crate::component::{self, slugify};
use crate::error::{Error, Result};
use crate::pipeline::{ref_path, resolve_ref};
use crate::store::{
    component_rel, parse_component_rel, parse_pipeline_rel, pipeline_rel, Store, Tree,
};

pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Component,
    Pipeline,
}

/// Outcome of a completed rename.
#[derive(Debug, Clone)]
pub struct RenameSuccess {
    pub item_type: ItemType,
    pub old_name: String,
    pub new_name: String,
    pub archived: bool,
    /// New project-relative path of the renamed file.
    pub new_path: String,
    /// Pipelines whose references were rewritten.
    pub rewritten: Vec<String>,
}

fn validate_display_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("name must not be empty".to_string()));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "name exceeds {} characters",
            MAX_NAME_LEN
        )));
    }
    if slugify(trimmed).is_empty() {
        return Err(Error::Validation(
            "name must contain at least one letter or digit".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Rename a component to a new display name. The slug is derived from the
/// name; a slug equal to the current one is a no-op success (the file is
/// not moved and no references change).
pub fn rename_component(store: &Store, rel: &str, new_display_name: &str) -> Result<RenameSuccess> {
    let new_display_name = validate_display_name(new_display_name)?;
    let (tree, kind, old_file) = parse_component_rel(rel)?;
    let old_slug = component::file_stem(old_file).to_string();
    let new_slug = slugify(&new_display_name);

    let old_component = store.read_component(rel)?;
    let old_name = old_component.display_name.clone();

    let new_rel = component_rel(tree, kind, &format!("{}.md", new_slug));
    if new_slug != old_slug && store.exists(&new_rel) {
        return Err(Error::Validation(format!(
            "a {} named {} already exists",
            kind.label().to_lowercase(),
            new_slug
        )));
    }

    // Discover affected pipelines before touching anything. Only the
    // renamed component's own tree is scanned; the other tree keeps its
    // references and shows up in the reconciliation scan.
    let old_ref = ref_path(kind, &old_slug);
    let new_ref = ref_path(kind, &new_slug);
    let affected: Vec<String> = store
        .list_pipelines(tree)?
        .into_iter()
        .filter(|p| p.components.iter().any(|c| c.path == old_ref))
        .map(|p| p.path)
        .collect();

    if new_slug != old_slug {
        let src = store.abs(rel)?;
        let dst = store.abs(&new_rel)?;
        fs::rename(&src, &dst).map_err(|e| Error::io("rename", &src, e))?;
        update_display_name_field(store, &new_rel, &new_display_name)?;
    } else {
        update_display_name_field(store, rel, &new_display_name)?;
    }

    // Rewrite references; the file move above stands even when a rewrite
    // fails, so the failure carries both lists.
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for ppath in &affected {
        let outcome = rewrite_refs(store, ppath, &old_ref, &new_ref);
        match outcome {
            Ok(()) => succeeded.push(ppath.clone()),
            Err(e) => failed.push((ppath.clone(), e.to_string())),
        }
    }
    if !failed.is_empty() {
        return Err(Error::PartialPropagation { succeeded, failed });
    }

    Ok(RenameSuccess {
        item_type: ItemType::Component,
        old_name,
        new_name: new_display_name,
        archived: tree.is_archive(),
        new_path: new_rel,
        rewritten: succeeded,
    })
}

/// Rename a pipeline. Pipelines are leaves of the reference graph, so no
/// propagation step exists.
pub fn rename_pipeline(store: &Store, rel: &str, new_display_name: &str) -> Result<RenameSuccess> {
    let new_display_name = validate_display_name(new_display_name)?;
    let (tree, old_file) = parse_pipeline_rel(rel)?;
    let old_slug = component::file_stem(old_file).to_string();
    let new_slug = slugify(&new_display_name);

    let mut pipeline = store.read_pipeline(rel)?;
    let old_name = pipeline.name.clone();

    let new_rel = pipeline_rel(tree, &format!("{}.yaml", new_slug));
    if new_slug != old_slug && store.exists(&new_rel) {
        return Err(Error::Validation(format!(
            "a pipeline named {} already exists",
            new_slug
        )));
    }

    if new_slug != old_slug {
        let src = store.abs(rel)?;
        let dst = store.abs(&new_rel)?;
        fs::rename(&src, &dst).map_err(|e| Error::io("rename", &src, e))?;
    }
    pipeline.name = new_display_name.clone();
    pipeline.path = new_rel.clone();
    store.write_pipeline(&pipeline)?;

    Ok(RenameSuccess {
        item_type: ItemType::Pipeline,
        old_name,
        new_name: new_display_name,
        archived: tree.is_archive(),
        new_path: new_rel,
        rewritten: Vec::new(),
    })
}

/// Update the explicit `name:` front-matter key when the file carries
/// one. A component whose display name derives from its heading or
/// filename keeps its bytes, so a rename-back restores the original file
/// exactly.
fn update_display_name_field(store: &Store, rel: &str, new_name: &str) -> Result<()> {
    let raw = store.read_raw(rel)?;
    let (mut front, body) =
        component::parse_front_matter(&raw).map_err(|reason| Error::malformed(rel, reason))?;
    if front.name.is_none() {
        return Ok(());
    }
    front.name = Some(new_name.to_string());
    store.write_atomic(rel, &component::render_component(&front, body))
}

fn rewrite_refs(store: &Store, rel: &str, old_ref: &str, new_ref: &str) -> Result<()> {
    let mut p = store.read_pipeline(rel)?;
    let mut changed = false;
    for c in &mut p.components {
        if c.path == old_ref {
            c.path = new_ref.to_string();
            changed = true;
        }
    }
    if changed {
        store.write_pipeline(&p)?;
    }
    Ok(())
}

/// A pipeline reference that no longer resolves to a file in its tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingRef {
    pub pipeline: String,
    pub reference: String,
}

/// Offline reconciliation: every reference in both trees either resolves
/// to an extant component or lands in this list.
pub fn scan_dangling_refs(store: &Store) -> Result<Vec<DanglingRef>> {
    let mut dangling = Vec::new();
    for tree in [Tree::Live, Tree::Archive] {
        for p in store.list_pipelines(tree)? {
            for c in &p.components {
                let resolved = resolve_ref(p.archived, &c.path);
                let ok = resolved.as_deref().map(|rel| store.exists(rel)).unwrap_or(false);
                if !ok {
                    dangling.push(DanglingRef {
                        pipeline: p.path.clone(),
                        reference: c.path.clone(),
                    });
                }
            }
        }
    }
    Ok(dangling)
}
