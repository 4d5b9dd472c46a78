//! Tag registry: the shared namespace of named, colored tags.
//!
//! The registry file (`tags.yaml`) is owned exclusively by this module.
//! Usage counts are always derived by scanning both trees, never stored;
//! entries are created lazily on first use and garbage-collected on last
//! unuse by [`cleanup_orphans`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::component::{self, normalize_tag};
use crate::error::{Error, Result};
use crate::store::{write_atomic_abs, Store, Tree, TAGS_FILE};

/// Deterministic per-name palette. `#RRGGBB`, picked by name hash so a
/// tag keeps its color across machines without storing anything.
const PALETTE: [&str; 12] = [
    "#e06c75", "#d19a66", "#e5c07b", "#98c379", "#56b6c2", "#61afef",
    "#c678dd", "#be5046", "#7f848e", "#2bbac5", "#89ca78", "#ef596f",
];

/// One registry entry. Usage is derived, not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: String,
    pub color: String,
}

/// Derived usage of a tag across both trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagUsage {
    pub component_count: usize,
    pub pipeline_count: usize,
}

impl TagUsage {
    pub fn total(self) -> usize {
        self.component_count + self.pipeline_count
    }
}

/// FNV-1a over the normalized name; stable across runs by construction.
fn name_hash(name: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// The color a new entry for `name` gets.
pub fn color_for(name: &str) -> &'static str {
    PALETTE[(name_hash(name) % PALETTE.len() as u64) as usize]
}

#[derive(Debug, Clone)]
pub struct TagRegistry {
    path: PathBuf,
    entries: Vec<TagEntry>,
}

impl TagRegistry {
    /// Load from `<root>/tags.yaml`; a missing file is an empty registry.
    pub fn load(root: &Path) -> Result<TagRegistry> {
        let path = root.join(TAGS_FILE);
        let entries = if path.exists() {
            let raw =
                std::fs::read_to_string(&path).map_err(|e| Error::io("read", &path, e))?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_yaml::from_str(&raw).map_err(|e| Error::malformed(&path, e.to_string()))?
            }
        } else {
            Vec::new()
        };
        let mut registry = TagRegistry { path, entries };
        registry.sort();
        Ok(registry)
    }

    pub fn save(&self) -> Result<()> {
        let raw = serde_yaml::to_string(&self.entries)
            .map_err(|e| Error::malformed(&self.path, e.to_string()))?;
        write_atomic_abs(&self.path, &raw)
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub fn list(&self) -> &[TagEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TagEntry> {
        let name = normalize_tag(name);
        self.entries.iter().find(|e| e.name == name)
    }

    /// Idempotent: creates the entry with a deterministic color when it
    /// does not exist yet. Returns the normalized name.
    pub fn ensure(&mut self, name: &str) -> String {
        let name = normalize_tag(name);
        if !name.is_empty() && self.get(&name).is_none() {
            self.entries.push(TagEntry {
                color: color_for(&name).to_string(),
                name: name.clone(),
            });
            self.sort();
        }
        name
    }

    pub fn remove(&mut self, name: &str) {
        let name = normalize_tag(name);
        self.entries.retain(|e| e.name != name);
    }
}

/// Count usage of a tag by scanning both trees.
pub fn count_usage(store: &Store, name: &str) -> Result<TagUsage> {
    let name = normalize_tag(name);
    let mut usage = TagUsage::default();
    for tree in [Tree::Live, Tree::Archive] {
        for c in store.list_components(tree, None)? {
            if c.tags.iter().any(|t| *t == name) {
                usage.component_count += 1;
            }
        }
        for p in store.list_pipelines(tree)? {
            if p.tags.iter().any(|t| *t == name) {
                usage.pipeline_count += 1;
            }
        }
    }
    Ok(usage)
}

/// Remove candidate entries that no longer appear anywhere. Safe to run
/// after any delete or archive: usage is re-counted here, so a candidate
/// that regained a user in the meantime survives. Returns the names
/// actually removed. Idempotent.
pub fn cleanup_orphans(
    store: &Store,
    registry: &mut TagRegistry,
    candidates: &[String],
) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for candidate in candidates {
        let name = normalize_tag(candidate);
        if registry.get(&name).is_none() {
            continue;
        }
        if count_usage(store, &name)?.total() == 0 {
            registry.remove(&name);
            removed.push(name);
        }
    }
    if !removed.is_empty() {
        registry.save()?;
    }
    Ok(removed)
}

/// Collect registry entries present in any file, creating missing ones;
/// the offline reconciliation path for a registry that drifted. Checks
/// `cancelled` between files and returns `Cancelled` when set.
pub fn rebuild_registry(
    store: &Store,
    registry: &mut TagRegistry,
    cancelled: &std::sync::atomic::AtomicBool,
) -> Result<usize> {
    use std::sync::atomic::Ordering;
    let mut added = 0usize;
    for tree in [Tree::Live, Tree::Archive] {
        for c in store.list_components(tree, None)? {
            if cancelled.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            for tag in &c.tags {
                if registry.get(tag).is_none() {
                    registry.ensure(tag);
                    added += 1;
                }
            }
        }
        for p in store.list_pipelines(tree)? {
            if cancelled.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            for tag in &p.tags {
                if registry.get(tag).is_none() {
                    registry.ensure(tag);
                    added += 1;
                }
            }
        }
    }
    registry.save()?;
    Ok(added)
}

/// Outcome of a deletion sweep: every file processed, with per-file
/// failures recorded rather than aborting the sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub processed: usize,
    pub failed: Vec<(String, String)>,
}

/// Remove `name` from every component and pipeline that carries it, in
/// both trees, then drop the registry entry. Progress is emitted as
/// `(current_file, done, total)` over the affected files only, which are
/// enumerated up front in deterministic order (components before
/// pipelines, live before archive, filename ascending within a kind).
pub fn delete_tag_everywhere(
    store: &Store,
    registry: &mut TagRegistry,
    name: &str,
    mut progress: impl FnMut(&str, usize, usize),
) -> Result<SweepReport> {
    let name = normalize_tag(name);

    // Enumerate first so totals are stable while we mutate.
    let mut component_paths = Vec::new();
    let mut pipeline_paths = Vec::new();
    for tree in [Tree::Live, Tree::Archive] {
        for c in store.list_components(tree, None)? {
            if c.tags.iter().any(|t| *t == name) {
                component_paths.push(c.path);
            }
        }
        for p in store.list_pipelines(tree)? {
            if p.tags.iter().any(|t| *t == name) {
                pipeline_paths.push(p.path);
            }
        }
    }

    let total = component_paths.len() + pipeline_paths.len();
    let mut report = SweepReport::default();

    for rel in &component_paths {
        let outcome = strip_tag_from_component(store, rel, &name);
        report.processed += 1;
        if let Err(e) = outcome {
            report.failed.push((rel.clone(), e.to_string()));
        }
        progress(rel, report.processed, total);
    }
    for rel in &pipeline_paths {
        let outcome = strip_tag_from_pipeline(store, rel, &name);
        report.processed += 1;
        if let Err(e) = outcome {
            report.failed.push((rel.clone(), e.to_string()));
        }
        progress(rel, report.processed, total);
    }

    // The entry goes even when some files failed; rerunning the sweep
    // after fixing the failures reconciles the leftovers.
    registry.remove(&name);
    registry.save()?;
    Ok(report)
}

fn strip_tag_from_component(store: &Store, rel: &str, name: &str) -> Result<()> {
    let raw = store.read_raw(rel)?;
    let (mut front, body) = component::parse_front_matter(&raw)
        .map_err(|reason| Error::malformed(rel, reason))?;
    front.tags.retain(|t| t != name);
    store.write_atomic(rel, &component::render_component(&front, body))
}

fn strip_tag_from_pipeline(store: &Store, rel: &str, name: &str) -> Result<()> {
    let mut p = store.read_pipeline(rel)?;
    p.tags.retain(|t| t != name);
    store.write_pipeline(&p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::pipeline::Pipeline;
    use crate::store::test_support::empty_project;
    use crate::store::{component_rel, pipeline_rel};

    #[test]
    fn test_ensure_is_idempotent_and_colored() {
        let (dir, _store) = empty_project();
        let mut reg = TagRegistry::load(dir.path()).unwrap();
        let a = reg.ensure("UI Widgets");
        let b = reg.ensure("ui-widgets");
        assert_eq!(a, "ui-widgets");
        assert_eq!(a, b);
        assert_eq!(reg.list().len(), 1);
        let color = reg.get("ui-widgets").unwrap().color.clone();
        assert_eq!(color, color_for("ui-widgets"));
        assert!(color.starts_with('#'));
    }

    #[test]
    fn test_load_save_round_trip() {
        let (dir, _store) = empty_project();
        let mut reg = TagRegistry::load(dir.path()).unwrap();
        reg.ensure("beta");
        reg.ensure("alpha");
        reg.save().unwrap();
        let again = TagRegistry::load(dir.path()).unwrap();
        let names: Vec<&str> = again.list().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_count_usage_spans_both_trees() {
        let (dir, store) = empty_project();
        store
            .write_component(
                &component_rel(Tree::Live, ComponentKind::Prompt, "a.md"),
                "a",
                &["x".to_string()],
                None,
            )
            .unwrap();
        store
            .write_component(
                &component_rel(Tree::Archive, ComponentKind::Prompt, "b.md"),
                "b",
                &["x".to_string()],
                None,
            )
            .unwrap();
        let mut p = Pipeline::new("P");
        p.path = pipeline_rel(Tree::Live, "p.yaml");
        p.tags = vec!["x".to_string()];
        store.write_pipeline(&p).unwrap();

        let usage = count_usage(&store, "x").unwrap();
        assert_eq!(usage.component_count, 2);
        assert_eq!(usage.pipeline_count, 1);
        let _ = dir;
    }

    #[test]
    fn test_delete_tag_everywhere_seed_scenario() {
        let (dir, store) = empty_project();
        // Three files carry "x" plus other tags.
        store
            .write_component(
                &component_rel(Tree::Live, ComponentKind::Context, "f1.md"),
                "f1",
                &["x".to_string(), "keep".to_string()],
                None,
            )
            .unwrap();
        store
            .write_component(
                &component_rel(Tree::Live, ComponentKind::Prompt, "f2.md"),
                "f2",
                &["other".to_string(), "x".to_string()],
                None,
            )
            .unwrap();
        let mut p = Pipeline::new("F3");
        p.path = pipeline_rel(Tree::Live, "f3.yaml");
        p.tags = vec!["x".to_string(), "keep".to_string()];
        store.write_pipeline(&p).unwrap();

        let mut reg = TagRegistry::load(dir.path()).unwrap();
        for t in ["x", "keep", "other"] {
            reg.ensure(t);
        }
        reg.save().unwrap();

        let mut seen = Vec::new();
        let report = delete_tag_everywhere(&store, &mut reg, "x", |file, done, total| {
            seen.push((file.to_string(), done, total));
        })
        .unwrap();

        assert_eq!(report.processed, 3);
        assert!(report.failed.is_empty());
        assert_eq!(
            seen,
            vec![
                ("components/contexts/f1.md".to_string(), 1, 3),
                ("components/prompts/f2.md".to_string(), 2, 3),
                ("pipelines/f3.yaml".to_string(), 3, 3),
            ]
        );

        // No file carries x; other tags intact; registry entry gone.
        let f1 = store
            .read_component(&component_rel(Tree::Live, ComponentKind::Context, "f1.md"))
            .unwrap();
        assert_eq!(f1.tags, vec!["keep"]);
        let f2 = store
            .read_component(&component_rel(Tree::Live, ComponentKind::Prompt, "f2.md"))
            .unwrap();
        assert_eq!(f2.tags, vec!["other"]);
        let f3 = store.read_pipeline(&pipeline_rel(Tree::Live, "f3.yaml")).unwrap();
        assert_eq!(f3.tags, vec!["keep"]);
        assert!(reg.get("x").is_none());
        assert!(reg.get("keep").is_some());
    }

    #[test]
    fn test_cleanup_orphans_respects_reuse() {
        let (dir, store) = empty_project();
        let mut reg = TagRegistry::load(dir.path()).unwrap();
        reg.ensure("t");
        reg.save().unwrap();

        // The component that carried "t" was deleted, then another one
        // picked the tag up before cleanup ran.
        store
            .write_component(
                &component_rel(Tree::Live, ComponentKind::Rules, "readd.md"),
                "r",
                &["t".to_string()],
                None,
            )
            .unwrap();

        let removed = cleanup_orphans(&store, &mut reg, &["t".to_string()]).unwrap();
        assert!(removed.is_empty());
        assert!(reg.get("t").is_some());
    }

    #[test]
    fn test_cleanup_orphans_removes_unused_and_is_idempotent() {
        let (dir, store) = empty_project();
        let mut reg = TagRegistry::load(dir.path()).unwrap();
        reg.ensure("gone");
        reg.save().unwrap();

        let removed = cleanup_orphans(&store, &mut reg, &["gone".to_string()]).unwrap();
        assert_eq!(removed, vec!["gone"]);
        let removed = cleanup_orphans(&store, &mut reg, &["gone".to_string()]).unwrap();
        assert!(removed.is_empty());
        // Every surviving entry has usage >= 1 (there are none).
        assert!(reg.list().is_empty());
        let _ = dir;
    }

    #[test]
    fn test_rebuild_registry_cancellation() {
        use std::sync::atomic::AtomicBool;
        let (dir, store) = empty_project();
        store
            .write_component(
                &component_rel(Tree::Live, ComponentKind::Prompt, "a.md"),
                "a",
                &["fresh".to_string()],
                None,
            )
            .unwrap();
        let mut reg = TagRegistry::load(dir.path()).unwrap();

        let cancelled = AtomicBool::new(true);
        assert!(matches!(
            rebuild_registry(&store, &mut reg, &cancelled),
            Err(Error::Cancelled)
        ));

        let cancelled = AtomicBool::new(false);
        let added = rebuild_registry(&store, &mut reg, &cancelled).unwrap();
        assert_eq!(added, 1);
        assert!(reg.get("fresh").is_some());
    }
}
