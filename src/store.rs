//! On-disk store: the two-tree project layout and atomic file access.
//!
//! The Store is the only owner of component and pipeline files. All paths
//! exchanged with it are project-root-relative strings with forward
//! slashes (`components/prompts/foo.md`, `archive/pipelines/a.yaml`);
//! they are validated before any filesystem call. Every write is atomic
//! per file (write a tmp sibling, then rename); there is no multi-file
//! transaction.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::component::{self, Component, ComponentKind, FrontMatter};
use crate::error::{Error, Result};
use crate::pipeline::{self, Pipeline};

pub const TAGS_FILE: &str = "tags.yaml";
pub const ARCHIVE_DIR: &str = "archive";

/// Which of the two parallel subtrees a file lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tree {
    Live,
    Archive,
}

impl Tree {
    pub fn is_archive(self) -> bool {
        matches!(self, Tree::Archive)
    }

    fn prefix(self) -> &'static str {
        match self {
            Tree::Live => "",
            Tree::Archive => "archive/",
        }
    }
}

/// Project-root-relative path of a component file.
pub fn component_rel(tree: Tree, kind: ComponentKind, filename: &str) -> String {
    format!("{}components/{}/{}", tree.prefix(), kind.dir_name(), filename)
}

/// Project-root-relative path of a pipeline descriptor.
pub fn pipeline_rel(tree: Tree, filename: &str) -> String {
    format!("{}pipelines/{}", tree.prefix(), filename)
}

/// Decompose a component path into (tree, kind, filename).
pub fn parse_component_rel(rel: &str) -> Result<(Tree, ComponentKind, &str)> {
    let (tree, rest) = match rel.strip_prefix("archive/") {
        Some(rest) => (Tree::Archive, rest),
        None => (Tree::Live, rel),
    };
    let rest = rest
        .strip_prefix("components/")
        .ok_or_else(|| Error::Validation(format!("not a component path: {}", rel)))?;
    let (dir, file) = rest
        .split_once('/')
        .ok_or_else(|| Error::Validation(format!("not a component path: {}", rel)))?;
    let kind = ComponentKind::parse(dir)
        .ok_or_else(|| Error::Validation(format!("unknown component kind in {}", rel)))?;
    if file.is_empty() || file.contains('/') || !file.ends_with(".md") {
        return Err(Error::Validation(format!("not a component file: {}", rel)));
    }
    Ok((tree, kind, file))
}

/// Decompose a pipeline path into (tree, filename).
pub fn parse_pipeline_rel(rel: &str) -> Result<(Tree, &str)> {
    let (tree, rest) = match rel.strip_prefix("archive/") {
        Some(rest) => (Tree::Archive, rest),
        None => (Tree::Live, rel),
    };
    let file = rest
        .strip_prefix("pipelines/")
        .ok_or_else(|| Error::Validation(format!("not a pipeline path: {}", rel)))?;
    if file.is_empty() || file.contains('/') || !file.ends_with(".yaml") {
        return Err(Error::Validation(format!("not a pipeline file: {}", rel)));
    }
    Ok((tree, file))
}

/// Reject anything that could escape the project tree before it is joined
/// onto the root. Pipeline component *references* use their own sanctioned
/// `../components/...` form, checked in [`pipeline::resolve_ref`].
pub fn validate_rel(rel: &str) -> Result<()> {
    if rel.is_empty() {
        return Err(Error::Validation("empty path".to_string()));
    }
    if rel.starts_with('/') || rel.contains('\\') || rel.contains('\0') {
        return Err(Error::Unsafe(format!("path {:?}", rel)));
    }
    if rel.split('/').any(|seg| seg == ".." || seg == ".") {
        return Err(Error::Unsafe(format!("path traversal in {:?}", rel)));
    }
    Ok(())
}

/// True when a value must not be handed to an external process as an
/// argument. Arguments are always passed as discrete argv tokens, never
/// through a shell, but metacharacters are refused anyway.
pub fn unsafe_for_argv(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| "$`;|&<>(){}[]!*?'\"\n\r\0#~".contains(c) || c.is_whitespace() && c != ' ')
}

/// Handle to a project directory. Cheap to clone; worker threads get
/// their own copy instead of sharing one behind a lock.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open an existing project. Fails with `Validation` when the
    /// directory does not have the expected layout.
    pub fn open(root: impl Into<PathBuf>) -> Result<Store> {
        let root = root.into();
        if !Self::is_project(&root) {
            return Err(Error::Validation(format!(
                "{} is not a pluqqy project (missing components/ or pipelines/)",
                root.display()
            )));
        }
        Ok(Store { root })
    }

    pub fn is_project(root: &Path) -> bool {
        root.join("components").is_dir() && root.join("pipelines").is_dir()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and resolve a project-relative path to an absolute one.
    pub fn abs(&self, rel: &str) -> Result<PathBuf> {
        validate_rel(rel)?;
        Ok(self.root.join(rel))
    }

    // === Components ===

    pub fn read_component(&self, rel: &str) -> Result<Component> {
        let (tree, kind, _) = parse_component_rel(rel)?;
        let path = self.abs(rel)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path))
            }
            Err(e) => return Err(Error::io("read", &path, e)),
        };
        let modified = file_mtime(&path);
        component::from_raw(kind, rel.to_string(), &raw, tree.is_archive(), modified)
            .map_err(|reason| Error::malformed(&path, reason))
    }

    /// Write a component file atomically, preserving the explicit `name:`
    /// key when given and normalizing the tag set.
    pub fn write_component(
        &self,
        rel: &str,
        body: &str,
        tags: &[String],
        name: Option<&str>,
    ) -> Result<()> {
        parse_component_rel(rel)?;
        let front = FrontMatter {
            name: name.map(|n| n.to_string()),
            tags: component::normalize_tag_set(tags),
        };
        let raw = component::render_component(&front, body);
        self.write_atomic(rel, &raw)
    }

    /// All components of a tree, optionally restricted to one kind.
    /// Traversal is deterministic: kinds in declaration order, then
    /// filename ascending. Unreadable or malformed entries are skipped;
    /// readers tolerate partial trees.
    pub fn list_components(
        &self,
        tree: Tree,
        kind: Option<ComponentKind>,
    ) -> Result<Vec<Component>> {
        let kinds: Vec<ComponentKind> = match kind {
            Some(k) => vec![k],
            None => ComponentKind::ALL.to_vec(),
        };
        let mut out = Vec::new();
        for k in kinds {
            let dir = self.root.join(component_rel(tree, k, ""));
            for file in sorted_files(&dir, ".md") {
                let rel = component_rel(tree, k, &file);
                if let Ok(c) = self.read_component(&rel) {
                    out.push(c);
                }
            }
        }
        Ok(out)
    }

    pub fn delete_component(&self, rel: &str) -> Result<()> {
        parse_component_rel(rel)?;
        let path = self.abs(rel)?;
        fs::remove_file(&path).map_err(|e| Error::io("delete", &path, e))
    }

    // === Pipelines ===

    pub fn read_pipeline(&self, rel: &str) -> Result<Pipeline> {
        let (tree, _) = parse_pipeline_rel(rel)?;
        let path = self.abs(rel)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path))
            }
            Err(e) => return Err(Error::io("read", &path, e)),
        };
        pipeline::from_raw(&raw, rel.to_string(), tree.is_archive())
            .map_err(|reason| Error::malformed(&path, reason))
    }

    /// Serialize and atomically write a descriptor to its own path.
    pub fn write_pipeline(&self, p: &Pipeline) -> Result<()> {
        parse_pipeline_rel(&p.path)?;
        let raw = pipeline::to_raw(p)
            .map_err(|reason| Error::malformed(self.root.join(&p.path), reason))?;
        self.write_atomic(&p.path, &raw)
    }

    /// All pipelines of a tree, filename ascending. Skips malformed files.
    pub fn list_pipelines(&self, tree: Tree) -> Result<Vec<Pipeline>> {
        let dir = self.root.join(pipeline_rel(tree, ""));
        let mut out = Vec::new();
        for file in sorted_files(&dir, ".yaml") {
            let rel = pipeline_rel(tree, &file);
            if let Ok(p) = self.read_pipeline(&rel) {
                out.push(p);
            }
        }
        Ok(out)
    }

    pub fn delete_pipeline(&self, rel: &str) -> Result<()> {
        parse_pipeline_rel(rel)?;
        let path = self.abs(rel)?;
        fs::remove_file(&path).map_err(|e| Error::io("delete", &path, e))
    }

    // === Raw access ===

    pub fn read_raw(&self, rel: &str) -> Result<String> {
        let path = self.abs(rel)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(path)),
            Err(e) => Err(Error::io("read", &path, e)),
        }
    }

    /// Atomic per-file write: tmp sibling then rename.
    pub fn write_atomic(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.abs(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io("create dir", parent, e))?;
        }
        write_atomic_abs(&path, contents)
    }

    pub fn exists(&self, rel: &str) -> bool {
        validate_rel(rel).is_ok() && self.root.join(rel).exists()
    }
}

/// Atomic write against an absolute path.
pub fn write_atomic_abs(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Validation(format!("bad file name: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp-{}", file_name, std::process::id()));
    fs::write(&tmp, contents).map_err(|e| Error::io("write", &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        Error::io("rename", path, e)
    })
}

fn file_mtime(path: &Path) -> Option<DateTime<Local>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Local>::from)
}

/// Plain files in `dir` with the given extension, name ascending.
/// A missing directory is an empty listing.
fn sorted_files(dir: &Path, ext: &str) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.ends_with(ext) && !n.starts_with('.'))
        .collect();
    names.sort();
    names
}


#[cfg(test)]
mod tests {
    use super::test_support::empty_project;
    use super::*;

    #[test]
    fn test_open_rejects_non_project() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Store::open(dir.path()).is_err());
    }

    #[test]
    fn test_write_read_component_round_trip() {
        let (_dir, store) = empty_project();
        let rel = component_rel(Tree::Live, ComponentKind::Prompt, "greet.md");
        store
            .write_component(&rel, "# Greet\n\nSay hello.\n", &["ui".to_string()], None)
            .unwrap();
        let c = store.read_component(&rel).unwrap();
        assert_eq!(c.display_name, "Greet");
        assert_eq!(c.tags, vec!["ui"]);
        assert_eq!(c.content, "# Greet\n\nSay hello.\n");
        assert!(!c.archived);
        assert!(c.token_count > 0);
    }

    #[test]
    fn test_read_write_preserves_bytes_without_changes() {
        let (_dir, store) = empty_project();
        let rel = component_rel(Tree::Live, ComponentKind::Context, "env.md");
        store
            .write_component(&rel, "body\n", &["a".to_string(), "b".to_string()], None)
            .unwrap();
        let before = store.read_raw(&rel).unwrap();
        let c = store.read_component(&rel).unwrap();
        store
            .write_component(&rel, &c.content, &c.tags, None)
            .unwrap();
        assert_eq!(store.read_raw(&rel).unwrap(), before);
    }

    #[test]
    fn test_list_components_deterministic_order() {
        let (_dir, store) = empty_project();
        for name in ["zeta.md", "alpha.md", "mid.md"] {
            let rel = component_rel(Tree::Live, ComponentKind::Prompt, name);
            store.write_component(&rel, "x\n", &[], None).unwrap();
        }
        let listed = store
            .list_components(Tree::Live, Some(ComponentKind::Prompt))
            .unwrap();
        let names: Vec<&str> = listed.iter().map(|c| c.slug()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_list_skips_malformed() {
        let (dir, store) = empty_project();
        std::fs::write(
            dir.path().join("components/prompts/bad.md"),
            "---\ntags: {broken\n---\nbody",
        )
        .unwrap();
        let rel = component_rel(Tree::Live, ComponentKind::Prompt, "good.md");
        store.write_component(&rel, "ok\n", &[], None).unwrap();
        let listed = store
            .list_components(Tree::Live, Some(ComponentKind::Prompt))
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug(), "good");
    }

    #[test]
    fn test_validate_rel_rejects_traversal() {
        assert!(validate_rel("components/prompts/a.md").is_ok());
        assert!(validate_rel("../outside.md").is_err());
        assert!(validate_rel("components/../../etc").is_err());
        assert!(validate_rel("/etc/passwd").is_err());
        assert!(validate_rel("").is_err());
    }

    #[test]
    fn test_delete_rejects_escape() {
        let (_dir, store) = empty_project();
        assert!(store.delete_component("../somewhere/x.md").is_err());
        assert!(store.delete_pipeline("pipelines/../tags.yaml").is_err());
    }

    #[test]
    fn test_unsafe_for_argv() {
        assert!(!unsafe_for_argv("vim"));
        assert!(!unsafe_for_argv("code -w"));
        assert!(unsafe_for_argv("vim; rm -rf /"));
        assert!(unsafe_for_argv("$(evil)"));
        assert!(unsafe_for_argv("a`b`"));
        assert!(unsafe_for_argv(""));
    }

    #[test]
    fn test_pipeline_round_trip() {
        let (_dir, store) = empty_project();
        let mut p = Pipeline::new("Alpha");
        p.path = pipeline_rel(Tree::Live, "alpha.yaml");
        p.components
            .push(crate::pipeline::ComponentRef::new(ComponentKind::Prompt, "greet"));
        store.write_pipeline(&p).unwrap();
        let read = store.read_pipeline(&p.path).unwrap();
        assert_eq!(read.name, "Alpha");
        assert_eq!(read.components.len(), 1);
        assert!(!read.archived);
    }

    #[test]
    fn test_missing_component_is_not_found() {
        let (_dir, store) = empty_project();
        let rel = component_rel(Tree::Live, ComponentKind::Rules, "nope.md");
        assert!(matches!(
            store.read_component(&rel),
            Err(Error::NotFound(_))
        ));
    }
}
