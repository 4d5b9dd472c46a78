//! Pipeline model: an ordered composition of component references,
//! materialized as a YAML descriptor under `pipelines/`.
//!
//! References are stored relative to the pipelines directory
//! (`../components/<kind>/<slug>.md`), so a pipeline and the components it
//! names stay resolvable when both move between the live and archive trees
//! together. The sequence order of `components` is the source of truth;
//! `order` is written for human readers only.

use serde::{Deserialize, Serialize};

use crate::component::{self, ComponentKind};

/// A single entry in a pipeline's component sequence. Duplicates are
/// allowed; the same component may appear twice and composes twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    /// Relative to the pipelines directory: `../components/<kind>/<slug>.md`.
    pub path: String,
    /// Informational; regenerated from the sequence position on write.
    #[serde(default)]
    pub order: usize,
}

impl ComponentRef {
    pub fn new(kind: ComponentKind, slug: &str) -> Self {
        ComponentRef {
            kind,
            path: ref_path(kind, slug),
            order: 0,
        }
    }

    /// Filename slug of the referenced component.
    pub fn slug(&self) -> &str {
        component::file_stem(&self.path)
    }
}

/// The sanctioned reference form for a component of `kind` named `slug`.
pub fn ref_path(kind: ComponentKind, slug: &str) -> String {
    format!("../components/{}/{}.md", kind.dir_name(), slug)
}

/// Resolve a reference against the tree the pipeline itself lives in,
/// producing a project-root-relative component path. Returns `None` for
/// anything that is not the sanctioned `../components/...` form.
pub fn resolve_ref(pipeline_archived: bool, reference: &str) -> Option<String> {
    let rest = reference.strip_prefix("../components/")?;
    let (dir, file) = rest.split_once('/')?;
    ComponentKind::parse(dir)?;
    if file.is_empty() || file.contains('/') || !file.ends_with(".md") {
        return None;
    }
    if pipeline_archived {
        Some(format!("archive/components/{}/{}", dir, file))
    } else {
        Some(format!("components/{}/{}", dir, file))
    }
}

/// A pipeline descriptor plus the load context the Store fills in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Overrides the project-wide default composed-output path.
    #[serde(
        rename = "outputPath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_path: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentRef>,
    /// Project-root-relative descriptor path; set by the Store on read.
    #[serde(skip)]
    pub path: String,
    #[serde(skip)]
    pub archived: bool,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Pipeline {
            name: name.into(),
            tags: Vec::new(),
            output_path: None,
            components: Vec::new(),
            path: String::new(),
            archived: false,
        }
    }

    /// Filename slug of the descriptor.
    pub fn slug(&self) -> &str {
        component::file_stem(&self.path)
    }

    /// Regenerate the informational `order` field from sequence position.
    pub fn renumber(&mut self) {
        for (i, c) in self.components.iter_mut().enumerate() {
            c.order = i + 1;
        }
    }

    /// Project-root-relative paths of every referenced component, resolved
    /// against this pipeline's own tree. Unresolvable references yield
    /// `None` entries so callers can flag them.
    pub fn resolved_refs(&self) -> Vec<(usize, Option<String>)> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, c)| (i, resolve_ref(self.archived, &c.path)))
            .collect()
    }
}

/// Parse a descriptor from raw YAML.
pub fn from_raw(raw: &str, path: String, archived: bool) -> Result<Pipeline, String> {
    let mut pipeline: Pipeline = serde_yaml::from_str(raw).map_err(|e| e.to_string())?;
    pipeline.tags = component::normalize_tag_set(&pipeline.tags);
    pipeline.path = path;
    pipeline.archived = archived;
    Ok(pipeline)
}

/// Serialize a descriptor to YAML, renumbering `order` first.
pub fn to_raw(pipeline: &Pipeline) -> Result<String, String> {
    let mut copy = pipeline.clone();
    copy.renumber();
    serde_yaml::to_string(&copy).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
name: Release Notes
tags: [docs]
components:
  - type: prompts
    path: ../components/prompts/summarize.md
    order: 1
  - type: contexts
    path: ../components/contexts/changelog.md
    order: 2
";

    #[test]
    fn test_parse_descriptor() {
        let p = from_raw(SAMPLE, "pipelines/release.yaml".to_string(), false).unwrap();
        assert_eq!(p.name, "Release Notes");
        assert_eq!(p.tags, vec!["docs"]);
        assert_eq!(p.components.len(), 2);
        assert_eq!(p.components[0].kind, ComponentKind::Prompt);
        assert_eq!(p.components[0].slug(), "summarize");
        assert!(p.output_path.is_none());
    }

    #[test]
    fn test_round_trip_preserves_sequence() {
        let p = from_raw(SAMPLE, "pipelines/release.yaml".to_string(), false).unwrap();
        let raw = to_raw(&p).unwrap();
        let again = from_raw(&raw, p.path.clone(), false).unwrap();
        assert_eq!(again.components, p.components);
        assert_eq!(again.name, p.name);
    }

    #[test]
    fn test_duplicates_allowed() {
        let mut p = Pipeline::new("Twice");
        p.components
            .push(ComponentRef::new(ComponentKind::Prompt, "foo"));
        p.components
            .push(ComponentRef::new(ComponentKind::Prompt, "foo"));
        let raw = to_raw(&p).unwrap();
        let again = from_raw(&raw, String::new(), false).unwrap();
        assert_eq!(again.components.len(), 2);
        assert_eq!(again.components[0].order, 1);
        assert_eq!(again.components[1].order, 2);
    }

    #[test]
    fn test_resolve_ref_live_and_archive() {
        assert_eq!(
            resolve_ref(false, "../components/prompts/foo.md").as_deref(),
            Some("components/prompts/foo.md")
        );
        assert_eq!(
            resolve_ref(true, "../components/prompts/foo.md").as_deref(),
            Some("archive/components/prompts/foo.md")
        );
    }

    #[test]
    fn test_resolve_ref_rejects_unsanctioned_forms() {
        assert_eq!(resolve_ref(false, "../../etc/passwd"), None);
        assert_eq!(resolve_ref(false, "../components/widgets/x.md"), None);
        assert_eq!(resolve_ref(false, "../components/prompts/a/b.md"), None);
        assert_eq!(resolve_ref(false, "../components/prompts/x.yaml"), None);
        assert_eq!(resolve_ref(false, "components/prompts/x.md"), None);
    }

    #[test]
    fn test_singular_type_accepted() {
        let raw = "\
name: Legacy
components:
  - type: prompt
    path: ../components/prompts/old.md
";
        let p = from_raw(raw, String::new(), false).unwrap();
        assert_eq!(p.components[0].kind, ComponentKind::Prompt);
    }
}
