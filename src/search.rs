//! Search engine: the query DSL and filtered, grouped views.
//!
//! Grammar: whitespace-separated tokens combined with implicit AND.
//! `tag:<name>` matches the normalized tag set, `type:<kind>` restricts
//! components to a kind, `status:archived` switches the universe to the
//! archive tree, and anything else is a case-insensitive substring match
//! against the display name. Unknown `key:` prefixes fall back to bare
//! keywords.

use crate::component::{normalize_tag, Component, ComponentKind};
use crate::config::Settings;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::store::{Store, Tree};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub tags: Vec<String>,
    pub kind: Option<ComponentKind>,
    pub archived: bool,
    pub keywords: Vec<String>,
}

impl Query {
    pub fn parse(input: &str) -> Query {
        let mut query = Query::default();
        for token in input.split_whitespace() {
            if let Some(tag) = token.strip_prefix("tag:") {
                let tag = normalize_tag(tag);
                if !tag.is_empty() {
                    query.tags.push(tag);
                }
            } else if let Some(kind) = token.strip_prefix("type:") {
                if let Some(kind) = ComponentKind::parse(kind) {
                    query.kind = Some(kind);
                } else {
                    query.keywords.push(token.to_lowercase());
                }
            } else if token.eq_ignore_ascii_case("status:archived") {
                query.archived = true;
            } else {
                query.keywords.push(token.to_lowercase());
            }
        }
        query
    }

    pub fn is_empty(&self) -> bool {
        *self == Query::default()
    }

    /// The universe this query runs over; exclusive, never both.
    pub fn tree(&self) -> Tree {
        if self.archived {
            Tree::Archive
        } else {
            Tree::Live
        }
    }

    fn matches_component(&self, c: &Component) -> bool {
        if let Some(kind) = self.kind {
            if c.kind != kind {
                return false;
            }
        }
        if !self.tags.iter().all(|t| c.tags.contains(t)) {
            return false;
        }
        let name = c.display_name.to_lowercase();
        self.keywords.iter().all(|k| name.contains(k))
    }

    fn matches_pipeline(&self, p: &Pipeline) -> bool {
        // `type:` restricts components; pipelines are excluded outright.
        if self.kind.is_some() {
            return false;
        }
        if !self.tags.iter().all(|t| p.tags.contains(t)) {
            return false;
        }
        let name = p.name.to_lowercase();
        self.keywords.iter().all(|k| name.contains(k))
    }
}

/// Filtered views over one tree, in the global ordering: components
/// grouped by the configured section order then filename; pipelines by
/// filename.
#[derive(Debug, Default)]
pub struct SearchResults {
    pub components: Vec<Component>,
    pub pipelines: Vec<Pipeline>,
}

pub fn run(store: &Store, settings: &Settings, query: &Query) -> Result<SearchResults> {
    let tree = query.tree();
    let mut components: Vec<Component> = store
        .list_components(tree, None)?
        .into_iter()
        .filter(|c| query.matches_component(c))
        .collect();
    components.sort_by(|a, b| {
        settings
            .kind_position(a.kind)
            .cmp(&settings.kind_position(b.kind))
            .then_with(|| a.path.cmp(&b.path))
    });

    let pipelines: Vec<Pipeline> = store
        .list_pipelines(tree)?
        .into_iter()
        .filter(|p| query.matches_pipeline(p))
        .collect();

    Ok(SearchResults {
        components,
        pipelines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::empty_project;
    use crate::store::{component_rel, pipeline_rel};

    fn seed(store: &Store) {
        store
            .write_component(
                &component_rel(Tree::Live, ComponentKind::Prompt, "a.md"),
                "# A\n",
                &["ui".to_string()],
                None,
            )
            .unwrap();
        store
            .write_component(
                &component_rel(Tree::Live, ComponentKind::Context, "b.md"),
                "# Api Notes\n",
                &["api".to_string()],
                None,
            )
            .unwrap();
    }

    #[test]
    fn test_parse_grammar() {
        let q = Query::parse("tag:UI type:prompts status:archived fix");
        assert_eq!(q.tags, vec!["ui"]);
        assert_eq!(q.kind, Some(ComponentKind::Prompt));
        assert!(q.archived);
        assert_eq!(q.keywords, vec!["fix"]);

        let q = Query::parse("type:bogus");
        assert_eq!(q.kind, None);
        assert_eq!(q.keywords, vec!["type:bogus"]);
    }

    #[test]
    fn test_seed_scenario_dsl() {
        let (_dir, store) = empty_project();
        seed(&store);
        let settings = Settings::default();

        let r = run(&store, &settings, &Query::parse("tag:ui type:prompts")).unwrap();
        assert_eq!(r.components.len(), 1);
        assert_eq!(r.components[0].slug(), "a");

        let r = run(&store, &settings, &Query::parse("api")).unwrap();
        assert_eq!(r.components.len(), 1);
        assert_eq!(r.components[0].slug(), "b");

        let r = run(&store, &settings, &Query::parse("status:archived")).unwrap();
        assert!(r.components.is_empty());
        assert!(r.pipelines.is_empty());
    }

    #[test]
    fn test_empty_query_returns_live_universe() {
        let (_dir, store) = empty_project();
        seed(&store);
        store
            .write_component(
                &component_rel(Tree::Archive, ComponentKind::Prompt, "old.md"),
                "# Old\n",
                &[],
                None,
            )
            .unwrap();
        let r = run(&store, &Settings::default(), &Query::parse("")).unwrap();
        assert_eq!(r.components.len(), 2);
        assert!(r.components.iter().all(|c| !c.archived));
    }

    #[test]
    fn test_archived_universe_is_exclusive() {
        let (_dir, store) = empty_project();
        seed(&store);
        store
            .write_component(
                &component_rel(Tree::Archive, ComponentKind::Prompt, "old.md"),
                "# Old Prompt\n",
                &["ui".to_string()],
                None,
            )
            .unwrap();
        let r = run(&store, &Settings::default(), &Query::parse("status:archived tag:ui")).unwrap();
        assert_eq!(r.components.len(), 1);
        assert_eq!(r.components[0].slug(), "old");
        assert!(r.components[0].archived);
    }

    #[test]
    fn test_grouping_follows_section_order() {
        let (_dir, store) = empty_project();
        seed(&store);
        // Default layout: rules, contexts, prompts.
        let r = run(&store, &Settings::default(), &Query::parse("")).unwrap();
        let kinds: Vec<ComponentKind> = r.components.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ComponentKind::Context, ComponentKind::Prompt]);
    }

    #[test]
    fn test_pipelines_filter_by_tag_and_name() {
        let (_dir, store) = empty_project();
        let mut p = Pipeline::new("Release Flow");
        p.path = pipeline_rel(Tree::Live, "release.yaml");
        p.tags = vec!["docs".to_string()];
        store.write_pipeline(&p).unwrap();

        let settings = Settings::default();
        let r = run(&store, &settings, &Query::parse("tag:docs")).unwrap();
        assert_eq!(r.pipelines.len(), 1);
        let r = run(&store, &settings, &Query::parse("release")).unwrap();
        assert_eq!(r.pipelines.len(), 1);
        let r = run(&store, &settings, &Query::parse("tag:other")).unwrap();
        assert!(r.pipelines.is_empty());
        // A type: restriction excludes pipelines from the result.
        let r = run(&store, &settings, &Query::parse("type:prompts")).unwrap();
        assert!(r.pipelines.is_empty());
    }
}
