//! Pluqqy - terminal-first composer for prompt pipelines
//!
//! Build agent prompt files from reusable markdown fragments: contexts,
//! prompts, and rules live as files in a project directory, pipelines
//! compose them into a single output artifact.
//!
//! # Project layout
//!
//! | Path | Contents |
//! |------|----------|
//! | `components/{contexts,prompts,rules}/` | markdown fragments |
//! | `pipelines/` | YAML pipeline descriptors |
//! | `archive/` | parallel tree of soft-deleted files |
//! | `tags.yaml` | shared tag registry |
//! | `settings.yaml` | section layout, default output path |
//! | `PLUQQY.md` | default composed output |
//!
//! # Quick Start
//!
//! ```no_run
//! use pluqqy::store::{component_rel, pipeline_rel, Store, Tree};
//! use pluqqy::component::ComponentKind;
//! use pluqqy::pipeline::{ComponentRef, Pipeline};
//! use pluqqy::config::Settings;
//!
//! let store = Store::open(".").unwrap();
//! let settings = Settings::load(store.root()).unwrap();
//!
//! // Write a component and compose a pipeline that uses it.
//! let rel = component_rel(Tree::Live, ComponentKind::Prompt, "greet.md");
//! store.write_component(&rel, "Say hello.\n", &[], None).unwrap();
//!
//! let mut pipeline = Pipeline::new("Greeter");
//! pipeline.path = pipeline_rel(Tree::Live, "greeter.yaml");
//! pipeline.components.push(ComponentRef::new(ComponentKind::Prompt, "greet"));
//! store.write_pipeline(&pipeline).unwrap();
//!
//! let written = pluqqy::compose::set_pipeline(&store, &settings, &pipeline).unwrap();
//! println!("wrote {}", written);
//! ```

pub mod archive;
pub mod component;
pub mod compose;
pub mod config;
pub mod error;
pub mod init;
pub mod pipeline;
pub mod rename;
pub mod search;
pub mod store;
pub mod tags;
pub mod tui;

pub use component::{Component, ComponentKind};
pub use config::Settings;
pub use error::{Error, Result};
pub use pipeline::{ComponentRef, Pipeline};
pub use store::{Store, Tree};
pub use tags::{TagEntry, TagRegistry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify core types are re-exported from crate root
        let _ = compose::CHARS_PER_TOKEN;
        let _ = ComponentKind::ALL;
    }
}
