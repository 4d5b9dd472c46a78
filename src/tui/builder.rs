//! Builder state: the pipeline under edit.
//!
//! Two parallel view-models: the *available* list (all components,
//! optionally filtered by the search engine) and the *selected* list
//! (the pipeline's component sequence). The sequence is the source of
//! truth; the selected pane displays it grouped by the configured
//! section order, and cursor operations work in display order.

use crate::component::Component;
use crate::config::Settings;
use crate::pipeline::{ComponentRef, Pipeline};
use crate::tui::state;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    Available,
    Selected,
}

#[derive(Debug)]
pub struct BuilderState {
    pub name: String,
    /// Descriptor path of an existing pipeline; `None` until first save.
    pub pipeline_path: Option<String>,
    pub output_path: Option<String>,
    pub tags: Vec<String>,
    pub selected: Vec<ComponentRef>,
    /// Snapshot taken at load, for unsaved-change tracking.
    original: Vec<ComponentRef>,
    pub available: Vec<Component>,
    pub filter: String,
    pub filtering: bool,
    pub focus: PaneFocus,
    pub left_cursor: usize,
    pub right_cursor: usize,
    pub preview_scroll: usize,
}

impl BuilderState {
    pub fn for_new(name: impl Into<String>) -> Self {
        BuilderState {
            name: name.into(),
            pipeline_path: None,
            output_path: None,
            tags: Vec::new(),
            selected: Vec::new(),
            original: Vec::new(),
            available: Vec::new(),
            filter: String::new(),
            filtering: false,
            focus: PaneFocus::Available,
            left_cursor: 0,
            right_cursor: 0,
            preview_scroll: 0,
        }
    }

    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        BuilderState {
            name: pipeline.name.clone(),
            pipeline_path: Some(pipeline.path.clone()),
            output_path: pipeline.output_path.clone(),
            tags: pipeline.tags.clone(),
            selected: pipeline.components.clone(),
            original: pipeline.components.clone(),
            ..BuilderState::for_new("")
        }
    }

    /// Replace the available list (already filtered and grouped by the
    /// search engine), keeping the cursor in bounds.
    pub fn set_available(&mut self, components: Vec<Component>) {
        self.available = components;
        self.left_cursor = state::clamp_selection(self.left_cursor, self.available.len());
    }

    /// The sequence differs from the load-time snapshot.
    pub fn is_dirty(&self) -> bool {
        self.selected != self.original
    }

    pub fn mark_saved(&mut self) {
        self.original = self.selected.clone();
    }

    /// Indices into `selected`, in display order: grouped by the section
    /// layout's kind order, stable within a group (sequence order).
    pub fn display_order(&self, settings: &Settings) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.selected.len()).collect();
        order.sort_by_key(|&i| (settings.kind_position(self.selected[i].kind), i));
        order
    }

    /// Sequence index of the entry under the right cursor.
    pub fn selected_seq_index(&self, settings: &Settings) -> Option<usize> {
        self.display_order(settings).get(self.right_cursor).copied()
    }

    /// Append the component under the left cursor to the sequence.
    /// Duplicates are allowed; the cursor follows the new entry.
    pub fn add_current(&mut self, settings: &Settings) -> bool {
        let Some(component) = self.available.get(self.left_cursor) else {
            return false;
        };
        let reference = ComponentRef::new(component.kind, component.slug());
        self.selected.push(reference);
        let seq_index = self.selected.len() - 1;
        let order = self.display_order(settings);
        self.right_cursor = order.iter().position(|&i| i == seq_index).unwrap_or(0);
        true
    }

    /// Remove the entry under the right cursor. The cursor moves to the
    /// prior display entry when possible and is always clamped in bounds.
    pub fn remove_current(&mut self, settings: &Settings) -> bool {
        let order = self.display_order(settings);
        let Some(&seq_index) = order.get(self.right_cursor) else {
            return false;
        };
        self.selected.remove(seq_index);
        self.right_cursor = state::cursor_after_remove(self.right_cursor, self.selected.len());
        true
    }

    /// Swap the entry under the right cursor with its display-order
    /// neighbor above, inside the underlying sequence. The cursor follows
    /// the moved entry; a swap may cross a group boundary, in which case
    /// only the sequence changes while groups keep their members.
    pub fn move_current_up(&mut self, settings: &Settings) -> bool {
        if self.right_cursor == 0 {
            return false;
        }
        let order = self.display_order(settings);
        let (Some(&here), Some(&above)) =
            (order.get(self.right_cursor), order.get(self.right_cursor - 1))
        else {
            return false;
        };
        self.selected.swap(here, above);
        self.right_cursor -= 1;
        true
    }

    pub fn move_current_down(&mut self, settings: &Settings) -> bool {
        let order = self.display_order(settings);
        if self.right_cursor + 1 >= order.len() {
            return false;
        }
        let (here, below) = (order[self.right_cursor], order[self.right_cursor + 1]);
        self.selected.swap(here, below);
        self.right_cursor += 1;
        true
    }

    /// Empty the sequence.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.right_cursor = 0;
    }

    pub fn move_cursor_up(&mut self) {
        match self.focus {
            PaneFocus::Available => {
                self.left_cursor = state::move_selection_up(self.left_cursor);
            }
            PaneFocus::Selected => {
                self.right_cursor = state::move_selection_up(self.right_cursor);
            }
        }
    }

    pub fn move_cursor_down(&mut self) {
        match self.focus {
            PaneFocus::Available => {
                self.left_cursor =
                    state::move_selection_down(self.left_cursor, self.available.len());
            }
            PaneFocus::Selected => {
                self.right_cursor =
                    state::move_selection_down(self.right_cursor, self.selected.len());
            }
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            PaneFocus::Available => PaneFocus::Selected,
            PaneFocus::Selected => PaneFocus::Available,
        };
    }

    /// Materialize the edited state as a descriptor. The caller decides
    /// the path for new pipelines.
    pub fn to_pipeline(&self, path: String) -> Pipeline {
        let mut p = Pipeline::new(self.name.clone());
        p.path = path;
        p.tags = self.tags.clone();
        p.output_path = self.output_path.clone();
        p.components = self.selected.clone();
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::config::Section;

    fn settings() -> Settings {
        Settings {
            output_path: "PLUQQY.md".to_string(),
            sections: vec![
                Section::new(ComponentKind::Prompt, "## Prompts"),
                Section::new(ComponentKind::Context, "## Contexts"),
            ],
        }
    }

    fn builder_with(refs: &[(ComponentKind, &str)]) -> BuilderState {
        let mut b = BuilderState::for_new("Test");
        for (kind, slug) in refs {
            b.selected.push(ComponentRef::new(*kind, slug));
        }
        b.mark_saved();
        b
    }

    #[test]
    fn test_builder_bounds_seed_scenario() {
        let settings = settings();
        let mut b = builder_with(&[
            (ComponentKind::Prompt, "a"),
            (ComponentKind::Prompt, "b"),
            (ComponentKind::Prompt, "c"),
        ]);
        b.focus = PaneFocus::Selected;
        b.right_cursor = 2;

        assert!(b.remove_current(&settings));
        assert_eq!(b.selected.len(), 2);
        assert_eq!(b.right_cursor, 1);

        assert!(b.remove_current(&settings));
        assert_eq!(b.selected.len(), 1);
        assert_eq!(b.right_cursor, 0);

        assert!(b.remove_current(&settings));
        assert!(b.selected.is_empty());
        assert_eq!(b.right_cursor, 0);

        // Navigation is a no-op on the empty list.
        b.move_cursor_down();
        b.move_cursor_up();
        assert_eq!(b.right_cursor, 0);
        assert!(!b.remove_current(&settings));
        assert!(!b.move_current_up(&settings));
        assert!(!b.move_current_down(&settings));
    }

    #[test]
    fn test_display_order_groups_by_section() {
        let settings = settings();
        // Sequence interleaves kinds; display groups prompts before
        // contexts per the layout, stable within each group.
        let b = builder_with(&[
            (ComponentKind::Context, "c1"),
            (ComponentKind::Prompt, "p1"),
            (ComponentKind::Context, "c2"),
            (ComponentKind::Prompt, "p2"),
        ]);
        assert_eq!(b.display_order(&settings), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_move_within_group_swaps_sequence() {
        let settings = settings();
        let mut b = builder_with(&[
            (ComponentKind::Prompt, "p1"),
            (ComponentKind::Prompt, "p2"),
        ]);
        b.right_cursor = 1;
        assert!(b.move_current_up(&settings));
        assert_eq!(b.right_cursor, 0);
        let slugs: Vec<&str> = b.selected.iter().map(|c| c.slug()).collect();
        assert_eq!(slugs, vec!["p2", "p1"]);
    }

    #[test]
    fn test_move_across_group_boundary_keeps_groups() {
        let settings = settings();
        // Display order: p1 (seq 1), c1 (seq 0).
        let mut b = builder_with(&[
            (ComponentKind::Context, "c1"),
            (ComponentKind::Prompt, "p1"),
        ]);
        b.right_cursor = 1; // on c1
        assert!(b.move_current_up(&settings));
        // The sequence swapped, groups did not: display still shows the
        // prompt group first, cursor crossed onto the neighbor position.
        let slugs: Vec<&str> = b.selected.iter().map(|c| c.slug()).collect();
        assert_eq!(slugs, vec!["p1", "c1"]);
        assert_eq!(b.display_order(&settings), vec![0, 1]);
        assert_eq!(b.right_cursor, 0);
    }

    #[test]
    fn test_add_allows_duplicates_and_tracks_cursor() {
        let settings = settings();
        let mut b = BuilderState::for_new("Dup");
        b.set_available(vec![Component {
            kind: ComponentKind::Prompt,
            path: "components/prompts/p.md".to_string(),
            display_name: "P".to_string(),
            content: String::new(),
            tags: Vec::new(),
            archived: false,
            last_modified: None,
            token_count: 0,
        }]);
        assert!(b.add_current(&settings));
        assert!(b.add_current(&settings));
        assert_eq!(b.selected.len(), 2);
        assert_eq!(b.right_cursor, 1);
        assert!(b.is_dirty());
    }

    #[test]
    fn test_dirty_tracking_round_trip() {
        let settings = settings();
        let mut b = builder_with(&[
            (ComponentKind::Prompt, "p1"),
            (ComponentKind::Prompt, "p2"),
        ]);
        assert!(!b.is_dirty());
        b.right_cursor = 1;
        b.move_current_up(&settings);
        assert!(b.is_dirty());
        // Moving back restores the snapshot sequence.
        b.move_current_down(&settings);
        assert!(!b.is_dirty());
        b.clear();
        assert!(b.is_dirty());
    }

    #[test]
    fn test_to_pipeline_carries_metadata() {
        let mut b = builder_with(&[(ComponentKind::Prompt, "p1")]);
        b.name = "Named".to_string();
        b.tags = vec!["docs".to_string()];
        b.output_path = Some("out.md".to_string());
        let p = b.to_pipeline("pipelines/named.yaml".to_string());
        assert_eq!(p.name, "Named");
        assert_eq!(p.tags, vec!["docs"]);
        assert_eq!(p.output_path.as_deref(), Some("out.md"));
        assert_eq!(p.components.len(), 1);
    }
}
