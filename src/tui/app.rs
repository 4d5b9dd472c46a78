//! Application state for the TUI (imperative shell).
//!
//! Owns the Store, the tag registry, and the per-screen states, and runs
//! every side effect. Long tag operations are handed to worker threads
//! that report back through [`WorkerMsg`]; while a sweep is in flight its
//! tag is marked in-progress and further mutations to it are rejected.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::archive;
use crate::component::{normalize_tag_set, ComponentKind};
use crate::compose::{self, ComponentSpan, TokenStatus};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::rename;
use crate::search::{Query, SearchResults};
use crate::store::{self, pipeline_rel, Store, Tree};
use crate::tags::{self, TagRegistry, TagUsage};

use super::builder::BuilderState;
use super::editor::EditorState;
use super::msg::{Task, TaskResult, WorkerMsg};
use super::state;
use super::widgets::file_picker::FilePicker;

/// Which screen owns the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    List,
    Builder,
    Editor,
}

/// A row in the main list: an index into the current search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Pipeline(usize),
    Component(usize),
}

/// What an accepted confirmation does.
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteComponent(String),
    DeletePipeline(String),
    DeleteTag(String),
    DiscardBuilder,
    DiscardEditor,
}

/// Confirmation flows come in two styles with one interpreter: a status
/// line question, or a centered dialog for the scarier operations.
#[derive(Debug, Clone)]
pub enum Confirm {
    Inline {
        message: String,
        destructive: bool,
        action: ConfirmAction,
    },
    Dialog {
        title: String,
        message: String,
        warning: Option<String>,
        destructive: bool,
        action: ConfirmAction,
    },
}

impl Confirm {
    pub fn action(&self) -> &ConfirmAction {
        match self {
            Confirm::Inline { action, .. } | Confirm::Dialog { action, .. } => action,
        }
    }

    pub fn destructive(&self) -> bool {
        match self {
            Confirm::Inline { destructive, .. } | Confirm::Dialog { destructive, .. } => {
                *destructive
            }
        }
    }
}

/// What a submitted input prompt does with its value.
#[derive(Debug, Clone)]
pub enum PromptAction {
    NewPipeline,
    NewComponent(ComponentKind),
    RenameComponent(String),
    RenamePipeline(String),
    EditBuilderName,
    EditBuilderTags,
    EditEditorTags,
}

#[derive(Debug)]
pub struct InputPrompt {
    pub title: String,
    pub value: String,
    pub action: PromptAction,
}

pub struct App {
    pub store: Store,
    pub settings: Settings,
    pub registry: TagRegistry,

    pub screen: Screen,

    // Main list
    pub results: SearchResults,
    pub entries: Vec<Entry>,
    pub list_cursor: usize,
    pub list_scroll: usize,
    pub search_input: String,
    pub searching: bool,

    // Preview pane (list screen)
    pub preview: String,
    pub preview_title: String,
    pub preview_scroll: usize,
    pub preview_tokens: usize,

    // Builder screen
    pub builder: Option<BuilderState>,
    pub builder_preview: String,
    pub builder_spans: Vec<ComponentSpan>,
    pub builder_tokens: usize,

    // Editor screen
    pub editor: Option<EditorState>,
    pub file_picker: Option<FilePicker>,

    // Overlays
    pub confirm: Option<Confirm>,
    pub prompt: Option<InputPrompt>,
    pub show_help: bool,
    pub show_tags: bool,
    pub tags_cursor: usize,
    pub tag_usages: Vec<(String, TagUsage)>,

    // Background work
    worker_tx: Sender<WorkerMsg>,
    worker_rx: Receiver<WorkerMsg>,
    pub in_progress: HashSet<String>,
    pub reload_running: bool,
    reload_cancel: Arc<AtomicBool>,

    // External editor handoff
    pending_editor_file: Option<PathBuf>,

    // Viewport
    pub viewport_width: u16,
    pub viewport_height: u16,

    // Status line
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(root: PathBuf) -> Result<App> {
        let store = Store::open(root)?;
        let settings = Settings::load(store.root())?;
        let registry = TagRegistry::load(store.root())?;
        let (worker_tx, worker_rx) = mpsc::channel();

        let mut app = App {
            store,
            settings,
            registry,
            screen: Screen::List,
            results: SearchResults::default(),
            entries: Vec::new(),
            list_cursor: 0,
            list_scroll: 0,
            search_input: String::new(),
            searching: false,
            preview: String::new(),
            preview_title: String::new(),
            preview_scroll: 0,
            preview_tokens: 0,
            builder: None,
            builder_preview: String::new(),
            builder_spans: Vec::new(),
            builder_tokens: 0,
            editor: None,
            file_picker: None,
            confirm: None,
            prompt: None,
            show_help: false,
            show_tags: false,
            tags_cursor: 0,
            tag_usages: Vec::new(),
            worker_tx,
            worker_rx,
            in_progress: HashSet::new(),
            reload_running: false,
            reload_cancel: Arc::new(AtomicBool::new(false)),
            pending_editor_file: None,
            viewport_width: 80,
            viewport_height: 24,
            status_message: None,
        };
        app.refresh();
        Ok(app)
    }

    // === Housekeeping ===

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    pub fn tick(&mut self) {
        if let Some((_, shown_at)) = &self.status_message {
            if shown_at.elapsed().as_secs() >= 4 {
                self.status_message = None;
            }
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    fn page_size(&self) -> usize {
        (self.viewport_height as usize).saturating_sub(6).max(1)
    }

    fn preview_height(&self) -> usize {
        (self.viewport_height as usize).saturating_sub(6).max(1)
    }

    /// Reload everything from disk and re-apply the current query.
    pub fn refresh(&mut self) {
        if let Ok(settings) = Settings::load(self.store.root()) {
            self.settings = settings;
        }
        if let Ok(registry) = TagRegistry::load(self.store.root()) {
            self.registry = registry;
        }
        let query = Query::parse(&self.search_input);
        match crate::search::run(&self.store, &self.settings, &query) {
            Ok(results) => self.results = results,
            Err(e) => self.set_status(format!("Search failed: {}", e)),
        }
        self.rebuild_entries();
        self.list_cursor = state::clamp_selection(self.list_cursor, self.entries.len());
        self.update_preview();
        if self.screen == Screen::Builder {
            self.refresh_builder_available();
            self.update_builder_preview();
        }
    }

    fn rebuild_entries(&mut self) {
        self.entries = (0..self.results.pipelines.len())
            .map(Entry::Pipeline)
            .chain((0..self.results.components.len()).map(Entry::Component))
            .collect();
    }

    pub fn selected_entry(&self) -> Option<Entry> {
        self.entries.get(self.list_cursor).copied()
    }

    /// Project-relative path of the selected item.
    pub fn selected_path(&self) -> Option<String> {
        match self.selected_entry()? {
            Entry::Pipeline(i) => Some(self.results.pipelines[i].path.clone()),
            Entry::Component(i) => Some(self.results.components[i].path.clone()),
        }
    }

    // === List navigation ===

    pub fn list_move_up(&mut self) {
        self.list_cursor = state::move_selection_up(self.list_cursor);
        self.after_list_move();
    }

    pub fn list_move_down(&mut self) {
        self.list_cursor = state::move_selection_down(self.list_cursor, self.entries.len());
        self.after_list_move();
    }

    pub fn list_jump_top(&mut self) {
        self.list_cursor = 0;
        self.after_list_move();
    }

    pub fn list_jump_bottom(&mut self) {
        self.list_cursor = state::clamp_selection(usize::MAX, self.entries.len());
        self.after_list_move();
    }

    pub fn list_page_up(&mut self) {
        self.list_cursor = state::page_up(self.list_cursor, self.page_size());
        self.after_list_move();
    }

    pub fn list_page_down(&mut self) {
        self.list_cursor = state::page_down(self.list_cursor, self.page_size(), self.entries.len());
        self.after_list_move();
    }

    fn after_list_move(&mut self) {
        self.list_scroll =
            state::calculate_scroll_offset(self.list_cursor, self.list_scroll, self.page_size());
        self.update_preview();
    }

    pub fn scroll_preview(&mut self, delta: isize) {
        self.preview_scroll = state::scroll_by(
            self.preview_scroll,
            delta,
            self.preview.lines().count(),
            self.preview_height(),
        );
    }

    fn update_preview(&mut self) {
        self.preview_scroll = 0;
        match self.selected_entry() {
            Some(Entry::Component(i)) => {
                let c = &self.results.components[i];
                self.preview_title = c.display_name.clone();
                self.preview = c.content.clone();
                self.preview_tokens = c.token_count;
            }
            Some(Entry::Pipeline(i)) => {
                let p = &self.results.pipelines[i];
                self.preview_title = p.name.clone();
                self.preview = compose::compose(&self.store, p, &self.settings.sections)
                    .unwrap_or_else(|e| format!("(compose failed: {})", e));
                self.preview_tokens = compose::estimate_tokens(&self.preview);
            }
            None => {
                self.preview_title.clear();
                self.preview.clear();
                self.preview_tokens = 0;
            }
        }
    }

    pub fn preview_status(&self) -> TokenStatus {
        TokenStatus::for_tokens(self.preview_tokens)
    }

    // === Search ===

    pub fn start_search(&mut self) {
        self.searching = true;
    }

    pub fn search_input_char(&mut self, c: char) {
        self.search_input.push(c);
        self.refresh();
    }

    pub fn search_backspace(&mut self) {
        self.search_input.pop();
        self.refresh();
    }

    pub fn search_confirm(&mut self) {
        self.searching = false;
    }

    pub fn search_cancel(&mut self) {
        self.searching = false;
        self.search_input.clear();
        self.refresh();
    }

    // === Opening things ===

    pub fn open_selected(&mut self) {
        match self.selected_entry() {
            Some(Entry::Pipeline(i)) => {
                let pipeline = self.results.pipelines[i].clone();
                self.open_builder(&pipeline);
            }
            Some(Entry::Component(i)) => {
                let c = &self.results.components[i];
                self.editor = Some(EditorState::start_editing(
                    Some(c.path.clone()),
                    c.display_name.clone(),
                    c.kind,
                    c.content.clone(),
                    c.tags.clone(),
                ));
                self.screen = Screen::Editor;
            }
            None => {}
        }
    }

    fn open_builder(&mut self, pipeline: &Pipeline) {
        self.builder = Some(BuilderState::from_pipeline(pipeline));
        self.screen = Screen::Builder;
        self.refresh_builder_available();
        self.update_builder_preview();
    }

    pub fn leave_builder(&mut self) {
        self.builder = None;
        self.builder_preview.clear();
        self.builder_spans.clear();
        self.builder_tokens = 0;
        self.screen = Screen::List;
        self.refresh();
    }

    pub fn leave_editor(&mut self) {
        self.editor = None;
        self.file_picker = None;
        self.screen = Screen::List;
        self.refresh();
    }

    // === Builder plumbing ===

    pub fn refresh_builder_available(&mut self) {
        let Some(builder) = &mut self.builder else {
            return;
        };
        let query = Query::parse(&builder.filter);
        match crate::search::run(&self.store, &self.settings, &query) {
            Ok(results) => builder.set_available(results.components),
            Err(e) => {
                let msg = format!("Filter failed: {}", e);
                self.set_status(msg);
            }
        }
    }

    pub fn update_builder_preview(&mut self) {
        let Some(builder) = &self.builder else {
            return;
        };
        let draft = builder.to_pipeline(
            builder
                .pipeline_path
                .clone()
                .unwrap_or_else(|| pipeline_rel(Tree::Live, "draft.yaml")),
        );
        match compose::compose_indexed(&self.store, &draft, &self.settings.sections) {
            Ok((text, spans)) => {
                self.builder_tokens = compose::estimate_tokens(&text);
                self.builder_preview = text;
                self.builder_spans = spans;
            }
            Err(e) => {
                self.builder_preview = format!("(compose failed: {})", e);
                self.builder_spans = Vec::new();
                self.builder_tokens = 0;
            }
        }
    }

    pub fn builder_token_status(&self) -> TokenStatus {
        TokenStatus::for_tokens(self.builder_tokens)
    }

    /// Scroll the builder preview so the selected entry's first content
    /// line is approximately centered; fall back to a position
    /// proportional to the cursor index when the line cannot be located.
    pub fn sync_builder_preview(&mut self) {
        let Some(builder) = &self.builder else {
            return;
        };
        let total = self.builder_preview.lines().count();
        let visible = self.preview_height();
        let scroll = match builder
            .selected_seq_index(&self.settings)
            .and_then(|seq| self.builder_spans.iter().find(|s| s.seq_index == seq))
        {
            Some(span) => state::center_offset(span.content_line, total, visible),
            None => state::proportional_offset(
                builder.right_cursor,
                builder.selected.len(),
                total,
                visible,
            ),
        };
        if let Some(builder) = &mut self.builder {
            builder.preview_scroll = scroll;
        }
    }

    /// Persist the builder's pipeline; new pipelines get a slug path.
    pub fn builder_save(&mut self) -> bool {
        let Some(builder) = &self.builder else {
            return false;
        };
        let name = builder.name.trim().to_string();
        if name.is_empty() {
            self.set_status("Pipeline needs a name before saving");
            return false;
        }
        let path = match &builder.pipeline_path {
            Some(path) => path.clone(),
            None => {
                let slug = crate::component::slugify(&name);
                if slug.is_empty() {
                    self.set_status("Pipeline name needs at least one letter or digit");
                    return false;
                }
                let path = pipeline_rel(Tree::Live, &format!("{}.yaml", slug));
                if self.store.exists(&path) {
                    self.set_status(format!("A pipeline named {} already exists", slug));
                    return false;
                }
                path
            }
        };
        let pipeline = builder.to_pipeline(path.clone());
        if let Err(e) = self.store.write_pipeline(&pipeline) {
            self.set_status(format!("Save failed: {}", e));
            return false;
        }
        for tag in pipeline.tags.clone() {
            self.registry.ensure(&tag);
        }
        if let Err(e) = self.registry.save() {
            self.set_status(format!("Registry update failed: {}", e));
        }
        if let Some(builder) = &mut self.builder {
            builder.pipeline_path = Some(path);
            builder.mark_saved();
        }
        self.set_status(format!("Saved pipeline {}", name));
        true
    }

    /// Save, then compose into the output artifact ("set" the pipeline).
    pub fn builder_set(&mut self) {
        if !self.builder_save() {
            return;
        }
        let Some(builder) = &self.builder else {
            return;
        };
        let Some(path) = builder.pipeline_path.clone() else {
            return;
        };
        match self
            .store
            .read_pipeline(&path)
            .and_then(|p| compose::set_pipeline(&self.store, &self.settings, &p))
        {
            Ok(written) => self.set_status(format!("Set pipeline -> {}", written)),
            Err(e) => self.set_status(format!("Set failed: {}", e)),
        }
    }

    // === Editor plumbing ===

    /// Persist the editor buffer through the Store.
    pub fn editor_save(&mut self) {
        let Some(editor) = &self.editor else {
            return;
        };
        let name = editor.name.trim().to_string();
        let kind = editor.kind;
        let existing_path = editor.path.clone();
        let content = editor.content.clone();
        let tags = editor.tags.clone();

        let path = match existing_path {
            Some(path) => path,
            None => {
                let slug = crate::component::slugify(&name);
                if slug.is_empty() {
                    self.set_status("Component name needs at least one letter or digit");
                    return;
                }
                let path = store::component_rel(Tree::Live, kind, &format!("{}.md", slug));
                if self.store.exists(&path) {
                    self.set_status(format!(
                        "A {} named {} already exists",
                        kind.label().to_lowercase(),
                        slug
                    ));
                    return;
                }
                path
            }
        };
        if let Err(e) = self.store.write_component(&path, &content, &tags, None) {
            self.set_status(format!("Save failed: {}", e));
            return;
        }
        for tag in &tags {
            self.registry.ensure(tag);
        }
        if let Err(e) = self.registry.save() {
            self.set_status(format!("Registry update failed: {}", e));
        }
        if let Some(editor) = &mut self.editor {
            editor.path = Some(path);
            editor.mark_saved();
        }
        self.set_status(format!("Saved {}", name));
    }

    pub fn start_editor_file_picker(&mut self) {
        if let Some(editor) = &mut self.editor {
            editor.start_file_picker();
            self.file_picker = Some(FilePicker::new(self.store.root().to_path_buf()));
        }
    }

    pub fn editor_pick_file(&mut self) {
        let picked = self.file_picker.as_mut().and_then(|p| p.enter());
        if let Some(path) = picked {
            if let Some(editor) = &mut self.editor {
                editor.confirm_file_pick(&path);
            }
            self.file_picker = None;
        }
    }

    pub fn cancel_editor_file_picker(&mut self) {
        if let Some(editor) = &mut self.editor {
            editor.cancel_file_pick();
        }
        self.file_picker = None;
    }

    // === Item operations from the list screen ===

    pub fn prompt_new_pipeline(&mut self) {
        self.prompt = Some(InputPrompt {
            title: "New pipeline name".to_string(),
            value: String::new(),
            action: PromptAction::NewPipeline,
        });
    }

    pub fn prompt_new_component(&mut self, kind: ComponentKind) {
        self.prompt = Some(InputPrompt {
            title: format!("New {} name", kind.label().to_lowercase()),
            value: String::new(),
            action: PromptAction::NewComponent(kind),
        });
    }

    pub fn prompt_rename_selected(&mut self) {
        match self.selected_entry() {
            Some(Entry::Pipeline(i)) => {
                let p = &self.results.pipelines[i];
                self.prompt = Some(InputPrompt {
                    title: format!("Rename pipeline {}", p.name),
                    value: p.name.clone(),
                    action: PromptAction::RenamePipeline(p.path.clone()),
                });
            }
            Some(Entry::Component(i)) => {
                let c = &self.results.components[i];
                self.prompt = Some(InputPrompt {
                    title: format!("Rename {}", c.display_name),
                    value: c.display_name.clone(),
                    action: PromptAction::RenameComponent(c.path.clone()),
                });
            }
            None => {}
        }
    }

    pub fn prompt_edit_builder_name(&mut self) {
        let Some(builder) = &self.builder else {
            return;
        };
        self.prompt = Some(InputPrompt {
            title: "Pipeline name".to_string(),
            value: builder.name.clone(),
            action: PromptAction::EditBuilderName,
        });
    }

    pub fn prompt_edit_builder_tags(&mut self) {
        let Some(builder) = &self.builder else {
            return;
        };
        self.prompt = Some(InputPrompt {
            title: "Pipeline tags (comma separated)".to_string(),
            value: builder.tags.join(", "),
            action: PromptAction::EditBuilderTags,
        });
    }

    pub fn prompt_edit_editor_tags(&mut self) {
        let Some(editor) = &self.editor else {
            return;
        };
        self.prompt = Some(InputPrompt {
            title: "Component tags (comma separated)".to_string(),
            value: editor.tags.join(", "),
            action: PromptAction::EditEditorTags,
        });
    }

    pub fn prompt_input_char(&mut self, c: char) {
        if let Some(prompt) = &mut self.prompt {
            prompt.value.push(c);
        }
    }

    pub fn prompt_backspace(&mut self) {
        if let Some(prompt) = &mut self.prompt {
            prompt.value.pop();
        }
    }

    pub fn prompt_cancel(&mut self) {
        self.prompt = None;
    }

    pub fn prompt_submit(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let value = prompt.value.trim().to_string();
        match prompt.action {
            PromptAction::NewPipeline => {
                if value.is_empty() {
                    self.set_status("Name must not be empty");
                    return;
                }
                self.builder = Some(BuilderState::for_new(value));
                self.screen = Screen::Builder;
                self.refresh_builder_available();
                self.update_builder_preview();
            }
            PromptAction::NewComponent(kind) => {
                if value.is_empty() {
                    self.set_status("Name must not be empty");
                    return;
                }
                self.editor = Some(EditorState::start_editing(
                    None,
                    value.clone(),
                    kind,
                    format!("# {}\n\n", value),
                    Vec::new(),
                ));
                self.screen = Screen::Editor;
            }
            PromptAction::RenameComponent(rel) => {
                match rename::rename_component(&self.store, &rel, &value) {
                    Ok(outcome) => {
                        let rewritten = outcome.rewritten.len();
                        self.set_status(if rewritten > 0 {
                            format!(
                                "Renamed {} -> {} ({} pipeline(s) updated)",
                                outcome.old_name, outcome.new_name, rewritten
                            )
                        } else {
                            format!("Renamed {} -> {}", outcome.old_name, outcome.new_name)
                        });
                    }
                    Err(e) => self.set_status(format!("Rename failed: {}", e)),
                }
                self.refresh();
            }
            PromptAction::RenamePipeline(rel) => {
                match rename::rename_pipeline(&self.store, &rel, &value) {
                    Ok(outcome) => self.set_status(format!(
                        "Renamed {} -> {}",
                        outcome.old_name, outcome.new_name
                    )),
                    Err(e) => self.set_status(format!("Rename failed: {}", e)),
                }
                self.refresh();
            }
            PromptAction::EditBuilderName => {
                if value.is_empty() {
                    self.set_status("Name must not be empty");
                    return;
                }
                if let Some(builder) = &mut self.builder {
                    builder.name = value;
                }
            }
            PromptAction::EditBuilderTags => {
                let tags = parse_tag_input(&value);
                if let Some(builder) = &mut self.builder {
                    builder.tags = tags;
                }
            }
            PromptAction::EditEditorTags => {
                let tags = parse_tag_input(&value);
                if let Some(editor) = &mut self.editor {
                    editor.tags = tags;
                }
            }
        }
    }

    /// Archive or unarchive the selected item, depending on the universe
    /// currently shown.
    pub fn toggle_archive_selected(&mut self) {
        let Some(rel) = self.selected_path() else {
            return;
        };
        let result = if rel.starts_with("archive/") {
            archive::unarchive(&self.store, &rel).map(|p| format!("Restored to {}", p))
        } else {
            archive::archive(&self.store, &rel).map(|p| format!("Archived to {}", p))
        };
        match result {
            Ok(msg) => self.set_status(msg),
            Err(e) => self.set_status(format!("Move failed: {}", e)),
        }
        self.refresh();
    }

    pub fn confirm_delete_selected(&mut self) {
        match self.selected_entry() {
            Some(Entry::Pipeline(i)) => {
                let p = &self.results.pipelines[i];
                self.confirm = Some(Confirm::Inline {
                    message: format!("Delete pipeline {}? (y/n)", p.name),
                    destructive: true,
                    action: ConfirmAction::DeletePipeline(p.path.clone()),
                });
            }
            Some(Entry::Component(i)) => {
                let c = &self.results.components[i];
                self.confirm = Some(Confirm::Inline {
                    message: format!("Delete {}? (y/n)", c.display_name),
                    destructive: true,
                    action: ConfirmAction::DeleteComponent(c.path.clone()),
                });
            }
            None => {}
        }
    }

    pub fn cancel_confirm(&mut self) {
        self.confirm = None;
    }

    /// One interpreter for both confirmation styles.
    pub fn accept_confirm(&mut self) {
        let Some(confirm) = self.confirm.take() else {
            return;
        };
        match confirm.action().clone() {
            ConfirmAction::DeleteComponent(rel) => {
                let tags = self
                    .store
                    .read_component(&rel)
                    .map(|c| c.tags)
                    .unwrap_or_default();
                match self.store.delete_component(&rel) {
                    Ok(()) => {
                        self.set_status(format!("Deleted {}", rel));
                        self.cleanup_tags(&tags);
                    }
                    Err(e) => self.set_status(format!("Delete failed: {}", e)),
                }
                self.refresh();
            }
            ConfirmAction::DeletePipeline(rel) => {
                let tags = self
                    .store
                    .read_pipeline(&rel)
                    .map(|p| p.tags)
                    .unwrap_or_default();
                match self.store.delete_pipeline(&rel) {
                    Ok(()) => {
                        self.set_status(format!("Deleted {}", rel));
                        self.cleanup_tags(&tags);
                    }
                    Err(e) => self.set_status(format!("Delete failed: {}", e)),
                }
                self.refresh();
            }
            ConfirmAction::DeleteTag(name) => {
                self.spawn_tag_sweep(name);
            }
            ConfirmAction::DiscardBuilder => self.leave_builder(),
            ConfirmAction::DiscardEditor => self.leave_editor(),
        }
    }

    /// Orphan-cleanup errors are logged to the status line and swallowed.
    fn cleanup_tags(&mut self, candidates: &[String]) {
        if candidates.is_empty() {
            return;
        }
        if let Err(e) = tags::cleanup_orphans(&self.store, &mut self.registry, candidates) {
            self.set_status(format!("Tag cleanup skipped: {}", e));
        }
    }

    /// Compose the selected pipeline into its output artifact.
    pub fn set_selected_pipeline(&mut self) {
        let Some(Entry::Pipeline(i)) = self.selected_entry() else {
            self.set_status("Select a pipeline to set");
            return;
        };
        let pipeline = self.results.pipelines[i].clone();
        match compose::set_pipeline(&self.store, &self.settings, &pipeline) {
            Ok(written) => self.set_status(format!("Set {} -> {}", pipeline.name, written)),
            Err(e) => self.set_status(format!("Set failed: {}", e)),
        }
    }

    /// Offline reconciliation scan for dangling references.
    pub fn reconcile_refs(&mut self) {
        match rename::scan_dangling_refs(&self.store) {
            Ok(dangling) if dangling.is_empty() => {
                self.set_status("All pipeline references resolve");
            }
            Ok(dangling) => {
                let first = &dangling[0];
                self.set_status(format!(
                    "{} dangling reference(s); first: {} -> {}",
                    dangling.len(),
                    first.pipeline,
                    first.reference
                ));
            }
            Err(e) => self.set_status(format!("Scan failed: {}", e)),
        }
    }

    // === External editor ===

    /// Queue the selected file for the external `$EDITOR`; the event
    /// loop suspends the terminal and spawns it. The command is
    /// validated here, before any terminal state changes.
    pub fn external_edit_selected(&mut self) {
        let Some(rel) = self.selected_path() else {
            return;
        };
        match editor_command() {
            Ok(_) => match self.store.abs(&rel) {
                Ok(abs) => self.pending_editor_file = Some(abs),
                Err(e) => self.set_status(format!("Bad path: {}", e)),
            },
            Err(e) => self.set_status(e.to_string()),
        }
    }

    pub fn take_pending_editor_file(&mut self) -> Option<PathBuf> {
        self.pending_editor_file.take()
    }

    // === Tag manager ===

    pub fn open_tags(&mut self) {
        self.show_tags = true;
        self.tags_cursor = 0;
        self.spawn_usage_scan();
    }

    pub fn close_tags(&mut self) {
        self.show_tags = false;
    }

    pub fn tags_move_up(&mut self) {
        self.tags_cursor = state::move_selection_up(self.tags_cursor);
    }

    pub fn tags_move_down(&mut self) {
        self.tags_cursor = state::move_selection_down(self.tags_cursor, self.registry.list().len());
    }

    pub fn usage_for(&self, name: &str) -> Option<TagUsage> {
        self.tag_usages
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, u)| *u)
    }

    /// Ask before sweeping a tag out of every file. Rejected while a
    /// sweep for the same tag is already in flight.
    pub fn confirm_delete_tag(&mut self) {
        let Some(entry) = self.registry.list().get(self.tags_cursor) else {
            return;
        };
        let name = entry.name.clone();
        if self.in_progress.contains(&name) {
            self.set_status(format!("Tag {} is already being deleted", name));
            return;
        }
        let usage = self.usage_for(&name).unwrap_or_default();
        self.confirm = Some(Confirm::Dialog {
            title: "Delete tag everywhere".to_string(),
            message: format!(
                "Remove #{} from {} component(s) and {} pipeline(s)?",
                name, usage.component_count, usage.pipeline_count
            ),
            warning: Some("This rewrites every file that carries the tag.".to_string()),
            destructive: true,
            action: ConfirmAction::DeleteTag(name),
        });
    }

    // === Workers ===

    fn spawn_tag_sweep(&mut self, tag: String) {
        if self.in_progress.contains(&tag) {
            self.set_status(format!("Tag {} is already being deleted", tag));
            return;
        }
        self.in_progress.insert(tag.clone());
        let tx = self.worker_tx.clone();
        let store = self.store.clone();
        let root = self.store.root().to_path_buf();
        thread::spawn(move || {
            let task = Task::TagSweep(tag.clone());
            let _ = tx.send(WorkerMsg::Started { task: task.clone() });
            let mut registry = match TagRegistry::load(&root) {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(WorkerMsg::Completed {
                        task,
                        result: TaskResult::Failed(e.to_string()),
                    });
                    return;
                }
            };
            let progress_tx = tx.clone();
            let progress_task = task.clone();
            let outcome =
                tags::delete_tag_everywhere(&store, &mut registry, &tag, |file, done, total| {
                    let _ = progress_tx.send(WorkerMsg::Progress {
                        task: progress_task.clone(),
                        current: file.to_string(),
                        done,
                        total,
                    });
                });
            let result = match outcome {
                Ok(report) => TaskResult::SweepDone {
                    processed: report.processed,
                    failed: report.failed,
                },
                Err(e) => TaskResult::Failed(e.to_string()),
            };
            let _ = tx.send(WorkerMsg::Completed { task, result });
        });
    }

    fn spawn_usage_scan(&self) {
        let tx = self.worker_tx.clone();
        let store = self.store.clone();
        let root = self.store.root().to_path_buf();
        thread::spawn(move || {
            let task = Task::UsageScan;
            let _ = tx.send(WorkerMsg::Started { task: task.clone() });
            let result = match TagRegistry::load(&root) {
                Ok(registry) => {
                    let mut usages = Vec::new();
                    for entry in registry.list() {
                        let usage =
                            tags::count_usage(&store, &entry.name).unwrap_or_default();
                        usages.push((entry.name.clone(), usage));
                    }
                    TaskResult::UsageScanned(usages)
                }
                Err(e) => TaskResult::Failed(e.to_string()),
            };
            let _ = tx.send(WorkerMsg::Completed { task, result });
        });
    }

    /// Rebuild the registry from the trees; the only cancellable task.
    pub fn spawn_registry_reload(&mut self) {
        if self.reload_running {
            self.set_status("Registry reload already running (x cancels)");
            return;
        }
        self.reload_running = true;
        self.reload_cancel = Arc::new(AtomicBool::new(false));
        let cancel = self.reload_cancel.clone();
        let tx = self.worker_tx.clone();
        let store = self.store.clone();
        let root = self.store.root().to_path_buf();
        thread::spawn(move || {
            let task = Task::RegistryReload;
            let _ = tx.send(WorkerMsg::Started { task: task.clone() });
            let result = match TagRegistry::load(&root) {
                Ok(mut registry) => match tags::rebuild_registry(&store, &mut registry, &cancel) {
                    Ok(added) => TaskResult::ReloadDone { added },
                    Err(Error::Cancelled) => TaskResult::Cancelled,
                    Err(e) => TaskResult::Failed(e.to_string()),
                },
                Err(e) => TaskResult::Failed(e.to_string()),
            };
            let _ = tx.send(WorkerMsg::Completed { task, result });
        });
    }

    pub fn cancel_registry_reload(&mut self) {
        if self.reload_running {
            self.reload_cancel.store(true, Ordering::Relaxed);
        }
    }

    /// Drain worker messages; called once per loop iteration.
    pub fn drain_workers(&mut self) {
        loop {
            match self.worker_rx.try_recv() {
                Ok(msg) => self.on_worker(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn on_worker(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::Started { task } => {
                if let Task::TagSweep(tag) = &task {
                    self.set_status(format!("Deleting tag {}...", tag));
                }
            }
            WorkerMsg::Progress {
                task,
                current,
                done,
                total,
            } => {
                if let Task::TagSweep(tag) = &task {
                    self.set_status(format!("Deleting {}: {}/{} {}", tag, done, total, current));
                }
            }
            WorkerMsg::Completed { task, result } => self.on_task_done(task, result),
        }
    }

    fn on_task_done(&mut self, task: Task, result: TaskResult) {
        if let Some(tag) = task.aggregate() {
            self.in_progress.remove(tag);
        }
        match result {
            TaskResult::SweepDone { processed, failed } => {
                if failed.is_empty() {
                    self.set_status(format!("Tag removed from {} file(s)", processed));
                } else {
                    let names: Vec<&str> =
                        failed.iter().map(|(f, _)| f.as_str()).collect();
                    self.set_status(format!(
                        "Tag removed with {} failure(s): {}",
                        failed.len(),
                        names.join(", ")
                    ));
                }
                self.refresh();
                if self.show_tags {
                    self.spawn_usage_scan();
                }
            }
            TaskResult::UsageScanned(usages) => {
                self.tag_usages = usages;
            }
            TaskResult::ReloadDone { added } => {
                self.reload_running = false;
                self.set_status(format!("Registry reloaded ({} tag(s) added)", added));
                self.refresh();
                if self.show_tags {
                    self.spawn_usage_scan();
                }
            }
            TaskResult::Cancelled => {
                self.reload_running = false;
                self.set_status("Registry reload cancelled");
            }
            TaskResult::Failed(e) => {
                self.reload_running = false;
                self.set_status(format!("Background task failed: {}", e));
            }
        }
    }
}

/// `a, b, c` -> normalized tag set.
fn parse_tag_input(value: &str) -> Vec<String> {
    let parts: Vec<String> = value.split(',').map(|s| s.to_string()).collect();
    normalize_tag_set(&parts)
}

/// Resolve and validate `$EDITOR`. Whitespace splits the command into
/// discrete argv tokens; metacharacters anywhere refuse the spawn.
pub fn editor_command() -> Result<Vec<String>> {
    let raw = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let tokens: Vec<String> = raw.split_whitespace().map(|s| s.to_string()).collect();
    if tokens.is_empty() {
        return Err(Error::Unsafe("EDITOR is empty".to_string()));
    }
    for token in &tokens {
        if store::unsafe_for_argv(token) {
            return Err(Error::Unsafe(format!(
                "EDITOR contains a shell metacharacter: {}",
                token
            )));
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_input() {
        assert_eq!(parse_tag_input("UI, Api Stuff,, ui"), vec!["ui", "api-stuff"]);
        assert!(parse_tag_input("").is_empty());
    }

    #[test]
    fn test_confirm_interpreter_shape() {
        let inline = Confirm::Inline {
            message: "Delete? (y/n)".to_string(),
            destructive: true,
            action: ConfirmAction::DeleteComponent("components/prompts/x.md".to_string()),
        };
        let dialog = Confirm::Dialog {
            title: "Delete tag".to_string(),
            message: "Remove #x everywhere?".to_string(),
            warning: None,
            destructive: true,
            action: ConfirmAction::DeleteTag("x".to_string()),
        };
        assert!(inline.destructive());
        assert!(dialog.destructive());
        assert!(matches!(
            inline.action(),
            ConfirmAction::DeleteComponent(_)
        ));
        assert!(matches!(dialog.action(), ConfirmAction::DeleteTag(_)));
    }
}
