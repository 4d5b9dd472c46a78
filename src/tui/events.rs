//! Event handling for the TUI.
//!
//! One dispatcher per screen plus overlay handlers; overlays win over
//! screens so a confirmation can never be bypassed by a screen binding.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, Confirm, ConfirmAction, Screen};
use super::builder::PaneFocus;
use super::editor::EditorMode;
use super::state;
use crate::component::ComponentKind;

/// Handle a key event, returns true if app should quit
pub fn handle_event(app: &mut App, key: KeyEvent) -> bool {
    // Help overlay first
    if app.show_help {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')
        ) {
            app.show_help = false;
        }
        return false;
    }

    // Confirmations trump everything else
    if app.confirm.is_some() {
        return handle_confirm(app, key);
    }

    // Input prompt
    if app.prompt.is_some() {
        return handle_prompt(app, key);
    }

    // Editor file picker
    if app.screen == Screen::Editor
        && app
            .editor
            .as_ref()
            .map(|e| e.mode == EditorMode::FilePicking)
            .unwrap_or(false)
    {
        return handle_file_picker(app, key);
    }

    // Tag manager overlay
    if app.show_tags {
        return handle_tags(app, key);
    }

    match app.screen {
        Screen::List => {
            if app.searching {
                handle_search_mode(app, key)
            } else {
                handle_list_keys(app, key)
            }
        }
        Screen::Builder => handle_builder_keys(app, key),
        Screen::Editor => handle_editor_keys(app, key),
    }
}

fn handle_confirm(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.accept_confirm(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_confirm(),
        _ => {}
    }
    false
}

fn handle_prompt(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => app.prompt_cancel(),
        KeyCode::Enter => app.prompt_submit(),
        KeyCode::Backspace => app.prompt_backspace(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.prompt_input_char(c)
        }
        _ => {}
    }
    false
}

fn handle_search_mode(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => app.search_cancel(),
        KeyCode::Enter => app.search_confirm(),
        KeyCode::Backspace => app.search_backspace(),
        KeyCode::Char(c) => app.search_input_char(c),
        _ => {}
    }
    false
}

fn handle_list_keys(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        // Quit
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,

        // Help
        KeyCode::Char('?') => {
            app.show_help = true;
        }

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.list_move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.list_move_up(),
        KeyCode::Char('g') | KeyCode::Home => app.list_jump_top(),
        KeyCode::Char('G') | KeyCode::End => app.list_jump_bottom(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.list_page_down()
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.list_page_up(),
        KeyCode::PageDown => app.list_page_down(),
        KeyCode::PageUp => app.list_page_up(),

        // Preview scroll
        KeyCode::Char('l') | KeyCode::Right => app.scroll_preview(3),
        KeyCode::Char('h') | KeyCode::Left => app.scroll_preview(-3),

        // Search
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Esc => {
            if !app.search_input.is_empty() {
                app.search_cancel();
            }
        }

        // Open in the builder or the component editor
        KeyCode::Enter => app.open_selected(),

        // External $EDITOR
        KeyCode::Char('e') => app.external_edit_selected(),

        // Creation
        KeyCode::Char('n') => app.prompt_new_pipeline(),
        KeyCode::Char('C') => app.prompt_new_component(ComponentKind::Context),
        KeyCode::Char('P') => app.prompt_new_component(ComponentKind::Prompt),
        KeyCode::Char('R') => app.prompt_new_component(ComponentKind::Rules),

        // Item operations
        KeyCode::Char('r') => app.prompt_rename_selected(),
        KeyCode::Char('a') => app.toggle_archive_selected(),
        KeyCode::Char('d') => app.confirm_delete_selected(),
        KeyCode::Char('S') => app.set_selected_pipeline(),

        // Tag manager and reconciliation
        KeyCode::Char('t') => app.open_tags(),
        KeyCode::Char('x') => app.reconcile_refs(),

        _ => {}
    }
    false
}

fn handle_tags(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('t') => app.close_tags(),
        KeyCode::Char('j') | KeyCode::Down => app.tags_move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.tags_move_up(),
        KeyCode::Char('d') => app.confirm_delete_tag(),
        KeyCode::Char('r') => app.spawn_registry_reload(),
        KeyCode::Char('x') => app.cancel_registry_reload(),
        _ => {}
    }
    false
}

fn handle_builder_keys(app: &mut App, key: KeyEvent) -> bool {
    // Filter input mode for the available pane
    if app
        .builder
        .as_ref()
        .map(|b| b.filtering)
        .unwrap_or(false)
    {
        match key.code {
            KeyCode::Esc => {
                if let Some(b) = &mut app.builder {
                    b.filtering = false;
                    b.filter.clear();
                }
                app.refresh_builder_available();
            }
            KeyCode::Enter => {
                if let Some(b) = &mut app.builder {
                    b.filtering = false;
                }
            }
            KeyCode::Backspace => {
                if let Some(b) = &mut app.builder {
                    b.filter.pop();
                }
                app.refresh_builder_available();
            }
            KeyCode::Char(c) => {
                if let Some(b) = &mut app.builder {
                    b.filter.push(c);
                }
                app.refresh_builder_available();
            }
            _ => {}
        }
        return false;
    }

    let focus = app
        .builder
        .as_ref()
        .map(|b| b.focus)
        .unwrap_or(PaneFocus::Available);

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,

        // Leave; unsaved sequences need confirmation first
        KeyCode::Esc | KeyCode::Char('q') => {
            let dirty = app.builder.as_ref().map(|b| b.is_dirty()).unwrap_or(false);
            if dirty {
                app.confirm = Some(Confirm::Inline {
                    message: "Discard unsaved pipeline changes? (y/n)".to_string(),
                    destructive: true,
                    action: ConfirmAction::DiscardBuilder,
                });
            } else {
                app.leave_builder();
            }
        }

        KeyCode::Tab => {
            if let Some(b) = &mut app.builder {
                b.toggle_focus();
            }
        }

        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(b) = &mut app.builder {
                b.move_cursor_down();
            }
            if focus == PaneFocus::Selected {
                app.sync_builder_preview();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(b) = &mut app.builder {
                b.move_cursor_up();
            }
            if focus == PaneFocus::Selected {
                app.sync_builder_preview();
            }
        }

        // Add from the available pane (duplicates allowed)
        KeyCode::Enter | KeyCode::Char(' ') if focus == PaneFocus::Available => {
            builder_mutate(app, |app| {
                let settings = app.settings.clone();
                app.builder
                    .as_mut()
                    .map(|b| b.add_current(&settings))
                    .unwrap_or(false)
            });
        }

        // Remove at cursor on the selected pane
        KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace
            if focus == PaneFocus::Selected =>
        {
            builder_mutate(app, |app| {
                let settings = app.settings.clone();
                app.builder
                    .as_mut()
                    .map(|b| b.remove_current(&settings))
                    .unwrap_or(false)
            });
        }

        // Reorder within the selected pane
        KeyCode::Char('K') if focus == PaneFocus::Selected => {
            builder_mutate(app, |app| {
                let settings = app.settings.clone();
                app.builder
                    .as_mut()
                    .map(|b| b.move_current_up(&settings))
                    .unwrap_or(false)
            });
        }
        KeyCode::Char('J') if focus == PaneFocus::Selected => {
            builder_mutate(app, |app| {
                let settings = app.settings.clone();
                app.builder
                    .as_mut()
                    .map(|b| b.move_current_down(&settings))
                    .unwrap_or(false)
            });
        }

        // Empty the sequence
        KeyCode::Char('D') => {
            builder_mutate(app, |app| {
                if let Some(b) = &mut app.builder {
                    b.clear();
                    true
                } else {
                    false
                }
            });
        }

        // Metadata
        KeyCode::Char('n') => app.prompt_edit_builder_name(),
        KeyCode::Char('t') => app.prompt_edit_builder_tags(),

        // Filter the available pane
        KeyCode::Char('/') => {
            if let Some(b) = &mut app.builder {
                b.filtering = true;
                b.focus = PaneFocus::Available;
            }
        }

        // Persist
        KeyCode::Char('s') => {
            app.builder_save();
        }
        KeyCode::Char('S') => app.builder_set(),

        _ => {}
    }
    false
}

/// Run a selected-pane mutation and keep the preview in sync with it.
fn builder_mutate(app: &mut App, f: impl FnOnce(&mut App) -> bool) {
    if f(app) {
        app.update_builder_preview();
        app.sync_builder_preview();
    }
}

fn handle_editor_keys(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,

        KeyCode::Esc => {
            let dirty = app.editor.as_ref().map(|e| e.is_dirty()).unwrap_or(false);
            if dirty {
                app.confirm = Some(Confirm::Inline {
                    message: "Discard unsaved component changes? (y/n)".to_string(),
                    destructive: true,
                    action: ConfirmAction::DiscardEditor,
                });
            } else {
                app.leave_editor();
            }
        }

        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => app.editor_save(),
        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.prompt_edit_editor_tags()
        }

        // '@' captures the cursor and opens the file picker
        KeyCode::Char('@') => app.start_editor_file_picker(),

        KeyCode::Enter => editor_edit(app, |e| e.insert_newline()),
        KeyCode::Backspace => editor_edit(app, |e| e.backspace()),
        KeyCode::Delete => editor_edit(app, |e| e.delete_forward()),
        KeyCode::Tab => editor_edit(app, |e| e.insert_str("    ")),

        KeyCode::Left => editor_edit(app, |e| e.move_left()),
        KeyCode::Right => editor_edit(app, |e| e.move_right()),
        KeyCode::Up => editor_edit(app, |e| e.move_up()),
        KeyCode::Down => editor_edit(app, |e| e.move_down()),
        KeyCode::Home => editor_edit(app, |e| e.move_line_start()),
        KeyCode::End => editor_edit(app, |e| e.move_line_end()),

        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            editor_edit(app, |e| e.insert_char(c))
        }

        _ => {}
    }
    false
}

/// Apply an editor mutation, then keep the cursor visible.
fn editor_edit(app: &mut App, f: impl FnOnce(&mut super::editor::EditorState)) {
    let visible = (app.viewport_height as usize).saturating_sub(8).max(1);
    if let Some(editor) = &mut app.editor {
        f(editor);
        let (line, _) = editor.cursor_position();
        editor.scroll = state::calculate_scroll_offset(line, editor.scroll, visible);
    }
}

fn handle_file_picker(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.cancel_editor_file_picker(),
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(p) = &mut app.file_picker {
                p.move_down();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(p) = &mut app.file_picker {
                p.move_up();
            }
        }
        KeyCode::Enter => app.editor_pick_file(),
        KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Left => {
            if let Some(p) = &mut app.file_picker {
                p.back();
            }
        }
        _ => {}
    }
    false
}
