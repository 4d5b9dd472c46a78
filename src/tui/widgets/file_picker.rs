//! File picker overlay for inserting file references.
//!
//! Walks the project tree starting at the root; directories descend on
//! Enter, files resolve to a root-relative path for the editor to insert.

use std::fs;
use std::path::PathBuf;

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem},
};

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug)]
pub struct FilePicker {
    root: PathBuf,
    pub dir: PathBuf,
    pub entries: Vec<FileEntry>,
    pub cursor: usize,
}

impl FilePicker {
    pub fn new(root: PathBuf) -> Self {
        let mut picker = FilePicker {
            dir: root.clone(),
            root,
            entries: Vec::new(),
            cursor: 0,
        };
        picker.refresh();
        picker
    }

    /// Re-read the current directory: directories first, then files,
    /// each alphabetical; hidden entries skipped.
    fn refresh(&mut self) {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                if entry.path().is_dir() {
                    dirs.push(name);
                } else {
                    files.push(name);
                }
            }
        }
        dirs.sort();
        files.sort();
        self.entries = dirs
            .into_iter()
            .map(|name| FileEntry { name, is_dir: true })
            .chain(files.into_iter().map(|name| FileEntry {
                name,
                is_dir: false,
            }))
            .collect();
        self.cursor = 0;
    }

    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.entries.len() {
            self.cursor += 1;
        }
    }

    /// Enter the entry under the cursor. Descending into a directory
    /// returns `None`; a file returns its root-relative path.
    pub fn enter(&mut self) -> Option<String> {
        let entry = self.entries.get(self.cursor)?;
        let target = self.dir.join(&entry.name);
        if entry.is_dir {
            self.dir = target;
            self.refresh();
            return None;
        }
        let rel = target.strip_prefix(&self.root).unwrap_or(&target);
        Some(rel.to_string_lossy().replace('\\', "/"))
    }

    /// Go up one directory, stopping at the picker root.
    pub fn back(&mut self) {
        if self.dir != self.root {
            if let Some(parent) = self.dir.parent() {
                self.dir = parent.to_path_buf();
                self.refresh();
            }
        }
    }
}

/// Draw the file picker overlay centered in `area`.
pub fn draw(frame: &mut Frame, picker: &FilePicker, area: Rect) {
    let max_name_len = picker
        .entries
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(20);
    let popup_width = (max_name_len + 10).clamp(36, 70) as u16;
    let popup_height = (picker.entries.len() + 4).clamp(6, 20) as u16;

    let popup_area = Rect {
        x: (area.width.saturating_sub(popup_width)) / 2,
        y: (area.height.saturating_sub(popup_height)) / 2,
        width: popup_width.min(area.width),
        height: popup_height.min(area.height),
    };

    frame.render_widget(Clear, popup_area);

    let dir_label = picker.dir.to_string_lossy();
    let block = Block::default()
        .title(format!(" {} (Enter=pick, Bksp=up, Esc=cancel) ", dir_label))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner_area = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let visible = inner_area.height as usize;
    let offset = crate::tui::state::calculate_scroll_offset(picker.cursor, 0, visible);

    let items: Vec<ListItem> = picker
        .entries
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, entry)| {
            let marker = if entry.is_dir { "/" } else { " " };
            let style = if i == picker.cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else if entry.is_dir {
                Style::default().fg(Color::Blue)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}{}", entry.name, marker), style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), inner_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, FilePicker) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "# readme\n").unwrap();
        fs::write(dir.path().join(".hidden"), "x").unwrap();
        let picker = FilePicker::new(dir.path().to_path_buf());
        (dir, picker)
    }

    #[test]
    fn test_listing_order_and_hidden_files() {
        let (_dir, picker) = fixture();
        let names: Vec<&str> = picker.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["src", "README.md"]);
        assert!(picker.entries[0].is_dir);
    }

    #[test]
    fn test_descend_and_pick_relative_path() {
        let (_dir, mut picker) = fixture();
        assert_eq!(picker.enter(), None); // descend into src/
        assert_eq!(picker.entries.len(), 1);
        let picked = picker.enter();
        assert_eq!(picked.as_deref(), Some("src/main.rs"));
    }

    #[test]
    fn test_back_stops_at_root() {
        let (_dir, mut picker) = fixture();
        let root = picker.dir.clone();
        picker.back(); // already at root
        assert_eq!(picker.dir, root);
        picker.enter(); // descend
        picker.back();
        assert_eq!(picker.dir, root);
    }

    #[test]
    fn test_cursor_bounds() {
        let (_dir, mut picker) = fixture();
        picker.move_up();
        assert_eq!(picker.cursor, 0);
        picker.move_down();
        assert_eq!(picker.cursor, 1);
        picker.move_down();
        assert_eq!(picker.cursor, 1);
    }
}
