//! Editor state: component content editing with file-reference insertion.
//!
//! Two modes: normal text editing and file-picking, which captures the
//! cursor as the insertion point, lets the user walk a local file tree,
//! and inserts an `@<path>` reference token on confirm. The editor never
//! writes to disk itself; the enclosing controller hands the buffer to
//! the Store on save.

use crate::component::ComponentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Normal,
    FilePicking,
}

#[derive(Debug)]
pub struct EditorState {
    pub kind: ComponentKind,
    /// Existing component path; `None` for a component not yet saved.
    pub path: Option<String>,
    pub name: String,
    pub tags: Vec<String>,
    pub content: String,
    original_content: String,
    /// Byte offset into `content`, always on a char boundary.
    pub cursor: usize,
    pub mode: EditorMode,
    insertion_point: Option<usize>,
    pub scroll: usize,
}

impl EditorState {
    /// Load a buffer for editing; the dirty flag starts cleared.
    pub fn start_editing(
        path: Option<String>,
        name: impl Into<String>,
        kind: ComponentKind,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        let content = content.into();
        EditorState {
            kind,
            path,
            name: name.into(),
            tags,
            original_content: content.clone(),
            content,
            cursor: 0,
            mode: EditorMode::Normal,
            insertion_point: None,
            scroll: 0,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.content != self.original_content
    }

    /// Replace the whole buffer; dirty = (new content != original).
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.cursor = self.cursor.min(self.content.len());
        while !self.content.is_char_boundary(self.cursor) {
            self.cursor -= 1;
        }
    }

    pub fn mark_saved(&mut self) {
        self.original_content = self.content.clone();
    }

    // === Text editing ===

    pub fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn insert_str(&mut self, s: &str) {
        self.content.insert_str(self.cursor, s);
        self.cursor += s.len();
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(&self.content, self.cursor);
        self.content.replace_range(prev..self.cursor, "");
        self.cursor = prev;
    }

    pub fn delete_forward(&mut self) {
        if self.cursor >= self.content.len() {
            return;
        }
        let next = next_boundary(&self.content, self.cursor);
        self.content.replace_range(self.cursor..next, "");
    }

    // === Cursor movement ===

    pub fn move_left(&mut self) {
        self.cursor = prev_boundary(&self.content, self.cursor);
    }

    pub fn move_right(&mut self) {
        self.cursor = next_boundary(&self.content, self.cursor);
    }

    pub fn move_line_start(&mut self) {
        let (start, _) = line_bounds(&self.content, self.cursor);
        self.cursor = start;
    }

    pub fn move_line_end(&mut self) {
        let (_, end) = line_bounds(&self.content, self.cursor);
        self.cursor = end;
    }

    pub fn move_up(&mut self) {
        let (start, _) = line_bounds(&self.content, self.cursor);
        if start == 0 {
            return;
        }
        let col = char_col(&self.content, start, self.cursor);
        let prev_end = start - 1;
        let (prev_start, _) = line_bounds(&self.content, prev_end);
        self.cursor = offset_at_col(&self.content, prev_start, prev_end, col);
    }

    pub fn move_down(&mut self) {
        let (start, end) = line_bounds(&self.content, self.cursor);
        if end >= self.content.len() {
            return;
        }
        let col = char_col(&self.content, start, self.cursor);
        let next_start = end + 1;
        let (_, next_end) = line_bounds(&self.content, next_start);
        self.cursor = offset_at_col(&self.content, next_start, next_end, col);
    }

    /// Zero-based (line, column) of the cursor, in chars.
    pub fn cursor_position(&self) -> (usize, usize) {
        let line = self.content[..self.cursor].matches('\n').count();
        let (start, _) = line_bounds(&self.content, self.cursor);
        (line, char_col(&self.content, start, self.cursor))
    }

    // === File picking ===

    /// Capture the current cursor as the insertion point and switch to
    /// file-picking mode.
    pub fn start_file_picker(&mut self) {
        self.insertion_point = Some(self.cursor);
        self.mode = EditorMode::FilePicking;
    }

    /// Insert a reference token at the captured point and return to
    /// normal mode, cursor placed after the token.
    pub fn confirm_file_pick(&mut self, picked: &str) {
        let at = self.insertion_point.take().unwrap_or(self.cursor);
        let token = format!("@{}", picked);
        self.content.insert_str(at, &token);
        self.cursor = at + token.len();
        self.mode = EditorMode::Normal;
    }

    pub fn cancel_file_pick(&mut self) {
        self.insertion_point = None;
        self.mode = EditorMode::Normal;
    }
}

fn prev_boundary(s: &str, at: usize) -> usize {
    s[..at]
        .chars()
        .next_back()
        .map(|c| at - c.len_utf8())
        .unwrap_or(0)
}

fn next_boundary(s: &str, at: usize) -> usize {
    s[at..]
        .chars()
        .next()
        .map(|c| at + c.len_utf8())
        .unwrap_or(at)
}

/// Byte bounds of the line containing `at`, excluding the newline.
fn line_bounds(s: &str, at: usize) -> (usize, usize) {
    let start = s[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = s[at..].find('\n').map(|i| at + i).unwrap_or(s.len());
    (start, end)
}

/// Char column of `at` within the line starting at `start`.
fn char_col(s: &str, start: usize, at: usize) -> usize {
    s[start..at].chars().count()
}

/// Byte offset of the char at column `col` within [start, end], clamped
/// to the line end.
fn offset_at_col(s: &str, start: usize, end: usize, col: usize) -> usize {
    let mut offset = start;
    for (i, c) in s[start..end].chars().enumerate() {
        if i == col {
            return offset;
        }
        offset += c.len_utf8();
    }
    end
}
