//! Editor view: a plain-text buffer with a visible cursor, name/tags
//! header, and the file picker overlay while in picking mode.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use crate::tui::app::App;
use crate::tui::editor::EditorState;
use crate::tui::ui::kind_badge;

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let Some(editor) = &app.editor else {
        return;
    };

    let rows = Layout::vertical([Constraint::Length(2), Constraint::Min(4)]).split(area);
    draw_header(frame, editor, rows[0]);
    draw_buffer(frame, editor, rows[1]);
}

fn draw_header(frame: &mut Frame, editor: &EditorState, area: Rect) {
    let mut spans = vec![
        kind_badge(editor.kind),
        Span::styled(
            format!("{} ", editor.name),
            Style::default().fg(Color::White).bold(),
        ),
    ];
    if editor.is_dirty() {
        spans.push(Span::styled("[+]", Style::default().fg(Color::Yellow)));
    }
    for tag in &editor.tags {
        spans.push(Span::styled(
            format!(" #{}", tag),
            Style::default().fg(Color::Blue),
        ));
    }
    if editor.path.is_none() {
        spans.push(Span::styled(
            "  (unsaved)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_buffer(frame: &mut Frame, editor: &EditorState, area: Rect) {
    let (cursor_line, cursor_col) = editor.cursor_position();
    let block = Block::default()
        .title(format!(" {}:{} ", cursor_line + 1, cursor_col + 1))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height as usize;
    let lines: Vec<&str> = editor.content.split('\n').collect();
    let rendered: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(editor.scroll)
        .take(visible)
        .map(|(i, raw)| {
            if i == cursor_line {
                render_cursor_line(raw, cursor_col)
            } else {
                Line::from(Span::raw((*raw).to_string()))
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(rendered), inner);
}

/// Show the cursor as a reversed cell, including one past the line end.
fn render_cursor_line(raw: &str, cursor_col: usize) -> Line<'static> {
    let chars: Vec<char> = raw.chars().collect();
    let before: String = chars.iter().take(cursor_col).collect();
    let at: String = chars
        .get(cursor_col)
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = chars.iter().skip(cursor_col + 1).collect();
    Line::from(vec![
        Span::raw(before),
        Span::styled(at, Style::default().add_modifier(Modifier::REVERSED)),
        Span::raw(after),
    ])
}
