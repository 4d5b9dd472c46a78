//! UI rendering for the TUI

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use super::app::{App, Confirm, Screen};
use super::editor::EditorMode;
use super::views::{builder, editor, list};
use super::widgets::file_picker;
use crate::component::ComponentKind;
use crate::compose::TokenStatus;

/// Main draw function - orchestrates all rendering
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let main_layout = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(10),   // Content
        Constraint::Length(1), // Footer/status
    ])
    .split(area);

    draw_header(frame, app, main_layout[0]);

    match app.screen {
        Screen::List => list::draw(frame, app, main_layout[1]),
        Screen::Builder => builder::draw(frame, app, main_layout[1]),
        Screen::Editor => editor::draw(frame, app, main_layout[1]),
    }

    draw_status(frame, app, main_layout[2]);

    // Overlays, innermost last
    if app.show_tags {
        draw_tags_overlay(frame, app, area);
    }
    if let Some(picker) = &app.file_picker {
        if app
            .editor
            .as_ref()
            .map(|e| e.mode == EditorMode::FilePicking)
            .unwrap_or(false)
        {
            file_picker::draw(frame, picker, area);
        }
    }
    if let Some(prompt) = &app.prompt {
        draw_prompt_overlay(frame, prompt, area);
    }
    if let Some(Confirm::Dialog {
        title,
        message,
        warning,
        destructive,
        ..
    }) = &app.confirm
    {
        draw_confirm_dialog(frame, title, message, warning.as_deref(), *destructive, area);
    }
    if app.show_help {
        draw_help_overlay(frame, app, area);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let screen = match app.screen {
        Screen::List => "browse",
        Screen::Builder => "builder",
        Screen::Editor => "editor",
    };
    let mut spans = vec![
        Span::styled(" PLUQQY ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(screen, Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  {}", app.store.root().display()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.searching || !app.search_input.is_empty() {
        spans.push(Span::styled(
            format!("  /{}", app.search_input),
            Style::default().fg(Color::Yellow),
        ));
        if app.searching {
            spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    // Inline confirmations own the status line until answered.
    if let Some(Confirm::Inline {
        message,
        destructive,
        ..
    }) = &app.confirm
    {
        let style = if *destructive {
            Style::default().fg(Color::Black).bg(Color::Red)
        } else {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        };
        frame.render_widget(
            Paragraph::new(format!(" {} ", message)).style(style),
            area,
        );
        return;
    }

    if let Some((message, _)) = &app.status_message {
        frame.render_widget(
            Paragraph::new(format!(" {}", message)).style(Style::default().fg(Color::Yellow)),
            area,
        );
        return;
    }

    let hints = match app.screen {
        Screen::List => {
            " enter=open  e=$EDITOR  n/C/P/R=new  r=rename  a=archive  d=delete  S=set  t=tags  /=search  ?=help  q=quit"
        }
        Screen::Builder => {
            " tab=pane  enter=add  d=remove  K/J=move  n=name  t=tags  s=save  S=set  /=filter  esc=back"
        }
        Screen::Editor => " type to edit  @=insert file ref  ctrl-s=save  ctrl-t=tags  esc=back",
    };
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

// === Shared badges ===

/// Colored kind badge used by every list row.
pub fn kind_badge(kind: ComponentKind) -> Span<'static> {
    let (label, color) = match kind {
        ComponentKind::Context => (" ctx ", Color::Green),
        ComponentKind::Prompt => (" prm ", Color::Cyan),
        ComponentKind::Rules => (" rul ", Color::Yellow),
    };
    Span::styled(label, Style::default().fg(color))
}

/// Token estimate with its status band color.
pub fn token_badge(tokens: usize, status: TokenStatus) -> Span<'static> {
    let color = match status {
        TokenStatus::Good => Color::Green,
        TokenStatus::Warning => Color::Yellow,
        TokenStatus::Danger => Color::Red,
    };
    Span::styled(
        format!("~{} tokens ({}) ", tokens, status.label()),
        Style::default().fg(color),
    )
}

// === Overlays ===

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: (area.width.saturating_sub(width)) / 2,
        y: (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn draw_prompt_overlay(frame: &mut Frame, prompt: &super::app::InputPrompt, area: Rect) {
    let popup = centered_rect(56, 5, area);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(format!(" {} ", prompt.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    let line = Line::from(vec![
        Span::raw(prompt.value.clone()),
        Span::styled("_", Style::default().fg(Color::Cyan)),
    ]);
    frame.render_widget(Paragraph::new(vec![Line::raw(""), line]), inner);
}

fn draw_confirm_dialog(
    frame: &mut Frame,
    title: &str,
    message: &str,
    warning: Option<&str>,
    destructive: bool,
    area: Rect,
) {
    let popup = centered_rect(60, 8, area);
    frame.render_widget(Clear, popup);
    let border = if destructive { Color::Red } else { Color::Yellow };
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let mut lines = vec![Line::raw(""), Line::from(Span::raw(message.to_string()))];
    if let Some(warning) = warning {
        lines.push(Line::from(Span::styled(
            warning.to_string(),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::styled("[y]", Style::default().fg(border).bold()),
        Span::raw(" confirm   "),
        Span::styled("[n]", Style::default().fg(Color::Green).bold()),
        Span::raw(" cancel"),
    ]));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_tags_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let entries = app.registry.list();
    let height = (entries.len() + 6).clamp(8, 22) as u16;
    let popup = centered_rect(64, height, area);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(" Tags (d=delete everywhere, r=reload, x=cancel reload, esc=close) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    if entries.is_empty() {
        let empty = Paragraph::new("No tags yet. Tags appear when components use them.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let visible = inner.height as usize;
    let offset = super::state::calculate_scroll_offset(app.tags_cursor, 0, visible.max(1));
    let items: Vec<ListItem> = entries
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, entry)| {
            let row_style = if i == app.tags_cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            let usage_text = match app.usage_for(&entry.name) {
                Some(u) => format!(
                    "{} component(s), {} pipeline(s)",
                    u.component_count, u.pipeline_count
                ),
                None => "scanning...".to_string(),
            };
            let mut spans = vec![
                Span::styled("● ", Style::default().fg(tag_color(&entry.color))),
                Span::styled(format!("#{:<20}", entry.name), row_style),
                Span::styled(usage_text, Style::default().fg(Color::DarkGray)),
            ];
            if app.in_progress.contains(&entry.name) {
                spans.push(Span::styled(
                    "  deleting...",
                    Style::default().fg(Color::Red),
                ));
            }
            ListItem::new(Line::from(spans)).style(row_style)
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}

/// `#RRGGBB` or a terminal palette index; anything else falls back gray.
fn tag_color(raw: &str) -> Color {
    if let Some(hex) = raw.strip_prefix('#') {
        if hex.len() == 6 {
            if let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            ) {
                return Color::Rgb(r, g, b);
            }
        }
    }
    if let Ok(index) = raw.parse::<u8>() {
        return Color::Indexed(index);
    }
    Color::Gray
}

fn draw_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(66, 22, area);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let text = match app.screen {
        Screen::List => HELP_LIST,
        Screen::Builder => HELP_BUILDER,
        Screen::Editor => HELP_EDITOR,
    };
    frame.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: false }),
        inner,
    );
}

const HELP_LIST: &str = "\
Navigation    j/k or arrows, g/G top/bottom, ctrl-d/u page
Open          enter (pipeline -> builder, component -> editor)
Search        /  query: tag:<name> type:<kind> status:archived words
Create        n pipeline, C context, P prompt, R rules
Edit          e open in $EDITOR
Rename        r (rewrites pipeline references in the same tree)
Archive       a move to/from archive (status:archived to browse it)
Delete        d (asks first)
Set           S compose the selected pipeline into its output file
Tags          t manage tags, x scan for dangling references
Preview       h/l scroll
Quit          q";

const HELP_BUILDER: &str = "\
Panes         tab switches between available and pipeline
Navigate      j/k or arrows
Add           enter or space (duplicates allowed)
Remove        d at the cursor
Reorder       K/J move the entry up/down in its section view
Clear         D empties the sequence
Metadata      n name, t tags
Filter        / filters the available pane (tag:/type: work too)
Save          s saves, S saves and composes the output file
Leave         esc (asks when the sequence has unsaved changes)";

const HELP_EDITOR: &str = "\
Editing       type anywhere; enter, backspace, delete, tab
Move          arrows, home/end
File ref      @ opens the file picker at the cursor; enter inserts
Tags          ctrl-t edit the component's tags
Save          ctrl-s (new components land under their kind directory)
Leave         esc (asks when the buffer has unsaved changes)";
