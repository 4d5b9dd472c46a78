//! Builder view: available components on the left, the pipeline's
//! sequence (grouped by section) on the right, composed preview below.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::tui::app::App;
use crate::tui::builder::{BuilderState, PaneFocus};
use crate::tui::ui::{kind_badge, token_badge};

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let Some(builder) = &app.builder else {
        return;
    };

    let rows = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(8),
        Constraint::Percentage(40),
    ])
    .split(area);

    draw_header(frame, builder, rows[0]);

    let panes =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).split(rows[1]);
    draw_available(frame, app, builder, panes[0]);
    draw_selected(frame, app, builder, panes[1]);
    draw_preview(frame, app, builder, rows[2]);
}

fn draw_header(frame: &mut Frame, builder: &BuilderState, area: Rect) {
    let mut spans = vec![
        Span::styled(
            format!(" {} ", builder.name),
            Style::default().fg(Color::White).bold(),
        ),
    ];
    if builder.is_dirty() {
        spans.push(Span::styled("[+]", Style::default().fg(Color::Yellow)));
    }
    for tag in &builder.tags {
        spans.push(Span::styled(
            format!(" #{}", tag),
            Style::default().fg(Color::Blue),
        ));
    }
    if let Some(out) = &builder.output_path {
        spans.push(Span::styled(
            format!("  -> {}", out),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn pane_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_available(frame: &mut Frame, _app: &App, builder: &BuilderState, area: Rect) {
    let title = if builder.filter.is_empty() {
        " Available (Enter=add, /=filter) ".to_string()
    } else {
        format!(" Available /{}{} ", builder.filter, if builder.filtering { "_" } else { "" })
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(pane_border(builder.focus == PaneFocus::Available));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height as usize;
    let offset =
        crate::tui::state::calculate_scroll_offset(builder.left_cursor, 0, visible.max(1));
    let items: Vec<ListItem> = builder
        .available
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, c)| {
            let style = if i == builder.left_cursor && builder.focus == PaneFocus::Available {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                kind_badge(c.kind),
                Span::styled(c.display_name.clone(), style),
            ]))
            .style(style)
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn draw_selected(frame: &mut Frame, app: &App, builder: &BuilderState, area: Rect) {
    let block = Block::default()
        .title(format!(
            " Pipeline ({}) (d=remove, K/J=move) ",
            builder.selected.len()
        ))
        .borders(Borders::ALL)
        .border_style(pane_border(builder.focus == PaneFocus::Selected));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if builder.selected.is_empty() {
        let empty = Paragraph::new("Add components from the left pane")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let order = builder.display_order(&app.settings);
    let visible = inner.height as usize;
    let offset =
        crate::tui::state::calculate_scroll_offset(builder.right_cursor, 0, visible.max(1));
    let items: Vec<ListItem> = order
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(display_index, &seq_index)| {
            let reference = &builder.selected[seq_index];
            let style = if display_index == builder.right_cursor
                && builder.focus == PaneFocus::Selected
            {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                kind_badge(reference.kind),
                Span::styled(reference.slug().to_string(), style),
                Span::styled(
                    format!("  #{}", seq_index + 1),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
            .style(style)
        })
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn draw_preview(frame: &mut Frame, app: &App, builder: &BuilderState, area: Rect) {
    let title = Line::from(vec![
        Span::raw(" Preview "),
        token_badge(app.builder_tokens, app.builder_token_status()),
    ]);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(app.builder_preview.clone())
        .wrap(Wrap { trim: false })
        .scroll((builder.preview_scroll as u16, 0));
    frame.render_widget(paragraph, inner);
}
