//! Main list view: pipelines and components on the left, a live preview
//! of the selection on the right.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::tui::app::{App, Entry};
use crate::tui::ui::{kind_badge, token_badge};

pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let layout =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).split(area);
    draw_items(frame, app, layout[0]);
    draw_preview(frame, app, layout[1]);
}

fn draw_items(frame: &mut Frame, app: &App, area: Rect) {
    let archived = app.search_input.contains("status:archived");
    let title = if archived {
        " Archive ".to_string()
    } else {
        format!(
            " Pipelines ({}) / Components ({}) ",
            app.results.pipelines.len(),
            app.results.components.len()
        )
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.entries.is_empty() {
        let empty = Paragraph::new("Nothing here. n=new pipeline, P=new prompt, ?=help")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let visible = inner.height as usize;
    let items: Vec<ListItem> = app
        .entries
        .iter()
        .enumerate()
        .skip(app.list_scroll)
        .take(visible)
        .map(|(i, entry)| render_entry(app, i, *entry))
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn render_entry(app: &App, index: usize, entry: Entry) -> ListItem<'static> {
    let is_cursor = index == app.list_cursor;
    let base = if is_cursor {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    } else {
        Style::default()
    };

    let mut spans: Vec<Span> = Vec::new();
    match entry {
        Entry::Pipeline(i) => {
            let p = &app.results.pipelines[i];
            spans.push(Span::styled(
                " ◆ pipe ",
                Style::default().fg(Color::Magenta),
            ));
            spans.push(Span::styled(p.name.clone(), base.bold()));
            spans.push(Span::styled(
                format!("  ({} component{})", p.components.len(), plural(p.components.len())),
                Style::default().fg(Color::DarkGray),
            ));
            push_tags(&mut spans, &p.tags);
        }
        Entry::Component(i) => {
            let c = &app.results.components[i];
            spans.push(kind_badge(c.kind));
            spans.push(Span::styled(c.display_name.clone(), base));
            spans.push(Span::styled(
                format!("  ~{} tok", c.token_count),
                Style::default().fg(Color::DarkGray),
            ));
            push_tags(&mut spans, &c.tags);
        }
    }
    ListItem::new(Line::from(spans)).style(base)
}

fn push_tags(spans: &mut Vec<Span<'static>>, tags: &[String]) {
    for tag in tags {
        spans.push(Span::styled(
            format!(" #{}", tag),
            Style::default().fg(Color::Blue),
        ));
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn draw_preview(frame: &mut Frame, app: &App, area: Rect) {
    let mut title_spans = vec![Span::raw(format!(" {} ", app.preview_title))];
    if !app.preview.is_empty() {
        title_spans.push(token_badge(app.preview_tokens, app.preview_status()));
    }
    let block = Block::default()
        .title(Line::from(title_spans))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.preview.is_empty() {
        let empty = Paragraph::new("Select an item to preview")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let paragraph = Paragraph::new(app.preview.clone())
        .wrap(Wrap { trim: false })
        .scroll((app.preview_scroll as u16, 0));
    frame.render_widget(paragraph, inner);
}
