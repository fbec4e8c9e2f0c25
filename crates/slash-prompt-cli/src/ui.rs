use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use slash_prompt_engine::page::NodeKind;
use slash_prompt_engine::{
    Generator, NodeId, OverlayBody, OverlayView, Page, Point, Viewport,
};

use crate::app::{App, OverlayArea, Pane};

/// Page pixels per terminal cell, so overlay placement works in page units
const CELL_WIDTH: f64 = 8.0;
const CELL_HEIGHT: f64 = 16.0;

pub fn draw<G: Generator + Send + Sync + 'static>(f: &mut Frame, app: &mut App<G>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(45),
            Constraint::Min(2),
        ])
        .split(f.area());

    app.areas.flat = chunks[0];
    app.areas.rich = chunks[1];
    sync_geometry(app, f.area());

    // Textarea
    let field = app.page.field(app.flat).ok();
    let value = field.map(|field| field.value()).unwrap_or_default();
    let caret = field.map_or(0, |field| field.caret());
    draw_surface(f, chunks[0], "textarea", &value, app.focus == Pane::Flat);
    if app.focus == Pane::Flat {
        f.set_cursor_position(cursor_in(chunks[0], &value, caret));
    }

    // Rich-text editor
    let (rich, rich_caret) = rich_text(&app.page, app.rich);
    draw_surface(
        f,
        chunks[1],
        "contenteditable",
        &rich,
        app.focus == Pane::Rich,
    );
    if app.focus == Pane::Rich
        && let Some(caret) = rich_caret
    {
        f.set_cursor_position(cursor_in(chunks[1], &rich, caret));
    }

    // Status and help
    let help = Paragraph::new(vec![
        Line::from(Span::styled(
            app.status.clone(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(vec![
            Span::raw("Ctrl+Q: Quit | "),
            Span::raw("Tab: Switch box | "),
            Span::raw("/ai: Prompt | "),
            Span::raw("Ctrl+Enter (Ctrl+J): Send | "),
            Span::raw("Esc: Cancel"),
        ]),
    ]);
    f.render_widget(help, chunks[2]);

    app.areas.overlay = app
        .engine
        .overlay(&app.page)
        .map(|view| draw_overlay(f, &view));
}

/// Give the page model the geometry it would have in a browser
fn sync_geometry<G>(app: &mut App<G>, screen: Rect) {
    app.page.set_viewport(Viewport {
        width: f64::from(screen.width) * CELL_WIDTH,
        height: f64::from(screen.height) * CELL_HEIGHT,
        scroll_x: 0.0,
        scroll_y: 0.0,
    });
    for (node, area) in [(app.flat, app.areas.flat), (app.rich, app.areas.rich)] {
        if let Err(e) = app.page.set_rect(node, to_page_rect(area)) {
            log::debug!("could not size {node:?}: {e}");
        }
    }
}

fn to_page_rect(area: Rect) -> slash_prompt_engine::Rect {
    slash_prompt_engine::Rect::new(
        f64::from(area.x) * CELL_WIDTH,
        f64::from(area.y) * CELL_HEIGHT,
        f64::from(area.width) * CELL_WIDTH,
        f64::from(area.height) * CELL_HEIGHT,
    )
}

fn draw_surface(f: &mut Frame, area: Rect, title: &str, text: &str, focused: bool) {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let lines: Vec<Line> = text.split('\n').map(|line| Line::from(line.to_string())).collect();
    let surface = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title.to_string()),
    );
    f.render_widget(surface, area);
}

/// Terminal cell for a char index into multi-line `text` drawn inside `area`
fn cursor_in(area: Rect, text: &str, caret: usize) -> Position {
    let before: String = text.chars().take(caret).collect();
    let row = before.matches('\n').count();
    let col = before.rsplit('\n').next().map_or(0, |line| line.chars().count());
    let x = area.x.saturating_add(1).saturating_add(u16::try_from(col).unwrap_or(u16::MAX));
    let y = area.y.saturating_add(1).saturating_add(u16::try_from(row).unwrap_or(u16::MAX));
    Position::new(
        x.min(area.right().saturating_sub(2)),
        y.min(area.bottom().saturating_sub(2)),
    )
}

/// Visible text of a rich root (line breaks as `\n`) and the caret's char index
fn rich_text(page: &Page, root: NodeId) -> (String, Option<usize>) {
    let caret = page.selection().map(|range| range.start);
    let mut out = String::new();
    let mut caret_at = None;
    walk(page, root, caret, &mut out, &mut caret_at);
    (out, caret_at)
}

fn walk(
    page: &Page,
    node: NodeId,
    caret: Option<Point>,
    out: &mut String,
    caret_at: &mut Option<usize>,
) {
    let caret_here = caret.filter(|point| point.node == node);
    match page.kind(node) {
        Some(NodeKind::Text(text)) => {
            if let Some(point) = caret_here {
                *caret_at = Some(out.chars().count() + point.offset);
            }
            out.push_str(text);
        }
        Some(NodeKind::LineBreak) => out.push('\n'),
        _ => {
            let children = page.children(node);
            for (i, &child) in children.iter().enumerate() {
                if caret_here.is_some_and(|point| point.offset == i) {
                    *caret_at = Some(out.chars().count());
                }
                walk(page, child, caret, out, caret_at);
            }
            if caret_here.is_some_and(|point| point.offset >= children.len()) {
                *caret_at = Some(out.chars().count());
            }
        }
    }
}

fn draw_overlay(f: &mut Frame, view: &OverlayView) -> OverlayArea {
    let mut lines = Vec::new();

    lines.push(match &view.body {
        OverlayBody::Editing(segments) => Line::from(
            segments
                .iter()
                .map(|segment| {
                    if segment.is_command {
                        Span::styled(
                            segment.text.clone(),
                            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                        )
                    } else {
                        Span::raw(segment.text.clone())
                    }
                })
                .collect::<Vec<_>>(),
        ),
        OverlayBody::Sending => Line::from(Span::styled(
            "Sending…",
            Style::default().fg(Color::DarkGray),
        )),
        OverlayBody::Error(message) => Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )),
    });

    let toggle = if view.include_context { "[x]" } else { "[ ]" };
    lines.push(Line::from(format!("{toggle} Include context")));

    for row in &view.suggestions {
        let style = if row.selected {
            Style::default().bg(Color::Yellow).fg(Color::Black)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", row.token), style.add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {}", row.label), style),
        ]));
    }
    lines.push(Line::from(Span::styled(
        view.cancel_hint,
        Style::default().fg(Color::DarkGray),
    )));

    let screen = f.area();
    let width = (slash_prompt_engine::overlay::OVERLAY_WIDTH / CELL_WIDTH) as u16;
    let width = width.min(screen.width);
    let height = u16::try_from(lines.len())
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(screen.height);
    let (x, y) = match view.position {
        Some(position) => (
            (position.left / CELL_WIDTH) as u16,
            (position.top / CELL_HEIGHT) as u16,
        ),
        None => (0, 0),
    };
    let area = Rect::new(
        x.min(screen.width.saturating_sub(width)),
        y.min(screen.height.saturating_sub(height)),
        width,
        height,
    );

    let card = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(view.title.clone()),
    );
    f.render_widget(Clear, area);
    f.render_widget(card, area);

    OverlayArea {
        area,
        toggle_row: area.y + 2,
        first_suggestion_row: area.y + 3,
        suggestion_count: view.suggestions.len(),
    }
}
