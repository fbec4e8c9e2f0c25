//! The floating prompt card: a pure view of the session plus placement.

use html_escape::encode_text;

use crate::anchor::Surface;
use crate::capture::commands::{self, Segment};
use crate::capture::{Phase, Platform, Session};
use crate::page::{Page, Rect};

pub const OVERLAY_WIDTH: f64 = 420.0;
/// Horizontal room kept free to the right of the card
const RIGHT_CLEARANCE: f64 = 440.0;
const GAP: f64 = 8.0;
const PRODUCT: &str = "slash-prompt";
pub const CANCEL_HINT: &str = "Esc to cancel";

/// Page coordinates (viewport position plus scroll)
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OverlayBody {
    Editing(Vec<Segment>),
    Sending,
    Error(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionRow {
    pub token: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayView {
    /// `None` when nothing on the page reports a bounding box
    pub position: Option<Position>,
    pub title: String,
    pub body: OverlayBody,
    pub include_context: bool,
    pub suggestions: Vec<SuggestionRow>,
    pub cancel_hint: &'static str,
}

pub fn render(page: &Page, session: &Session, platform: Platform) -> OverlayView {
    let (title, body) = match session.phase() {
        Phase::Editing => (
            format!("{PRODUCT} · {} to send", platform.submit_shortcut()),
            OverlayBody::Editing(commands::segments(session.buffer().as_str())),
        ),
        Phase::Sending { .. } => (PRODUCT.to_string(), OverlayBody::Sending),
        Phase::Failed { message } => (PRODUCT.to_string(), OverlayBody::Error(message.clone())),
    };

    let suggestions = if session.suggestions().is_visible() && *session.phase() == Phase::Editing {
        let selected = session.suggestions().selected_index();
        session
            .suggestions()
            .matches()
            .iter()
            .enumerate()
            .map(|(i, suggestion)| SuggestionRow {
                token: suggestion.token,
                label: suggestion.label,
                selected: i == selected,
            })
            .collect()
    } else {
        Vec::new()
    };

    OverlayView {
        position: anchor_rect(page, session.surface()).map(|rect| place(page, rect)),
        title,
        body,
        include_context: session.include_context(),
        suggestions,
        cancel_hint: CANCEL_HINT,
    }
}

/// Box the card hangs from: the caret's container in rich text (falling back
/// to the editable root), or the field itself
fn anchor_rect(page: &Page, surface: Surface) -> Option<Rect> {
    match surface {
        Surface::Flat(field) => page.rect(field),
        Surface::Rich(root) => {
            let mut current = page.selection().map(|range| range.start.node);
            while let Some(node) = current {
                if let Some(rect) = page.rect(node).filter(|rect| !rect.is_empty()) {
                    return Some(rect);
                }
                if node == root {
                    break;
                }
                current = page.parent(node);
            }
            page.rect(root)
        }
    }
}

/// Just below and right of `rect`, never past the viewport's right edge
fn place(page: &Page, rect: Rect) -> Position {
    let viewport = page.viewport();
    let top = (rect.bottom() + GAP).max(GAP) + viewport.scroll_y;
    let left = (viewport.width - RIGHT_CLEARANCE).min(rect.x + GAP).max(0.0) + viewport.scroll_x;
    Position { top, left }
}

impl OverlayView {
    /// Markup for hosts that draw the card into a real page
    pub fn to_html(&self) -> String {
        let mut lines = Vec::new();

        let style = match self.position {
            Some(Position { top, left }) => {
                format!(" style=\"top:{top}px;left:{left}px;width:{OVERLAY_WIDTH}px\"")
            }
            None => String::new(),
        };
        lines.push(format!("<div class=\"slash-prompt\"{style}>"));
        lines.push(format!("  <div class=\"title\">{}</div>", encode_text(&self.title)));

        lines.push(match &self.body {
            OverlayBody::Editing(segments) => {
                let buffer: String = segments
                    .iter()
                    .map(|segment| {
                        if segment.is_command {
                            format!("<span class=\"cmd\">{}</span>", encode_text(&segment.text))
                        } else {
                            encode_text(&segment.text).into_owned()
                        }
                    })
                    .collect();
                format!("  <div class=\"buffer\">{buffer}</div>")
            }
            OverlayBody::Sending => "  <div class=\"status\">Sending…</div>".to_string(),
            OverlayBody::Error(message) => {
                format!("  <div class=\"error\">{}</div>", encode_text(message))
            }
        });

        let checked = if self.include_context { " checked" } else { "" };
        lines.push(format!(
            "  <label class=\"context\"><input type=\"checkbox\"{checked}> Include context</label>"
        ));

        if !self.suggestions.is_empty() {
            lines.push("  <ul class=\"suggestions\">".to_string());
            for (i, row) in self.suggestions.iter().enumerate() {
                let class = if row.selected { " class=\"selected\"" } else { "" };
                lines.push(format!(
                    "    <li{class} data-index=\"{i}\"><b>{}</b> {}</li>",
                    encode_text(row.token),
                    encode_text(row.label)
                ));
            }
            lines.push("  </ul>".to_string());
        }

        lines.push(format!("  <div class=\"hint\">{}</div>", encode_text(self.cancel_hint)));
        lines.push("</div>".to_string());
        lines.join("\n")
    }
}
