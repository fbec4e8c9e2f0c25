use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use slash_prompt_engine::page::{BoundaryRange, Edit, EventKind, NodeKind};
use slash_prompt_engine::{
    EngineConfig, Generator, Key, KeyOutcome, KeyPress, Modifiers, NodeId, OverlayHit, Page,
    PendingGeneration, Point, PointerOutcome, PointerTarget, PromptEngine, Resolution, SessionId,
    TextField,
};

use crate::generation::{Completed, spawn_generation};

/// Which simulated surface has focus
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pane {
    Flat,
    Rich,
}

/// Screen regions from the last draw, used for mouse hit-testing
#[derive(Clone, Debug, Default)]
pub struct HitAreas {
    pub flat: ratatui::layout::Rect,
    pub rich: ratatui::layout::Rect,
    pub overlay: Option<OverlayArea>,
}

#[derive(Clone, Debug, Default)]
pub struct OverlayArea {
    pub area: ratatui::layout::Rect,
    pub toggle_row: u16,
    pub first_suggestion_row: u16,
    pub suggestion_count: usize,
}

impl OverlayArea {
    fn hit(&self, row: u16) -> OverlayHit {
        if row == self.toggle_row {
            return OverlayHit::ContextToggle;
        }
        if row >= self.first_suggestion_row {
            let index = usize::from(row - self.first_suggestion_row);
            if index < self.suggestion_count {
                return OverlayHit::Suggestion(index);
            }
        }
        OverlayHit::Card
    }
}

pub struct App<G> {
    pub page: Page,
    pub engine: PromptEngine,
    pub flat: NodeId,
    pub rich: NodeId,
    pub focus: Pane,
    pub areas: HitAreas,
    pub status: String,
    pub should_quit: bool,
    generator: Arc<G>,
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
    failure_deadline: Option<(SessionId, Instant)>,
}

impl<G: Generator + Send + Sync + 'static> App<G> {
    pub fn new(config: EngineConfig, generator: G) -> Result<Self> {
        let mut page = Page::new();
        let document = page.document();

        let flat = page.create_field(TextField::textarea("").with_framework_tracking());
        let rich = page.create_editable("div");
        let first_line = page.create_text("");
        page.append_child(document, flat)?;
        page.append_child(document, rich)?;
        page.append_child(rich, first_line)?;
        page.focus(flat);

        let (tx, rx) = mpsc::channel();
        Ok(Self {
            page,
            engine: PromptEngine::new(config),
            flat,
            rich,
            focus: Pane::Flat,
            areas: HitAreas::default(),
            status: "Type /ai in either box to start a prompt".to_string(),
            should_quit: false,
            generator: Arc::new(generator),
            tx,
            rx,
            failure_deadline: None,
        })
    }

    pub fn on_key(&mut self, event: KeyEvent) {
        let press = to_key_press(event);
        match self.engine.handle_key(&mut self.page, press) {
            KeyOutcome::Consumed => {}
            KeyOutcome::Submitted(pending) => self.submit(pending),
            KeyOutcome::PassThrough => self.default_key_action(event, press),
        }
        self.drain_page_events();
    }

    pub fn on_mouse_down(&mut self, column: u16, row: u16) {
        let position = ratatui::layout::Position::new(column, row);
        let target = match &self.areas.overlay {
            Some(overlay) if overlay.area.contains(position) => {
                PointerTarget::Overlay(overlay.hit(row))
            }
            _ if self.areas.rich.contains(position) => PointerTarget::Page(self.rich),
            _ => PointerTarget::Page(self.flat),
        };

        let outcome = self.engine.handle_pointer_down(&mut self.page, target);
        if outcome != PointerOutcome::Absorbed
            && let PointerTarget::Page(node) = target
        {
            self.focus_pane(if node == self.rich { Pane::Rich } else { Pane::Flat });
        }
    }

    pub fn on_focus_lost(&mut self) {
        self.engine.handle_blur(&mut self.page);
    }

    /// Pick up finished generations and expire failure messages
    pub fn tick(&mut self) {
        while let Ok(completed) = self.rx.try_recv() {
            let resolution = self
                .engine
                .resolve(&mut self.page, completed.ticket, completed.response);
            match resolution {
                Resolution::Inserted(outcome) => {
                    self.status = format!("Inserted ({outcome:?})");
                }
                Resolution::Failed { display_for } => {
                    self.failure_deadline =
                        Some((completed.ticket.session, Instant::now() + display_for));
                }
                Resolution::Discarded => {
                    self.status = "Ignored a reply for a cancelled prompt".to_string();
                }
            }
        }

        if let Some((session, deadline)) = self.failure_deadline
            && Instant::now() >= deadline
        {
            self.engine.expire_failure(&mut self.page, session);
            self.failure_deadline = None;
        }
        self.drain_page_events();
    }

    fn submit(&mut self, pending: PendingGeneration) {
        log::info!("sending prompt ({} chars)", pending.request.prompt_text.chars().count());
        self.status = "Sending…".to_string();
        spawn_generation(Arc::clone(&self.generator), pending, self.tx.clone());
    }

    /// What the page does with a key the engine let through
    fn default_key_action(&mut self, event: KeyEvent, press: KeyPress) {
        if press.modifiers.ctrl && matches!(event.code, KeyCode::Char('q') | KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }
        if press.key == Key::Tab {
            self.focus_pane(match self.focus {
                Pane::Flat => Pane::Rich,
                Pane::Rich => Pane::Flat,
            });
            return;
        }
        if press.modifiers.is_chord() {
            return;
        }

        let edited = match self.focus {
            Pane::Flat => self.edit_flat(event.code, press),
            Pane::Rich => self.edit_rich(press),
        };
        if let Some(target) = edited {
            self.engine.handle_input(&mut self.page, target);
        }
    }

    fn focus_pane(&mut self, pane: Pane) {
        self.focus = pane;
        match pane {
            Pane::Flat => self.page.focus(self.flat),
            Pane::Rich => {
                self.page.focus(self.rich);
                let inside = self
                    .page
                    .selection()
                    .is_some_and(|range| self.page.contains(self.rich, range.start.node));
                if !inside {
                    let end = self.page.children(self.rich).len();
                    self.page.collapse_selection(Point::new(self.rich, end));
                }
            }
        }
    }

    /// Apply a keystroke to the textarea. Returns the node to fire `input` on.
    fn edit_flat(&mut self, code: KeyCode, press: KeyPress) -> Option<NodeId> {
        let field = self.page.field(self.flat).ok()?;
        let caret = field.caret();
        let len = field.char_len();

        let edit = match (press.key, code) {
            (Key::Char(c), _) => Edit::Insert {
                at: caret,
                text: c.to_string(),
            },
            (Key::Enter, _) => Edit::Insert {
                at: caret,
                text: "\n".to_string(),
            },
            (Key::Backspace, _) if caret > 0 => Edit::Delete {
                range: caret - 1..caret,
            },
            (_, KeyCode::Left) => {
                let field = self.page.field_mut(self.flat).ok()?;
                field.set_caret(caret.saturating_sub(1));
                return None;
            }
            (_, KeyCode::Right) => {
                let field = self.page.field_mut(self.flat).ok()?;
                field.set_caret((caret + 1).min(len));
                return None;
            }
            _ => return None,
        };

        let new_caret = match &edit {
            Edit::Insert { at, text } => at + text.chars().count(),
            Edit::Delete { range } => range.start,
        };
        let value = field.apply(&edit);
        let field = self.page.field_mut(self.flat).ok()?;
        field.set_native_value(value);
        field.set_caret(new_caret);
        self.page.dispatch(self.flat, EventKind::Input);
        Some(self.flat)
    }

    /// Apply a keystroke at the rich-text selection
    fn edit_rich(&mut self, press: KeyPress) -> Option<NodeId> {
        let at = self
            .page
            .selection()
            .map(|range| range.start)
            .filter(|point| self.page.contains(self.rich, point.node))?;

        let caret = match press.key {
            Key::Char(c) => self.type_rich(at, &c.to_string())?,
            Key::Enter => {
                let br = self.page.create_line_break();
                self.page.insert_node(at, br).ok()?;
                let after = self.page.point_after(br)?;
                let line = self.page.create_text("");
                self.page.insert_node(after, line).ok()?;
                Point::new(line, 0)
            }
            Key::Backspace => self.delete_rich(at)?,
            _ => return None,
        };

        self.page.collapse_selection(caret);
        self.page.dispatch(self.rich, EventKind::Input);
        Some(caret.node)
    }

    fn type_rich(&mut self, at: Point, text: &str) -> Option<Point> {
        if self.page.text(at.node).is_some() {
            self.page.insert_data(at.node, at.offset, text).ok()?;
            return Some(Point::new(at.node, at.offset + text.chars().count()));
        }
        let node = self.page.create_text(text);
        self.page.insert_node(at, node).ok()?;
        Some(Point::new(node, text.chars().count()))
    }

    fn delete_rich(&mut self, at: Point) -> Option<Point> {
        if self.page.text(at.node).is_some() && at.offset > 0 {
            let range = BoundaryRange::new(Point::new(at.node, at.offset - 1), at);
            return self.page.delete_contents(&range).ok();
        }

        // At the start of a node: remove whatever sits before it
        let before = if self.page.text(at.node).is_some() {
            self.page.point_before(at.node)?
        } else {
            at
        };
        let previous = *self.page.children(before.node).get(before.offset.checked_sub(1)?)?;
        let previous_len = match self.page.kind(previous) {
            Some(NodeKind::Text(text)) => text.chars().count(),
            _ => 0,
        };
        if previous_len > 0 {
            let range = BoundaryRange::new(
                Point::new(previous, previous_len - 1),
                Point::new(previous, previous_len),
            );
            return self.page.delete_contents(&range).ok();
        }

        self.page.remove(previous).ok()?;
        if self.page.text(at.node).is_some() {
            Some(at)
        } else {
            Some(Point::new(at.node, at.offset - 1))
        }
    }

    /// Play the part of the host page's own listeners
    fn drain_page_events(&mut self) {
        for event in self.page.take_events() {
            if event.target == self.flat
                && event.kind == EventKind::Input
                && let Ok(field) = self.page.field_mut(self.flat)
                && field.framework_sees_change()
            {
                log::debug!("host framework picked up a textarea change");
                field.framework_acknowledge();
            }
        }
    }

    pub fn is_sending(&self) -> bool {
        self.engine
            .session()
            .is_some_and(|session| matches!(session.phase(), slash_prompt_engine::Phase::Sending { .. }))
    }
}

fn to_key_press(event: KeyEvent) -> KeyPress {
    let modifiers = Modifiers {
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        meta: event
            .modifiers
            .intersects(KeyModifiers::SUPER | KeyModifiers::META),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
    };
    let key = match event.code {
        // Legacy terminals report Ctrl+Enter as Ctrl+J
        KeyCode::Char('j') if modifiers.ctrl => Key::Enter,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab | KeyCode::BackTab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Esc => Key::Escape,
        KeyCode::Up => Key::ArrowUp,
        KeyCode::Down => Key::ArrowDown,
        _ => Key::Other,
    };
    KeyPress::new(key, modifiers)
}
