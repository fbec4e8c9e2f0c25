use std::fmt;

use uuid::Uuid;

use super::commands::{self, Suggestion};
use crate::anchor::{Anchor, Surface};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Observable engine mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Idle,
    CapturingFlat,
    CapturingRich,
}

/// Where a capture session is within its lifetime
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Accepting keystrokes into the buffer
    Editing,
    /// A generation request is outstanding
    Sending { request: u64 },
    /// The request failed; the message is on screen until the session expires
    Failed { message: String },
}

/// Keystrokes typed since the trigger
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptBuffer(String);

impl PromptBuffer {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn push(&mut self, c: char) {
        self.0.push(c);
    }

    pub fn pop(&mut self) -> Option<char> {
        self.0.pop()
    }

    pub fn last_token(&self) -> &str {
        commands::last_token(&self.0)
    }

    /// Swap the trailing word for `token`
    pub fn replace_last_token(&mut self, token: &str) {
        let keep = self.0.len() - self.last_token().len();
        self.0.truncate(keep);
        self.0.push_str(token);
    }

    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Command palette state derived from the buffer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Suggestions {
    matches: Vec<&'static Suggestion>,
    selected: usize,
    visible: bool,
}

impl Suggestions {
    /// Recompute from the buffer's last token.
    ///
    /// The selection goes back to the first entry whenever the set of
    /// matches changes.
    pub fn refresh(&mut self, buffer: &PromptBuffer) {
        let matches = commands::matching(buffer.last_token());
        if matches != self.matches {
            self.selected = 0;
            self.matches = matches;
        }
        self.visible = !self.matches.is_empty();
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn matches(&self) -> &[&'static Suggestion] {
        &self.matches
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&'static Suggestion> {
        self.matches.get(self.selected).copied()
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index < self.matches.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    pub fn move_down(&mut self) {
        if !self.matches.is_empty() {
            self.selected = (self.selected + 1) % self.matches.len();
        }
    }

    pub fn move_up(&mut self) {
        if !self.matches.is_empty() {
            let len = self.matches.len();
            self.selected = (self.selected + len - 1) % len;
        }
    }
}

/// The one active capture session
#[derive(Debug)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) surface: Surface,
    pub(crate) anchor: Anchor,
    pub(crate) buffer: PromptBuffer,
    pub(crate) suggestions: Suggestions,
    pub(crate) include_context: bool,
    pub(crate) phase: Phase,
}

impl Session {
    pub(crate) fn new(surface: Surface, anchor: Anchor, include_context: bool) -> Self {
        Self {
            id: SessionId::new(),
            surface,
            anchor,
            buffer: PromptBuffer::default(),
            suggestions: Suggestions::default(),
            include_context,
            phase: Phase::Editing,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn buffer(&self) -> &PromptBuffer {
        &self.buffer
    }

    pub fn suggestions(&self) -> &Suggestions {
        &self.suggestions
    }

    pub fn include_context(&self) -> bool {
        self.include_context
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn mode(&self) -> Mode {
        match self.surface {
            Surface::Flat(_) => Mode::CapturingFlat,
            Surface::Rich(_) => Mode::CapturingRich,
        }
    }

    pub(crate) fn type_char(&mut self, c: char) {
        self.buffer.push(c);
        self.suggestions.refresh(&self.buffer);
    }

    pub(crate) fn backspace(&mut self) {
        self.buffer.pop();
        self.suggestions.refresh(&self.buffer);
    }

    /// Put the highlighted suggestion into the buffer and close the list
    pub(crate) fn accept_suggestion(&mut self) {
        if let Some(suggestion) = self.suggestions.selected() {
            self.buffer.replace_last_token(suggestion.token);
        }
        self.suggestions.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use crate::page::TextField;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        let mut page = Page::new();
        let field = page.create_field(TextField::textarea(""));
        Session::new(
            Surface::Flat(field),
            Anchor::Flat { field, offset: 0 },
            false,
        )
    }

    fn typed(text: &str) -> Session {
        let mut session = session();
        for c in text.chars() {
            session.type_char(c);
        }
        session
    }

    #[test]
    fn type_then_backspace_round_trips() {
        for start in ["", "abc", "with /date", "ünï"] {
            let mut session = typed(start);
            let before = session.buffer().clone();
            session.type_char('é');
            session.backspace();
            assert_eq!(session.buffer(), &before);
        }
    }

    #[test]
    fn backspace_on_empty_buffer_is_harmless() {
        let mut session = session();
        session.backspace();
        assert!(session.buffer().is_empty());
    }

    #[test]
    fn suggestions_appear_for_command_prefix() {
        let session = typed("hello /");
        assert!(session.suggestions().is_visible());
        assert_eq!(
            session.suggestions().matches().len(),
            commands::CATALOG.len()
        );

        let session = typed("hello /x");
        assert!(!session.suggestions().is_visible());

        let session = typed("hello /date ");
        assert!(!session.suggestions().is_visible());
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut session = typed("/da");
        assert_eq!(session.suggestions().matches().len(), 2);

        session.suggestions.move_up();
        assert_eq!(session.suggestions().selected_index(), 1);
        session.suggestions.move_down();
        assert_eq!(session.suggestions().selected_index(), 0);
        session.suggestions.move_down();
        session.suggestions.move_down();
        assert_eq!(session.suggestions().selected_index(), 0);
    }

    #[test]
    fn selection_resets_when_matches_change() {
        let mut session = typed("/t");
        session.suggestions.move_down();
        assert_eq!(session.suggestions().selected_index(), 1);

        session.type_char('i');
        assert_eq!(session.suggestions().selected_index(), 0);
    }

    #[test]
    fn selection_survives_when_matches_are_unchanged() {
        let mut session = typed("/dat");
        session.suggestions.move_down();
        session.type_char('e');
        // "/date" still matches both /date and /datetime
        assert_eq!(session.suggestions().selected_index(), 1);
    }

    #[test]
    fn accepting_replaces_last_token_only() {
        let mut session = typed("note for /to");
        session.accept_suggestion();
        assert_eq!(session.buffer().as_str(), "note for /tomorrow");
        assert!(!session.suggestions().is_visible());
    }

    #[test]
    fn accepting_without_matches_leaves_buffer() {
        let mut session = typed("plain");
        session.accept_suggestion();
        assert_eq!(session.buffer().as_str(), "plain");
    }
}
