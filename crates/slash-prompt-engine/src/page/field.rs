use std::fmt;
use std::ops::Range;

use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

/// `type` attribute of an `<input>` element
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputType {
    Text,
    Search,
    Email,
    Tel,
    Url,
    Password,
    Number,
    Checkbox,
    Other,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    TextArea,
    Input(InputType),
}

impl FieldKind {
    /// Whether free text can be typed into this control
    pub fn accepts_text(&self) -> bool {
        match self {
            FieldKind::TextArea => true,
            FieldKind::Input(kind) => matches!(
                kind,
                InputType::Text
                    | InputType::Search
                    | InputType::Email
                    | InputType::Tel
                    | InputType::Url
                    | InputType::Password
            ),
        }
    }
}

/// Edits to a field value, in char offsets
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Insert { at: usize, text: String },
    Delete { range: Range<usize> },
}

/// A flat editable control: one linear value plus a caret/selection.
///
/// Host frameworks commonly wrap the element's `value` property so that
/// assignments also update a private "last known value". When an `input`
/// event later fires, the framework compares the live value against that
/// record and ignores the event if they match. `value_tracker` models that
/// record: [`TextField::assign_value`] goes through the wrapper and updates
/// it, [`TextField::set_native_value`] bypasses it.
#[derive(Clone)]
pub struct TextField {
    kind: FieldKind,
    value: Rope,
    selection: Range<usize>,
    value_tracker: Option<String>,
}

impl fmt::Debug for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextField")
            .field("kind", &self.kind)
            .field("value", &self.value())
            .field("selection", &self.selection)
            .field("value_tracker", &self.value_tracker)
            .finish()
    }
}

impl TextField {
    pub fn new(kind: FieldKind, value: &str) -> Self {
        let len = value.chars().count();
        Self {
            kind,
            value: Rope::from(value),
            selection: len..len,
            value_tracker: None,
        }
    }

    pub fn textarea(value: &str) -> Self {
        Self::new(FieldKind::TextArea, value)
    }

    pub fn input(kind: InputType, value: &str) -> Self {
        Self::new(FieldKind::Input(kind), value)
    }

    /// Mark the field as controlled by a host framework that wraps the value setter
    pub fn with_framework_tracking(mut self) -> Self {
        self.value_tracker = Some(self.value());
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn value(&self) -> String {
        self.value.to_string()
    }

    pub fn rope(&self) -> &Rope {
        &self.value
    }

    pub fn char_len(&self) -> usize {
        self.value.slice_to_cow(..).chars().count()
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Caret position (start of the selection)
    pub fn caret(&self) -> usize {
        self.selection.start
    }

    pub fn set_selection(&mut self, selection: Range<usize>) {
        let len = self.char_len();
        let start = selection.start.min(len);
        let end = selection.end.min(len).max(start);
        self.selection = start..end;
    }

    pub fn set_caret(&mut self, at: usize) {
        self.set_selection(at..at);
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn selected_text(&self) -> String {
        self.slice_chars(self.selection.clone())
    }

    /// Text between two char offsets, clamped to the value
    pub fn slice_chars(&self, range: Range<usize>) -> String {
        let value = self.value.slice_to_cow(..);
        value
            .chars()
            .skip(range.start)
            .take(range.end.saturating_sub(range.start))
            .collect()
    }

    /// Assign through the element's `value` property (and any wrapper on it)
    pub fn assign_value(&mut self, value: Rope) {
        if let Some(tracker) = &mut self.value_tracker {
            *tracker = value.to_string();
        }
        self.replace_value(value);
    }

    /// Assign through the platform setter, leaving wrappers unaware
    pub fn set_native_value(&mut self, value: Rope) {
        self.replace_value(value);
    }

    fn replace_value(&mut self, value: Rope) {
        self.value = value;
        let len = self.char_len();
        self.selection = len..len;
    }

    /// Whether a host framework receiving an `input` event now would treat it
    /// as a real change
    pub fn framework_sees_change(&self) -> bool {
        self.value_tracker
            .as_deref()
            .is_some_and(|tracked| tracked != self.value.slice_to_cow(..))
    }

    /// The host framework handled an `input` event and re-synced its record
    pub fn framework_acknowledge(&mut self) {
        if self.value_tracker.is_some() {
            self.value_tracker = Some(self.value());
        }
    }

    /// Value after applying `edit`; the field itself is unchanged
    pub fn apply(&self, edit: &Edit) -> Rope {
        compile_edit(&self.value, edit).apply(&self.value)
    }
}

/// Compile a char-offset edit into a rope delta
pub(crate) fn compile_edit(rope: &Rope, edit: &Edit) -> Delta<RopeInfo> {
    let text = rope.slice_to_cow(..);
    let mut builder: Builder<RopeInfo> = Builder::new(rope.len());
    match edit {
        Edit::Insert { at, text: inserted } => {
            let at = byte_offset(&text, *at);
            builder.replace(at..at, Rope::from(inserted.as_str()));
        }
        Edit::Delete { range } => {
            let start = byte_offset(&text, range.start);
            let end = byte_offset(&text, range.end).max(start);
            builder.delete(start..end);
        }
    }
    builder.build()
}

/// Byte index of the `char_index`-th char, clamped to the end
fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
