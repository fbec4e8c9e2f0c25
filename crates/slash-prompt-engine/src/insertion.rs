//! Writes generated text back at an anchor.

use xi_rope::Rope;

use crate::anchor::Anchor;
use crate::error::DomError;
use crate::page::{Edit, EventKind, NodeId, Page, Point, TextField};

/// How a flat field's new value is written and announced to the host page.
///
/// Host frameworks that wrap the element's `value` setter only notice an
/// `input` event if the write bypassed their wrapper, so the default writes
/// through the platform setter. Override [`ValueWriter::assign`] to change
/// that strategy.
pub trait ValueWriter {
    fn assign(&self, field: &mut TextField, value: Rope) {
        field.set_native_value(value);
    }

    /// Write the value, place the caret, fire `input` then `change`, refocus
    fn set_value_and_notify(
        &self,
        page: &mut Page,
        field_id: NodeId,
        value: Rope,
        caret: usize,
    ) -> Result<(), DomError> {
        let field = page.field_mut(field_id)?;
        self.assign(field, value);
        field.set_caret(caret);
        page.dispatch(field_id, EventKind::Input);
        page.dispatch(field_id, EventKind::Change);
        page.focus(field_id);
        Ok(())
    }
}

/// Writes through the platform value setter
#[derive(Copy, Clone, Debug, Default)]
pub struct NativeValueWriter;

impl ValueWriter for NativeValueWriter {}

/// Writes through the element's `value` property, wrappers included
#[derive(Copy, Clone, Debug, Default)]
pub struct PropertyValueWriter;

impl ValueWriter for PropertyValueWriter {
    fn assign(&self, field: &mut TextField, value: Rope) {
        field.assign_value(value);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Written at the anchor
    Inserted,
    /// The marker was gone; written at the focused editable's selection
    FellBack,
    /// Nowhere sensible to write
    Abandoned,
}

/// Write `text` at `anchor`, consuming it. The caret ends up just after the
/// inserted text and the host page is notified.
pub fn insert<W: ValueWriter + ?Sized>(
    page: &mut Page,
    writer: &W,
    anchor: Anchor,
    text: &str,
) -> InsertOutcome {
    let result = match &anchor {
        Anchor::Flat { field, offset } => insert_flat(page, writer, &anchor, *field, *offset, text),
        Anchor::Marker { .. } => match anchor.marker_node(page) {
            Some(marker) => insert_at_marker(page, marker, text),
            None => insert_at_focus(page, text),
        },
    };
    anchor.release(page);

    match result {
        Ok(outcome) => {
            log::info!("insertion finished: {outcome:?}");
            outcome
        }
        Err(e) => {
            log::debug!("insertion abandoned: {e}");
            InsertOutcome::Abandoned
        }
    }
}

fn insert_flat<W: ValueWriter + ?Sized>(
    page: &mut Page,
    writer: &W,
    anchor: &Anchor,
    field_id: NodeId,
    offset: usize,
    text: &str,
) -> Result<InsertOutcome, DomError> {
    if !anchor.is_valid(page) {
        log::debug!("flat anchor at {offset} in {field_id:?} is no longer valid");
        return Ok(InsertOutcome::Abandoned);
    }

    let value = page.field(field_id)?.apply(&Edit::Insert {
        at: offset,
        text: text.to_string(),
    });
    let caret = offset + text.chars().count();
    writer.set_value_and_notify(page, field_id, value, caret)?;
    Ok(InsertOutcome::Inserted)
}

/// Text nodes for each line with a `<br>` between them, placed before the
/// marker, which is then removed
fn insert_at_marker(page: &mut Page, marker: NodeId, text: &str) -> Result<InsertOutcome, DomError> {
    let parent = page.parent(marker).ok_or(DomError::Detached(marker))?;
    let root = page.editable_root(parent);

    let mut last = None;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            let br = page.create_line_break();
            page.insert_before(parent, br, Some(marker))?;
        }
        let node = page.create_text(line);
        page.insert_before(parent, node, Some(marker))?;
        last = Some(node);
    }

    if let Some(after) = last.and_then(|node| page.point_after(node)) {
        page.collapse_selection(after);
    }
    page.remove(marker)?;

    if let Some(root) = root {
        page.dispatch(root, EventKind::Input);
    }
    Ok(InsertOutcome::Inserted)
}

/// Single text node at the live selection of the focused rich-text root
fn insert_at_focus(page: &mut Page, text: &str) -> Result<InsertOutcome, DomError> {
    let Some(root) = page.active_element().and_then(|id| page.editable_root(id)) else {
        log::debug!("marker gone and no editable region focused");
        return Ok(InsertOutcome::Abandoned);
    };
    let Some(selection) = page
        .selection()
        .filter(|range| page.contains(root, range.start.node) && page.contains(root, range.end.node))
    else {
        log::debug!("marker gone and focused region has no selection");
        return Ok(InsertOutcome::Abandoned);
    };

    let at = page.delete_contents(&selection)?;
    let node = page.create_text(text);
    page.insert_node(at, node)?;
    let after = page.point_after(node).unwrap_or(Point::new(root, 0));
    page.collapse_selection(after);

    page.dispatch(root, EventKind::Input);
    Ok(InsertOutcome::FellBack)
}
