//! Recognises the trigger sequence in page input events and opens an anchor
//! where it was typed.

use crate::anchor::{Anchor, Surface};
use crate::error::DomError;
use crate::page::{Edit, NodeId, Page, range_from_offsets, text_before};

/// The sequence that opens prompt capture, matched case-insensitively
pub const TRIGGER: &str = "/ai";

/// A recognised trigger: the sequence has been removed and the anchor placed
#[derive(Debug, PartialEq, Eq)]
pub struct Detection {
    pub surface: Surface,
    pub anchor: Anchor,
}

fn trigger_len() -> usize {
    TRIGGER.chars().count()
}

fn is_trigger(tail: &str) -> bool {
    tail.to_lowercase() == TRIGGER.to_lowercase()
}

/// Inspect the surface an `input` event fired on.
///
/// Either the trigger is consumed and an anchor opened, or the page is left
/// exactly as it was.
pub fn detect(page: &mut Page, target: NodeId) -> Option<Detection> {
    if page.field(target).is_ok() {
        return detect_flat(page, target);
    }

    let root = page.editable_root(target)?;
    match detect_rich(page, root) {
        Ok(detection) => detection,
        Err(e) => {
            log::debug!("trigger detection aborted: {e}");
            None
        }
    }
}

fn detect_flat(page: &mut Page, field_id: NodeId) -> Option<Detection> {
    let field = page.field(field_id).ok()?;
    if !field.kind().accepts_text() {
        return None;
    }

    let caret = field.caret();
    let len = trigger_len();
    if caret < len || !is_trigger(&field.slice_chars(caret - len..caret)) {
        return None;
    }

    let offset = caret - len;
    let value = field.apply(&Edit::Delete {
        range: offset..caret,
    });
    let field = page.field_mut(field_id).ok()?;
    field.assign_value(value);
    field.set_caret(offset);

    log::info!("trigger typed in field {field_id:?} at offset {offset}");
    Some(Detection {
        surface: Surface::Flat(field_id),
        anchor: Anchor::Flat {
            field: field_id,
            offset,
        },
    })
}

fn detect_rich(page: &mut Page, root: NodeId) -> Result<Option<Detection>, DomError> {
    let selection = page.selection().ok_or(DomError::NoSelection)?;
    let before = text_before(page, root, selection.start)?;

    let len = trigger_len();
    let end = before.chars().count();
    if end < len {
        return Ok(None);
    }
    let tail: String = before.chars().skip(end - len).collect();
    if !is_trigger(&tail) {
        return Ok(None);
    }

    // Resolve everything before touching the tree
    let Some(range) = range_from_offsets(page, root, end - len, end) else {
        log::debug!("trigger text found but could not be mapped back into the tree");
        return Ok(None);
    };

    let caret = page.delete_contents(&range)?;
    page.collapse_selection(caret);
    let anchor = Anchor::place_marker(page, caret)?;

    log::info!("trigger typed in editable root {root:?}");
    Ok(Some(Detection {
        surface: Surface::Rich(root),
        anchor,
    }))
}
