//! Collects the slice of surrounding text sent along with a prompt.

use crate::anchor::{Anchor, Surface};
use crate::error::DomError;
use crate::page::{Page, text_before};

/// How much surrounding text may accompany a prompt, in chars
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContextLimits {
    /// Cap on an explicit selection
    pub selection: usize,
    /// Text taken from before the anchor when nothing is selected
    pub preceding: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            selection: 2000,
            preceding: 500,
        }
    }
}

/// Surrounding text for the session's surface, trimmed.
///
/// Never fails: anything that goes wrong yields an empty string so the
/// submission still goes ahead.
pub fn collect(page: &Page, surface: Surface, anchor: &Anchor, limits: ContextLimits) -> String {
    let collected = match surface {
        Surface::Flat(_) => collect_flat(page, anchor, limits),
        Surface::Rich(root) => collect_rich(page, root, anchor, limits),
    };
    match collected {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            log::debug!("context collection failed: {e}");
            String::new()
        }
    }
}

fn collect_flat(page: &Page, anchor: &Anchor, limits: ContextLimits) -> Result<String, DomError> {
    let Anchor::Flat { field, offset } = *anchor else {
        return Ok(String::new());
    };
    let field = page.field(field)?;

    if field.has_selection() {
        return Ok(head(&field.selected_text(), limits.selection));
    }

    let offset = offset.min(field.char_len());
    let from = offset.saturating_sub(limits.preceding);
    Ok(field.slice_chars(from..offset))
}

fn collect_rich(
    page: &Page,
    root: crate::page::NodeId,
    anchor: &Anchor,
    limits: ContextLimits,
) -> Result<String, DomError> {
    if let Some(selection) = page.selection()
        && !selection.is_collapsed()
        && page.contains(root, selection.start.node)
        && page.contains(root, selection.end.node)
    {
        return Ok(head(&page.range_text(&selection)?, limits.selection));
    }

    let Anchor::Marker { id } = anchor else {
        return Ok(String::new());
    };
    let marker = page.find_marker(*id).ok_or(DomError::MarkerMissing(*id))?;
    let at = page
        .point_before(marker)
        .ok_or(DomError::Detached(marker))?;
    let before = text_before(page, root, at)?;
    Ok(tail(&before, limits.preceding))
}

fn head(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn tail(text: &str, max: usize) -> String {
    let len = text.chars().count();
    text.chars().skip(len.saturating_sub(max)).collect()
}
