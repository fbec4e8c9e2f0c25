//! Mapping between absolute character offsets within an editable root and
//! boundary points in the tree.
//!
//! Rich-text editors split visible text across arbitrary node boundaries, so
//! "the three characters before the caret" can live in up to three text
//! nodes. These functions flatten the root's text nodes in document order and
//! translate between the two addressing schemes.

use super::{BoundaryRange, NodeId, Page, Point};
use crate::error::DomError;

/// Text of `root` from its start up to `caret`
pub fn text_before(page: &Page, root: NodeId, caret: Point) -> Result<String, DomError> {
    if !page.contains(root, caret.node) {
        return Err(DomError::OutsideRoot(caret));
    }
    page.range_text(&BoundaryRange::new(Point::new(root, 0), caret))
}

/// Resolve `[start, end)` char offsets within `root` to a boundary range.
///
/// Text nodes are scanned in document order accumulating their lengths. A
/// boundary that falls exactly between two nodes resolves to the end of the
/// earlier one. Returns `None` when either offset lies past the root's text.
pub fn range_from_offsets(
    page: &Page,
    root: NodeId,
    start: usize,
    end: usize,
) -> Option<BoundaryRange> {
    let mut pos = 0;
    let mut range_start = None;

    for id in page.preorder(root) {
        let Some(text) = page.text(id) else {
            continue;
        };
        let next = pos + text.chars().count();

        if range_start.is_none() && start <= next {
            range_start = Some(Point::new(id, start.saturating_sub(pos)));
        }
        if let Some(range_start) = range_start
            && end <= next
        {
            return Some(BoundaryRange::new(
                range_start,
                Point::new(id, end.saturating_sub(pos)),
            ));
        }
        pos = next;
    }
    None
}
