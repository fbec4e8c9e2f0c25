use std::fmt;

use uuid::Uuid;

use crate::error::DomError;
use crate::page::{NodeId, Page, Point};

/// Identity of an insertion marker node
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerId(Uuid);

impl MarkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slash-prompt-marker-{}", self.0.simple())
    }
}

/// The editable surface a capture session writes back into
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Surface {
    /// A textarea or text-like `<input>`
    Flat(NodeId),
    /// The `contenteditable` root
    Rich(NodeId),
}

impl Surface {
    pub fn node(&self) -> NodeId {
        match self {
            Surface::Flat(id) | Surface::Rich(id) => *id,
        }
    }

    /// Whether the user is still working in this surface.
    ///
    /// A flat field must still own focus; a rich root merely has to remain in
    /// the document, since focus moves between its descendants.
    pub fn is_live(&self, page: &Page) -> bool {
        match self {
            Surface::Flat(field) => page.active_element() == Some(*field),
            Surface::Rich(root) => page.is_attached(*root),
        }
    }
}

/// Where generated text goes once it arrives.
///
/// Not `Clone`. Each session owns one anchor and hands it off exactly once,
/// to the insertion engine or to [`Anchor::release`].
#[derive(Debug, PartialEq, Eq)]
pub enum Anchor {
    /// Char offset into a field value
    Flat { field: NodeId, offset: usize },
    /// Invisible marker node sitting at the caret in a rich-text tree
    Marker { id: MarkerId },
}

impl Anchor {
    /// Drop a fresh marker at `at` and leave the caret just after it
    pub(crate) fn place_marker(page: &mut Page, at: Point) -> Result<Self, DomError> {
        let id = MarkerId::new();
        let marker = page.create_marker(id);
        page.insert_node(at, marker)?;
        if let Some(after) = page.point_after(marker) {
            page.collapse_selection(after);
        }
        Ok(Anchor::Marker { id })
    }

    pub fn is_valid(&self, page: &Page) -> bool {
        match self {
            Anchor::Flat { field, offset } => {
                page.is_attached(*field)
                    && page
                        .field(*field)
                        .is_ok_and(|field| field.char_len() >= *offset)
            }
            Anchor::Marker { id } => page.find_marker(*id).is_some(),
        }
    }

    pub fn marker_node(&self, page: &Page) -> Option<NodeId> {
        match self {
            Anchor::Marker { id } => page.find_marker(*id),
            Anchor::Flat { .. } => None,
        }
    }

    /// Give the anchor up, removing any marker still in the page
    pub fn release(self, page: &mut Page) {
        if let Some(marker) = self.marker_node(page)
            && let Err(e) = page.remove(marker)
        {
            log::debug!("could not remove marker: {e}");
        }
    }
}
