/*!
 * # Page Model
 *
 * An in-memory stand-in for the parts of a web page the engine touches:
 *
 * - **Nodes**: elements (optionally `contenteditable`), text, line breaks,
 *   insertion markers and flat text fields, stored in an arena and addressed
 *   by copyable [`NodeId`] handles.
 * - **Detachment, not deletion**: removing a node only unhooks it from its
 *   parent. Handles stay usable, so callers holding a handle must re-check
 *   [`Page::is_attached`] before writing through it. The arena only grows;
 *   a page lives as long as the document it stands in for.
 * - **Markers**: indexed by [`MarkerId`], so finding one does not scan the
 *   arena. Removing a marker drops it from the index.
 * - **Focus and selection**: one active element and one document selection,
 *   expressed as DOM-style boundary points ([`Point`]).
 * - **Notifications**: every `input`/`change` event the engine dispatches is
 *   appended to an event log so hosts can forward it and tests can assert it.
 *
 * All offsets are counted in `char`s.
 */

mod field;
mod offsets;
mod range;

pub use field::{Edit, FieldKind, InputType, TextField};
pub use offsets::{range_from_offsets, text_before};
pub use range::{BoundaryRange, Point};

use std::collections::HashMap;

use crate::anchor::MarkerId;
use crate::error::DomError;

/// Handle to a node on a [`Page`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Bounding rectangle in viewport coordinates
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub tag: String,
    /// `contenteditable="true"` on this element
    pub editable: bool,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    LineBreak,
    Marker(MarkerId),
    Field(TextField),
}

impl NodeKind {
    /// Whether nodes of this kind may have children
    fn is_container(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Element(_))
    }
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Option<Rect>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            rect: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Input,
    Change,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub kind: EventKind,
}

#[derive(Clone, Debug)]
pub struct Page {
    nodes: Vec<Node>,
    markers: HashMap<MarkerId, NodeId>,
    active: Option<NodeId>,
    selection: Option<BoundaryRange>,
    events: Vec<DispatchedEvent>,
    viewport: Viewport,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self::with_viewport(Viewport::default())
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
            markers: HashMap::new(),
            active: None,
            selection: None,
            events: Vec::new(),
            viewport,
        }
    }

    /// The document root. Always attached.
    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element {
            tag: tag.to_string(),
            editable: false,
        }))
    }

    /// Create an element carrying `contenteditable="true"`
    pub fn create_editable(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element {
            tag: tag.to_string(),
            editable: true,
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn create_line_break(&mut self) -> NodeId {
        self.alloc(NodeKind::LineBreak)
    }

    pub fn create_marker(&mut self, id: MarkerId) -> NodeId {
        let node = self.alloc(NodeKind::Marker(id));
        self.markers.insert(id, node);
        node
    }

    pub fn create_field(&mut self, field: TextField) -> NodeId {
        self.alloc(NodeKind::Field(field))
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> Result<(), DomError> {
        self.node_mut(id)?.rect = Some(rect);
        Ok(())
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.nodes.get(id.0).and_then(|node| node.rect)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is `None`. The child is first detached from wherever it was.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.node(parent)?.kind.is_container() {
            return Err(DomError::NotAContainer(parent));
        }
        if matches!(self.node(child)?.kind, NodeKind::Document) || self.contains(child, parent) {
            return Err(DomError::Hierarchy { parent, child });
        }
        if reference == Some(child) {
            return Ok(());
        }

        self.detach(child);

        let index = match reference {
            Some(reference) => self
                .node(parent)?
                .children
                .iter()
                .position(|&c| c == reference)
                .ok_or(DomError::UnknownNode(reference))?,
            None => self.node(parent)?.children.len(),
        };

        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unhook a node from its parent. The node and its subtree stay addressable.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        let marker = match &self.node(id)?.kind {
            NodeKind::Document => {
                return Err(DomError::Hierarchy {
                    parent: id,
                    child: id,
                });
            }
            NodeKind::Marker(marker) => Some(*marker),
            _ => None,
        };
        if let Some(marker) = marker {
            self.markers.remove(&marker);
        }
        self.detach(id);
        if self.active.is_some_and(|active| !self.is_attached(active)) {
            self.active = None;
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.parent = None;
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Whether the node can be reached from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.document(), id)
    }

    /// Inclusive ancestry test: `node` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest element at or above `id` carrying `contenteditable="true"`
    pub fn editable_root(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(NodeKind::Element(element)) = self.kind(node)
                && element.editable
            {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of every text node beneath `id`
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.preorder(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn field(&self, id: NodeId) -> Result<&TextField, DomError> {
        match &self.node(id)?.kind {
            NodeKind::Field(field) => Ok(field),
            _ => Err(DomError::NotAField(id)),
        }
    }

    pub fn field_mut(&mut self, id: NodeId) -> Result<&mut TextField, DomError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Field(field) => Ok(field),
            _ => Err(DomError::NotAField(id)),
        }
    }

    /// Locate an attached marker node
    pub fn find_marker(&self, marker: MarkerId) -> Option<NodeId> {
        self.markers
            .get(&marker)
            .copied()
            .filter(|&id| self.is_attached(id))
    }

    pub fn focus(&mut self, id: NodeId) {
        if self.is_attached(id) {
            self.active = Some(id);
        }
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    pub fn selection(&self) -> Option<BoundaryRange> {
        self.selection
    }

    pub fn set_selection(&mut self, range: BoundaryRange) {
        self.selection = Some(range);
    }

    pub fn collapse_selection(&mut self, at: Point) {
        self.selection = Some(BoundaryRange::collapsed(at));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn dispatch(&mut self, target: NodeId, kind: EventKind) {
        log::trace!("dispatching {kind:?} on {target:?}");
        self.events.push(DispatchedEvent { target, kind });
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DispatchedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Nodes beneath `root` (inclusive) in document order
    pub fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.nodes.get(id.0).is_none() {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }
}
