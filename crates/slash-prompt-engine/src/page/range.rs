use std::collections::HashMap;

use super::{NodeId, NodeKind, Page};
use crate::error::DomError;

/// DOM-style boundary point.
///
/// Inside a text node `offset` counts chars; inside a container it counts
/// children (the point sits before child `offset`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Point {
    pub node: NodeId,
    pub offset: usize,
}

impl Point {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// An ordered pair of boundary points (`start` must not come after `end`)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundaryRange {
    pub start: Point,
    pub end: Point,
}

impl BoundaryRange {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn collapsed(at: Point) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Pre-order numbering of the attached tree.
///
/// A boundary point maps to a "gap" index: the first node in document order
/// that lies entirely after it. Nodes fully inside a range are then exactly
/// those whose whole subtree falls between the two gaps.
struct TreeOrder {
    order: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    subtree_end: HashMap<NodeId, usize>,
}

impl TreeOrder {
    fn build(page: &Page) -> Self {
        let order = page.preorder(page.document());
        let index: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        // Walk backwards so every child's end is known before its parent's
        let mut subtree_end = HashMap::with_capacity(order.len());
        for &id in order.iter().rev() {
            let end = page
                .children(id)
                .last()
                .and_then(|last| subtree_end.get(last).copied())
                .unwrap_or(index[&id] + 1);
            subtree_end.insert(id, end);
        }

        Self {
            order,
            index,
            subtree_end,
        }
    }

    fn position(&self, id: NodeId) -> Result<usize, DomError> {
        self.index.get(&id).copied().ok_or(DomError::Detached(id))
    }

    fn start_gap(&self, page: &Page, point: Point) -> Result<usize, DomError> {
        if page.text(point.node).is_some() {
            return Ok(self.position(point.node)? + 1);
        }
        self.container_gap(page, point)
    }

    fn end_gap(&self, page: &Page, point: Point) -> Result<usize, DomError> {
        if page.text(point.node).is_some() {
            return self.position(point.node);
        }
        self.container_gap(page, point)
    }

    fn container_gap(&self, page: &Page, point: Point) -> Result<usize, DomError> {
        match page.children(point.node).get(point.offset) {
            Some(&child) => self.position(child),
            None => self
                .subtree_end
                .get(&point.node)
                .copied()
                .ok_or(DomError::Detached(point.node)),
        }
    }

    /// Topmost nodes lying wholly between the two gaps
    fn contained(&self, start_gap: usize, end_gap: usize) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut i = start_gap;
        while i < end_gap && i < self.order.len() {
            let id = self.order[i];
            let end = self.subtree_end[&id];
            if end <= end_gap {
                out.push(id);
                i = end;
            } else {
                i += 1;
            }
        }
        out
    }
}

impl Page {
    /// Chars in a text node, children in a container, zero for leaves
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.chars().count(),
            Some(NodeKind::Document | NodeKind::Element(_)) => self.children(id).len(),
            _ => 0,
        }
    }

    /// Check a boundary point refers to an attached node and a real offset
    pub fn check_point(&self, point: Point) -> Result<(), DomError> {
        if self.kind(point.node).is_none() {
            return Err(DomError::UnknownNode(point.node));
        }
        if !self.is_attached(point.node) {
            return Err(DomError::Detached(point.node));
        }
        let len = self.node_length(point.node);
        if point.offset > len {
            return Err(DomError::OffsetOutOfRange {
                node: point.node,
                offset: point.offset,
                len,
            });
        }
        Ok(())
    }

    pub fn point_before(&self, id: NodeId) -> Option<Point> {
        Some(Point::new(self.parent(id)?, self.index_in_parent(id)?))
    }

    pub fn point_after(&self, id: NodeId) -> Option<Point> {
        Some(Point::new(self.parent(id)?, self.index_in_parent(id)? + 1))
    }

    /// The text a range covers, as `Range.toString()` would report it
    pub fn range_text(&self, range: &BoundaryRange) -> Result<String, DomError> {
        self.check_point(range.start)?;
        self.check_point(range.end)?;

        if range.start.node == range.end.node
            && let Some(text) = self.text(range.start.node)
        {
            return Ok(slice_chars(text, range.start.offset, range.end.offset));
        }

        let order = TreeOrder::build(self);
        let start_gap = order.start_gap(self, range.start)?;
        let end_gap = order.end_gap(self, range.end)?;

        let mut out = String::new();
        if let Some(text) = self.text(range.start.node) {
            out.extend(text.chars().skip(range.start.offset));
        }
        for &id in order.order.iter().take(end_gap).skip(start_gap) {
            if let Some(text) = self.text(id) {
                out.push_str(text);
            }
        }
        if let Some(text) = self.text(range.end.node) {
            out.extend(text.chars().take(range.end.offset));
        }
        Ok(out)
    }

    /// Remove everything inside `range`, trimming partially covered text
    /// nodes. Returns the collapsed point where the range used to start.
    pub fn delete_contents(&mut self, range: &BoundaryRange) -> Result<Point, DomError> {
        self.check_point(range.start)?;
        self.check_point(range.end)?;

        if range.start.node == range.end.node
            && let Some(text) = self.text_mut(range.start.node)
        {
            let kept: String = text
                .chars()
                .take(range.start.offset)
                .chain(text.chars().skip(range.end.offset.max(range.start.offset)))
                .collect();
            *text = kept;
            return Ok(range.start);
        }

        let order = TreeOrder::build(self);
        let start_gap = order.start_gap(self, range.start)?;
        let end_gap = order.end_gap(self, range.end)?;
        let doomed = order.contained(start_gap, end_gap);

        if let Some(text) = self.text_mut(range.start.node) {
            *text = text.chars().take(range.start.offset).collect();
        }
        if let Some(text) = self.text_mut(range.end.node) {
            *text = text.chars().skip(range.end.offset).collect();
        }
        for id in doomed {
            self.remove(id)?;
        }
        Ok(range.start)
    }

    /// Insert a detached node at a boundary point, splitting a text node
    /// when the point falls inside one (`Range.insertNode`).
    pub fn insert_node(&mut self, at: Point, node: NodeId) -> Result<(), DomError> {
        self.check_point(at)?;

        if let Some(text) = self.text(at.node) {
            let len = text.chars().count();
            let parent = self.parent(at.node).ok_or(DomError::Detached(at.node))?;

            if at.offset == 0 {
                return self.insert_before(parent, node, Some(at.node));
            }
            if at.offset >= len {
                let next = self.next_sibling(at.node);
                return self.insert_before(parent, node, next);
            }

            let tail: String = text.chars().skip(at.offset).collect();
            let head: String = text.chars().take(at.offset).collect();
            if let Some(text) = self.text_mut(at.node) {
                *text = head;
            }
            let tail = self.create_text(&tail);
            let next = self.next_sibling(at.node);
            self.insert_before(parent, tail, next)?;
            return self.insert_before(parent, node, Some(tail));
        }

        let reference = self.children(at.node).get(at.offset).copied();
        self.insert_before(at.node, node, reference)
    }
}

impl Page {
    /// Splice `data` into a text node at a char offset (`CharacterData.insertData`)
    pub fn insert_data(&mut self, node: NodeId, offset: usize, data: &str) -> Result<(), DomError> {
        self.check_point(Point::new(node, offset))?;
        let Some(text) = self.text_mut(node) else {
            return Err(DomError::NotText(node));
        };
        let byte = text
            .char_indices()
            .nth(offset)
            .map_or(text.len(), |(index, _)| index);
        text.insert_str(byte, data);
        Ok(())
    }
}

fn slice_chars(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}
