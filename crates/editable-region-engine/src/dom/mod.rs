//! Arena model of the host tree an editable region lives in.
//!
//! The host surface (a browser document, a native text view, a test double)
//! is modelled as a [`Document`] owning every node. Node identity is a plain
//! [`NodeId`] index: detaching a node never frees it, so rollback can put the
//! very same node back where it was.
//!
//! Offsets follow host conventions: UTF-16 code units inside text nodes and
//! child indices inside elements. Every structural or character-data change is
//! reported to registered observers (see [`mutation`]), and the live selection
//! is adjusted the way a host adjusts live ranges when the tree changes under
//! them.

pub mod markup;
pub mod mutation;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::EditError;
pub use markup::Markup;
use mutation::Observers;
pub use mutation::{MutationKind, MutationRecord, ObserverId};

/// Index of a node inside its [`Document`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A (node, offset) boundary point as the host reports it
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// The host's live selection. Anchor and focus are in the order the user
/// made them, which is not necessarily document order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LiveSelection {
    pub anchor: Boundary,
    pub focus: Boundary,
}

impl LiveSelection {
    pub fn new(anchor: Boundary, focus: Boundary) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(node: NodeId, offset: usize) -> Self {
        let point = Boundary::new(node, offset);
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.focus, self.anchor)
    }
}

/// Host-native static range, the shape input intents use for target ranges
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StaticRange {
    pub start_container: NodeId,
    pub start_offset: usize,
    pub end_container: NodeId,
    pub end_offset: usize,
}

impl StaticRange {
    pub fn new(
        start_container: NodeId,
        start_offset: usize,
        end_container: NodeId,
        end_offset: usize,
    ) -> Self {
        Self {
            start_container,
            start_offset,
            end_container,
            end_offset,
        }
    }

    pub fn caret(node: NodeId, offset: usize) -> Self {
        Self::new(node, offset, node, offset)
    }

    pub fn collapsed(&self) -> bool {
        self.start_container == self.end_container && self.start_offset == self.end_offset
    }
}

impl From<&LiveSelection> for StaticRange {
    /// Anchor becomes start and focus becomes end; callers normalize the order
    fn from(selection: &LiveSelection) -> Self {
        Self::new(
            selection.anchor.node,
            selection.anchor.offset,
            selection.focus.node,
            selection.focus.offset,
        )
    }
}

/// Length of `text` in UTF-16 code units
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Byte index for a UTF-16 offset, `None` past the end or inside a surrogate pair
pub fn byte_offset(text: &str, utf16_offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units == utf16_offset {
            return Some(byte);
        }
        units += ch.len_utf16();
        if units > utf16_offset {
            return None;
        }
    }
    (units == utf16_offset).then_some(text.len())
}

#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<Node>,
    selection: Option<LiveSelection>,
    selection_changes: usize,
    observers: Observers,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.create_element_with(tag, BTreeMap::new())
    }

    pub fn create_element_with(
        &mut self,
        tag: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.into(),
            attributes,
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    /// Create a detached subtree for `markup`
    pub fn build(&mut self, markup: &Markup) -> NodeId {
        match markup {
            Markup::Text(text) => self.create_text(text.clone()),
            Markup::Element {
                tag,
                attributes,
                children,
            } => {
                let element = self.create_element_with(tag.clone(), attributes.clone());
                for child in children {
                    let child = self.build(child);
                    self.nodes[child.0].parent = Some(element);
                    self.nodes[element.0].children.push(child);
                }
                element
            }
        }
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Inclusive ancestry test: a node contains itself
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.data(node), NodeData::Text(_))
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node) {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    /// Host length of a node: UTF-16 units for text, child count for elements
    pub fn length(&self, node: NodeId) -> usize {
        match self.data(node) {
            NodeData::Text(text) => utf16_len(text),
            NodeData::Element { .. } => self.children(node).len(),
        }
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.data(node) {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for &child in self.children(node) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Attribute writes are not observed
    pub fn set_attribute(&mut self, node: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[node.0].data {
            attributes.insert(name.into(), value.into());
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), EditError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference`, or at the end when `reference` is `None`.
    /// A child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), EditError> {
        debug_assert!(!self.contains(child, parent), "insertion would create a cycle");

        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }

        let index = match reference {
            Some(reference) => self
                .child_index(parent, reference)
                .ok_or(EditError::NotAChild {
                    parent,
                    node: reference,
                })?,
            None => self.children(parent).len(),
        };
        let previous_sibling = index
            .checked_sub(1)
            .map(|i| self.nodes[parent.0].children[i]);

        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);

        self.shift_selection(|boundary| {
            if boundary.node == parent && boundary.offset > index {
                boundary.offset += 1;
            }
        });
        self.record(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
                previous_sibling,
                next_sibling: reference,
            },
        );
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), EditError> {
        let index = self
            .child_index(parent, child)
            .ok_or(EditError::NotAChild {
                parent,
                node: child,
            })?;

        // Boundaries inside the removed subtree collapse onto the parent
        if let Some(mut selection) = self.selection {
            for boundary in [&mut selection.anchor, &mut selection.focus] {
                if self.contains(child, boundary.node) {
                    *boundary = Boundary::new(parent, index);
                } else if boundary.node == parent && boundary.offset > index {
                    boundary.offset -= 1;
                }
            }
            self.selection = Some(selection);
        }

        let children = &mut self.nodes[parent.0].children;
        let previous_sibling = index.checked_sub(1).map(|i| children[i]);
        let next_sibling = children.get(index + 1).copied();
        children.remove(index);
        self.nodes[child.0].parent = None;

        self.record(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![child],
                previous_sibling,
                next_sibling,
            },
        );
        Ok(())
    }

    /// Replace every child of `parent` with freshly built nodes for `markup`
    pub fn replace_children(&mut self, parent: NodeId, markup: &[Markup]) -> Result<(), EditError> {
        while let Some(&child) = self.children(parent).last() {
            self.remove_child(parent, child)?;
        }
        for item in markup {
            let child = self.build(item);
            self.append_child(parent, child)?;
        }
        Ok(())
    }

    /// Replace `count` UTF-16 units at `offset` with `data`, like a host text node
    pub fn replace_data(
        &mut self,
        node: NodeId,
        offset: usize,
        count: usize,
        data: &str,
    ) -> Result<(), EditError> {
        let NodeData::Text(text) = &self.nodes[node.0].data else {
            return Err(EditError::NotAText { node });
        };
        let length = utf16_len(text);
        let out_of_bounds = EditError::OffsetOutOfBounds {
            node,
            offset,
            length,
        };
        if offset > length {
            return Err(out_of_bounds);
        }
        let count = count.min(length - offset);
        let start = byte_offset(text, offset).ok_or(out_of_bounds.clone())?;
        let end = byte_offset(text, offset + count).ok_or(out_of_bounds)?;

        let old_value = text.clone();
        let mut updated = String::with_capacity(text.len() + data.len());
        updated.push_str(&text[..start]);
        updated.push_str(data);
        updated.push_str(&text[end..]);
        self.nodes[node.0].data = NodeData::Text(updated);

        let inserted = utf16_len(data);
        self.shift_selection(|boundary| {
            if boundary.node != node {
                return;
            }
            if boundary.offset > offset && boundary.offset <= offset + count {
                boundary.offset = offset;
            } else if boundary.offset > offset + count {
                boundary.offset = boundary.offset + inserted - count;
            }
        });
        self.record(node, MutationKind::CharacterData { old_value });
        Ok(())
    }

    pub fn insert_data(&mut self, node: NodeId, offset: usize, data: &str) -> Result<(), EditError> {
        self.replace_data(node, offset, 0, data)
    }

    pub fn delete_data(&mut self, node: NodeId, offset: usize, count: usize) -> Result<(), EditError> {
        self.replace_data(node, offset, count, "")
    }

    pub fn set_text(&mut self, node: NodeId, value: &str) -> Result<(), EditError> {
        let length = self.length(node);
        self.replace_data(node, 0, length, value)
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match self.data(node) {
            NodeData::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeData::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                for &child in self.children(node) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    pub fn selection(&self) -> Option<LiveSelection> {
        self.selection
    }

    /// Program the live selection. Every write queues a change notification,
    /// even when the new value equals the old one.
    pub fn set_selection(&mut self, selection: LiveSelection) {
        self.selection = Some(selection);
        self.selection_changes += 1;
    }

    pub fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            self.selection_changes += 1;
        }
    }

    /// Drain queued selection-change notifications, returning how many there were
    pub fn take_selection_changes(&mut self) -> usize {
        std::mem::take(&mut self.selection_changes)
    }

    fn shift_selection(&mut self, mut adjust: impl FnMut(&mut Boundary)) {
        if let Some(selection) = &mut self.selection {
            adjust(&mut selection.anchor);
            adjust(&mut selection.focus);
        }
    }

    /// Start observing character-data and child-list changes under `root`
    pub fn observe(&mut self, root: NodeId) -> ObserverId {
        self.observers.register(root)
    }

    /// Records queued for `observer` that it has not collected yet
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take(observer)
    }

    /// Stop observing; undelivered records are dropped
    pub fn disconnect(&mut self, observer: ObserverId) {
        self.observers.disconnect(observer);
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        if self.observers.is_empty() {
            return;
        }
        let interested: Vec<ObserverId> = self
            .observers
            .roots()
            .filter(|&(_, root)| self.contains(root, target))
            .map(|(id, _)| id)
            .collect();
        if interested.is_empty() {
            return;
        }
        log::trace!("mutation on {target:?}: {kind:?}");
        self.observers.queue(&interested, target, kind);
    }
}
