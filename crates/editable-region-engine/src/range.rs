//! Ordered ranges over addressed points.
//!
//! An [`InlineRange`] is the value collaborators receive instead of raw host
//! constructs. Whatever order its points were given in, `start` is never
//! after `end`. Each [`Point`] keeps its [`Path`] as ground truth and a node
//! handle as a cache that is revalidated before it is used again.

use std::cmp::Ordering;

use crate::addressing::{Path, child_from_path, path_from_child};
use crate::dom::{Boundary, Document, LiveSelection, NodeId, StaticRange, byte_offset};
use crate::error::{EditError, Endpoint};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Point {
    pub path: Path,
    node: NodeId,
    pub offset: usize,
    /// Offset in Unicode scalar values; equals `offset` for element points
    pub code_point_offset: usize,
}

impl Point {
    /// Resolve `path` under `host` and check `offset` fits the node
    pub fn new(doc: &Document, host: NodeId, path: Path, offset: usize) -> Result<Self, EditError> {
        let node = child_from_path(doc, host, &path)?;
        Self::resolved(doc, path, node, offset)
    }

    pub fn at_node(doc: &Document, host: NodeId, node: NodeId, offset: usize) -> Result<Self, EditError> {
        let path = path_from_child(doc, host, node)?;
        Self::resolved(doc, path, node, offset)
    }

    fn resolved(doc: &Document, path: Path, node: NodeId, offset: usize) -> Result<Self, EditError> {
        let length = doc.length(node);
        if offset > length {
            return Err(EditError::OffsetOutOfBounds {
                node,
                offset,
                length,
            });
        }
        Ok(Self {
            path,
            node,
            offset,
            code_point_offset: code_point_offset(doc, node, offset)?,
        })
    }

    /// Cached node handle; only trustworthy within the event it was built in
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn boundary(&self) -> Boundary {
        Boundary::new(self.node, self.offset)
    }

    /// Recompute the node handle from the path
    pub fn revalidate(&self, doc: &Document, host: NodeId) -> Result<Self, EditError> {
        Self::new(doc, host, self.path.clone(), self.offset)
    }

    /// Whether the cached handle still matches what the path addresses
    pub fn is_current(&self, doc: &Document, host: NodeId) -> bool {
        child_from_path(doc, host, &self.path).is_ok_and(|node| node == self.node)
    }
}

fn code_point_offset(doc: &Document, node: NodeId, offset: usize) -> Result<usize, EditError> {
    let Some(text) = doc.text(node) else {
        return Ok(offset);
    };
    let end = byte_offset(text, offset).ok_or(EditError::OffsetOutOfBounds {
        node,
        offset,
        length: doc.length(node),
    })?;
    Ok(text[..end].chars().count())
}

/// Document order of two points under the same host.
///
/// Points on the same node compare by offset. Otherwise the first differing
/// path index decides. When one path is a strict prefix of the other, the
/// shallower point is an element boundary and its offset is compared against
/// the child index the deeper path descends through.
pub fn compare_points(x: &Point, y: &Point) -> Ordering {
    if x.node == y.node || x.path == y.path {
        return x.offset.cmp(&y.offset);
    }

    let lhs = x.path.indices();
    let rhs = y.path.indices();
    if let Some((a, b)) = lhs.iter().zip(rhs).find(|(a, b)| a != b) {
        return a.cmp(b);
    }

    if x.path.is_strict_prefix_of(&y.path) {
        let child = rhs[lhs.len()];
        if x.offset <= child {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    } else {
        let child = lhs[rhs.len()];
        if y.offset <= child {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineRange {
    pub host: NodeId,
    pub start: Point,
    pub end: Point,
}

impl InlineRange {
    /// Validate both points against `host` and order them
    pub fn new(doc: &Document, host: NodeId, p: Point, q: Point) -> Result<Self, EditError> {
        for (point, which) in [(&p, Endpoint::Start), (&q, Endpoint::End)] {
            if !point.is_current(doc, host) {
                return Err(EditError::InvalidPoint { which });
            }
        }

        let (start, end) = match compare_points(&p, &q) {
            Ordering::Greater => (q, p),
            _ => (p, q),
        };
        Ok(Self { host, start, end })
    }

    pub fn from_paths(
        doc: &Document,
        host: NodeId,
        path1: Path,
        offset1: usize,
        path2: Path,
        offset2: usize,
    ) -> Result<Self, EditError> {
        let p = Point::new(doc, host, path1, offset1)?;
        let q = Point::new(doc, host, path2, offset2)?;
        Self::new(doc, host, p, q)
    }

    pub fn from_nodes(
        doc: &Document,
        host: NodeId,
        node1: NodeId,
        offset1: usize,
        node2: NodeId,
        offset2: usize,
    ) -> Result<Self, EditError> {
        let p = Point::at_node(doc, host, node1, offset1)?;
        let q = Point::at_node(doc, host, node2, offset2)?;
        Self::new(doc, host, p, q)
    }

    /// Collapsed range at `path`/`offset`
    pub fn caret(doc: &Document, host: NodeId, path: Path, offset: usize) -> Result<Self, EditError> {
        Self::from_paths(doc, host, path.clone(), offset, path, offset)
    }

    pub fn from_static_range(doc: &Document, host: NodeId, range: &StaticRange) -> Result<Self, EditError> {
        Self::from_nodes(
            doc,
            host,
            range.start_container,
            range.start_offset,
            range.end_container,
            range.end_offset,
        )
    }

    /// `None` when either end of the selection lies outside `host`
    pub fn from_selection(
        doc: &Document,
        host: NodeId,
        selection: &LiveSelection,
    ) -> Result<Option<Self>, EditError> {
        if !doc.contains(host, selection.anchor.node) || !doc.contains(host, selection.focus.node) {
            return Ok(None);
        }
        Self::from_static_range(doc, host, &StaticRange::from(selection)).map(Some)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start.path == self.end.path && self.start.offset == self.end.offset
    }

    pub fn to_static_range(&self) -> StaticRange {
        StaticRange::new(
            self.start.node,
            self.start.offset,
            self.end.node,
            self.end.offset,
        )
    }

    pub fn to_selection(&self) -> LiveSelection {
        LiveSelection::new(self.start.boundary(), self.end.boundary())
    }

    /// Same endpoints as `selection`, in either anchor/focus orientation
    pub fn matches_selection(&self, selection: &LiveSelection) -> bool {
        let own = self.to_selection();
        own == *selection || own == selection.reversed()
    }

    /// Rebuild both points from their paths
    pub fn revalidate(&self, doc: &Document) -> Result<Self, EditError> {
        let start = self.start.revalidate(doc, self.host)?;
        let end = self.end.revalidate(doc, self.host)?;
        Self::new(doc, self.host, start, end)
    }

    /// Program the live selection to this range.
    ///
    /// Returns `false` without touching the host when the selection already
    /// matches, so reapplying a range raises no change notification.
    pub fn select_range(&self, doc: &mut Document) -> Result<bool, EditError> {
        let current = self.revalidate(doc)?;
        if doc
            .selection()
            .is_some_and(|selection| current.matches_selection(&selection))
        {
            return Ok(false);
        }
        doc.set_selection(current.to_selection());
        Ok(true)
    }
}

impl std::fmt::Display for InlineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}..{}@{}",
            self.start.path, self.start.offset, self.end.path, self.end.offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Markup;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    struct Sample {
        doc: Document,
        host: NodeId,
        node1: NodeId,
        inner: NodeId,
    }

    /// `<p>ab<b>c</b></p>`
    fn sample() -> Sample {
        let mut doc = Document::new();
        let host = doc.build(&Markup::element(
            "p",
            vec![Markup::text("ab"), Markup::element("b", vec![Markup::text("c")])],
        ));
        let node1 = doc.children(host)[0];
        let inner = doc.children(doc.children(host)[1])[0];
        Sample {
            doc,
            host,
            node1,
            inner,
        }
    }

    fn points(s: &Sample) -> [Point; 3] {
        [
            Point::at_node(&s.doc, s.host, s.node1, 0).unwrap(),
            Point::at_node(&s.doc, s.host, s.node1, 1).unwrap(),
            Point::at_node(&s.doc, s.host, s.inner, 0).unwrap(),
        ]
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 2)]
    #[case(0, 2)]
    fn test_sorts_two_points(#[case] i: usize, #[case] j: usize) {
        let s = sample();
        let points = points(&s);
        let (x, y) = (points[i].clone(), points[j].clone());

        let range = InlineRange::new(&s.doc, s.host, x.clone(), y.clone()).unwrap();

        assert_eq!(range, InlineRange::new(&s.doc, s.host, y, x.clone()).unwrap());
        assert_eq!(range.start, x);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 2)]
    #[case(0, 2)]
    fn test_construction_helpers_agree(#[case] i: usize, #[case] j: usize) {
        let s = sample();
        let points = points(&s);
        let (x, y) = (&points[i], &points[j]);
        let expected = InlineRange::new(&s.doc, s.host, x.clone(), y.clone()).unwrap();

        let from_nodes =
            InlineRange::from_nodes(&s.doc, s.host, x.node(), x.offset, y.node(), y.offset).unwrap();
        let from_static = InlineRange::from_static_range(
            &s.doc,
            s.host,
            &StaticRange::new(x.node(), x.offset, y.node(), y.offset),
        )
        .unwrap();
        let from_paths = InlineRange::from_paths(
            &s.doc,
            s.host,
            path_from_child(&s.doc, s.host, x.node()).unwrap(),
            x.offset,
            path_from_child(&s.doc, s.host, y.node()).unwrap(),
            y.offset,
        )
        .unwrap();
        let from_selection = InlineRange::from_selection(
            &s.doc,
            s.host,
            &LiveSelection::new(y.boundary(), x.boundary()),
        )
        .unwrap()
        .unwrap();

        assert_eq!(from_nodes, expected);
        assert_eq!(from_static, expected);
        assert_eq!(from_paths, expected);
        assert_eq!(from_selection, expected);
    }

    #[rstest]
    // element boundary before / after the child the deeper path enters
    #[case(vec![], 1, vec![1, 0], 0, Ordering::Less)]
    #[case(vec![], 2, vec![1, 0], 0, Ordering::Greater)]
    #[case(vec![1, 0], 1, vec![], 2, Ordering::Less)]
    #[case(vec![0], 2, vec![1, 0], 0, Ordering::Less)]
    #[case(vec![0], 1, vec![0], 1, Ordering::Equal)]
    fn test_compare_points(
        #[case] lhs: Vec<usize>,
        #[case] lhs_offset: usize,
        #[case] rhs: Vec<usize>,
        #[case] rhs_offset: usize,
        #[case] expected: Ordering,
    ) {
        let s = sample();
        let x = Point::new(&s.doc, s.host, Path::from(lhs), lhs_offset).unwrap();
        let y = Point::new(&s.doc, s.host, Path::from(rhs), rhs_offset).unwrap();

        assert_eq!(compare_points(&x, &y), expected);
        assert_eq!(compare_points(&y, &x), expected.reverse());
    }

    #[test]
    fn test_stale_point_is_rejected() {
        let mut s = sample();
        let [first, _, third] = points(&s);
        let replacement = s.doc.create_text("ab");
        s.doc.remove_child(s.host, s.node1).unwrap();
        let first_child = s.doc.children(s.host).first().copied();
        s.doc.insert_before(s.host, replacement, first_child).unwrap();

        assert_eq!(
            InlineRange::new(&s.doc, s.host, first.clone(), third.clone()),
            Err(EditError::InvalidPoint {
                which: Endpoint::Start
            })
        );

        let fresh = first.revalidate(&s.doc, s.host).unwrap();
        assert_eq!(fresh.node(), replacement);
        assert!(InlineRange::new(&s.doc, s.host, fresh, third).is_ok());
    }

    #[test]
    fn test_selection_outside_host_is_none() {
        let mut s = sample();
        let stray = s.doc.create_text("x");

        let selection = LiveSelection::new(Boundary::new(s.node1, 0), Boundary::new(stray, 0));

        assert_eq!(
            InlineRange::from_selection(&s.doc, s.host, &selection).unwrap(),
            None
        );
    }

    #[test]
    fn test_code_point_offset() {
        let mut doc = Document::new();
        let host = doc.build(&Markup::element("p", vec![Markup::text("a😀bに")]));

        let point = Point::new(&doc, host, Path::from([0]), 4).unwrap();
        assert_eq!(point.code_point_offset, 3);

        assert!(matches!(
            Point::new(&doc, host, Path::from([0]), 2),
            Err(EditError::OffsetOutOfBounds { offset: 2, .. })
        ));
    }

    #[test]
    fn test_select_range_is_idempotent() {
        let mut s = sample();
        let range = InlineRange::from_nodes(&s.doc, s.host, s.inner, 1, s.node1, 1).unwrap();

        assert!(range.select_range(&mut s.doc).unwrap());
        assert!(!range.select_range(&mut s.doc).unwrap());
        assert_eq!(s.doc.take_selection_changes(), 1);

        // a backwards selection over the same endpoints also counts as applied
        s.doc.set_selection(range.to_selection().reversed());
        s.doc.take_selection_changes();
        assert!(!range.select_range(&mut s.doc).unwrap());
        assert_eq!(s.doc.take_selection_changes(), 0);
    }

    #[test]
    fn test_display() {
        let s = sample();
        let range = InlineRange::from_nodes(&s.doc, s.host, s.inner, 1, s.node1, 1).unwrap();

        assert_eq!(range.to_string(), "[0]@1..[1, 0]@1");
    }
}
